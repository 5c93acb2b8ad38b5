//! Hidden value carrier.

use std::time::Instant;

use serde_json::Value;

use crate::registry::RenderHints;
use crate::schema::FieldDefinition;
use crate::validation::ErrorCode;
use crate::widget::{html_escape, FieldWidget, WidgetEvent, WidgetInput};

/// Invisible field that rides along in the model. When the model carries
/// nothing, the schema default takes its place.
pub struct HiddenInput {
	field: FieldDefinition,
	model: Value,
	events: Vec<WidgetEvent>,
}

impl HiddenInput {
	pub fn new(field: FieldDefinition) -> Self {
		Self {
			field,
			model: Value::Null,
			events: vec![],
		}
	}
}

impl FieldWidget for HiddenInput {
	fn id(&self) -> &str {
		&self.field.id
	}

	fn model(&self) -> Value {
		if self.model.is_null() {
			// Default supplied at read time so a later set_model still wins.
			self.field.default.clone().unwrap_or(Value::Null)
		} else {
			self.model.clone()
		}
	}

	fn set_model(&mut self, value: Value) {
		self.model = value;
	}

	fn validate(&mut self, _silent: bool) -> bool {
		true
	}

	fn errors(&self) -> &[ErrorCode] {
		&[]
	}

	fn handle(&mut self, _input: WidgetInput, _now: Instant) {}

	fn tick(&mut self, _now: Instant) {}

	fn render(&self, _hints: &RenderHints) -> String {
		format!(
			r#"<input type="hidden" name="{}" value="{}" />"#,
			html_escape(&self.field.id),
			html_escape(&crate::model::value_text(&self.model()))
		)
	}

	fn take_events(&mut self) -> Vec<WidgetEvent> {
		std::mem::take(&mut self.events)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::FieldType;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_default_applies_until_a_model_lands() {
		// Arrange
		let field =
			FieldDefinition::new("source", FieldType::Hidden).with_default_value(json!("web"));
		let mut widget = HiddenInput::new(field);

		// Act + Assert
		assert_eq!(widget.model(), json!("web"));

		widget.set_model(json!("import"));
		assert_eq!(widget.model(), json!("import"));
	}

	#[rstest]
	fn test_renders_as_hidden_input() {
		// Arrange
		let mut widget = HiddenInput::new(FieldDefinition::new("source", FieldType::Hidden));
		widget.set_model(json!("web"));

		// Act + Assert
		assert_eq!(
			widget.render(&RenderHints::default()),
			r#"<input type="hidden" name="source" value="web" />"#
		);
	}
}
