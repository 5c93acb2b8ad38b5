//! Display-only label.

use std::time::Instant;

use serde_json::Value;

use crate::registry::RenderHints;
use crate::schema::FieldDefinition;
use crate::validation::ErrorCode;
use crate::widget::{html_escape, FieldWidget, WidgetEvent, WidgetInput};

/// Inert field that shows text and never contributes to the model. The text
/// comes from the resolved model when one is set (computed expressions land
/// here), the schema label otherwise.
pub struct LabelWidget {
	field: FieldDefinition,
	text: String,
}

impl LabelWidget {
	pub fn new(field: FieldDefinition) -> Self {
		Self {
			field,
			text: String::new(),
		}
	}
}

impl FieldWidget for LabelWidget {
	fn id(&self) -> &str {
		&self.field.id
	}

	// Labels never carry submit data.
	fn model(&self) -> Value {
		Value::Null
	}

	fn set_model(&mut self, value: Value) {
		self.text = crate::model::value_text(&value);
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
		let text = if self.text.is_empty() {
			self.field.label_text()
		} else {
			&self.text
		};
		format!(r#"<div class="label">{}</div>"#, html_escape(text))
	}

	fn take_events(&mut self) -> Vec<WidgetEvent> {
		vec![]
	}
}
