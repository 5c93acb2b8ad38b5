//! Dropdown selection.

use std::time::Instant;

use serde_json::Value;

use crate::registry::RenderHints;
use crate::schema::FieldDefinition;
use crate::validation::{self, ErrorCode, RuleSet};
use crate::widget::{html_escape, FieldWidget, WidgetEvent, WidgetInput};

/// Dropdown backed by the field's choice options.
///
/// The model is always a string: option ids are strings, and numeric or
/// missing prefill values are stringified on the way in so comparisons
/// against option ids stay exact.
pub struct SelectInput {
	field: FieldDefinition,
	model: String,
	errors: Vec<ErrorCode>,
	events: Vec<WidgetEvent>,
}

impl SelectInput {
	pub fn new(field: FieldDefinition) -> Self {
		Self {
			field,
			model: String::new(),
			errors: vec![],
			events: vec![],
		}
	}

	fn selected_name(&self) -> Option<&str> {
		self.field
			.options
			.iter()
			.find(|opt| opt.id == self.model)
			.map(|opt| opt.name.as_str())
	}
}

impl FieldWidget for SelectInput {
	fn id(&self) -> &str {
		&self.field.id
	}

	fn model(&self) -> Value {
		Value::String(self.model.clone())
	}

	fn set_model(&mut self, value: Value) {
		self.model = match value {
			Value::Null => String::new(),
			Value::String(s) => s,
			Value::Number(n) => n.to_string(),
			Value::Bool(b) => b.to_string(),
			other => other.to_string(),
		};
	}

	fn validate(&mut self, silent: bool) -> bool {
		let codes = validation::evaluate(&RuleSet::from(&self.field), &self.model(), None);
		let valid = codes.is_empty();
		if !silent {
			self.errors = codes.clone();
			self.events.push(WidgetEvent::ErrorsChange {
				id: self.field.id.clone(),
				errors: codes,
			});
		}
		valid
	}

	fn errors(&self) -> &[ErrorCode] {
		&self.errors
	}

	fn handle(&mut self, input: WidgetInput, _now: Instant) {
		if let WidgetInput::Choose { option_id } = input {
			self.model = option_id;
			self.events.push(WidgetEvent::ModelChange {
				id: self.field.id.clone(),
				value: self.model(),
			});
			self.validate(false);
		}
	}

	fn tick(&mut self, _now: Instant) {}

	fn render(&self, hints: &RenderHints) -> String {
		if hints.displaymode {
			return match self.selected_name() {
				Some(name) => format!(r#"<div class="display">{}</div>"#, html_escape(name)),
				None => r#"<div class="display empty">(empty)</div>"#.to_string(),
			};
		}

		let mut html = format!(r#"<select name="{}""#, html_escape(&self.field.id));
		if self.field.required {
			html.push_str(" required");
		}
		if self.field.disabled {
			html.push_str(" disabled");
		}
		if !self.errors.is_empty() {
			html.push_str(r#" class="border-error""#);
		}
		html.push('>');

		// Placeholder row keeps the control blank until a real choice lands.
		let placeholder = self.field.placeholder.as_deref().unwrap_or("Select an option");
		html.push_str(&format!(
			r#"<option value="" disabled{}>{}</option>"#,
			if self.model.is_empty() { " selected" } else { "" },
			html_escape(placeholder)
		));

		for option in &self.field.options {
			html.push_str(&format!(
				r#"<option value="{}"{}>{}</option>"#,
				html_escape(&option.id),
				if option.id == self.model { " selected" } else { "" },
				html_escape(&option.name)
			));
		}
		html.push_str("</select>");
		html
	}

	fn take_events(&mut self) -> Vec<WidgetEvent> {
		std::mem::take(&mut self.events)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{ChoiceOption, FieldType};
	use rstest::rstest;
	use serde_json::json;

	fn color_field() -> FieldDefinition {
		FieldDefinition::new("color", FieldType::Dropdown)
			.required()
			.with_options(vec![
				ChoiceOption::new("r", "Red"),
				ChoiceOption::new("g", "Green"),
			])
	}

	#[rstest]
	#[case(json!(null), "")]
	#[case(json!(42), "42")]
	#[case(json!("g"), "g")]
	fn test_model_is_stringified(#[case] incoming: Value, #[case] expected: &str) {
		// Arrange
		let mut widget = SelectInput::new(color_field());

		// Act
		widget.set_model(incoming);

		// Assert
		assert_eq!(widget.model(), json!(expected));
	}

	#[rstest]
	fn test_choose_publishes_model_then_clears_errors() {
		// Arrange
		let mut widget = SelectInput::new(color_field());
		widget.validate(false);
		widget.take_events();

		// Act
		widget.handle(
			WidgetInput::Choose {
				option_id: "g".to_string(),
			},
			Instant::now(),
		);
		let events = widget.take_events();

		// Assert
		assert_eq!(
			events,
			vec![
				WidgetEvent::ModelChange {
					id: "color".to_string(),
					value: json!("g"),
				},
				WidgetEvent::ErrorsChange {
					id: "color".to_string(),
					errors: vec![],
				},
			]
		);
	}

	#[rstest]
	fn test_required_empty_selection_fails() {
		// Arrange
		let mut widget = SelectInput::new(color_field());

		// Act
		let valid = widget.validate(false);

		// Assert
		assert!(!valid);
		assert_eq!(widget.errors(), &[ErrorCode::Required]);
	}

	#[rstest]
	fn test_render_marks_selection_and_placeholder() {
		// Arrange
		let mut widget = SelectInput::new(color_field());

		// Act + Assert: empty model selects the placeholder row
		let blank = widget.render(&RenderHints::default());
		assert!(blank.contains(r#"<option value="" disabled selected>Select an option</option>"#));

		widget.set_model(json!("r"));
		let chosen = widget.render(&RenderHints::default());
		assert!(chosen.contains(r#"<option value="r" selected>Red</option>"#));
		assert!(chosen.contains(r#"<option value="g">Green</option>"#));
	}
}
