//! Checkbox toggle.

use std::time::Instant;

use serde_json::Value;

use crate::registry::RenderHints;
use crate::schema::FieldDefinition;
use crate::validation::ErrorCode;
use crate::widget::{html_escape, FieldWidget, WidgetEvent, WidgetInput};

/// Boolean toggle. An unchecked box is a present `false`, never an absent
/// value, so required rules cannot fail on it.
pub struct CheckboxInput {
	field: FieldDefinition,
	model: bool,
	events: Vec<WidgetEvent>,
}

impl CheckboxInput {
	pub fn new(field: FieldDefinition) -> Self {
		Self {
			field,
			model: false,
			events: vec![],
		}
	}
}

// Truthiness of the incoming prefill: empty string, zero and null are
// unchecked, everything else is checked.
fn coerce(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

impl FieldWidget for CheckboxInput {
	fn id(&self) -> &str {
		&self.field.id
	}

	fn model(&self) -> Value {
		Value::Bool(self.model)
	}

	fn set_model(&mut self, value: Value) {
		self.model = coerce(&value);
	}

	fn validate(&mut self, _silent: bool) -> bool {
		true
	}

	fn errors(&self) -> &[ErrorCode] {
		&[]
	}

	fn handle(&mut self, input: WidgetInput, _now: Instant) {
		if input == WidgetInput::Toggle {
			self.model = !self.model;
			self.events.push(WidgetEvent::ModelChange {
				id: self.field.id.clone(),
				value: self.model(),
			});
		}
	}

	fn tick(&mut self, _now: Instant) {}

	fn render(&self, hints: &RenderHints) -> String {
		if hints.displaymode {
			return format!(
				r#"<div class="display">{}</div>"#,
				if self.model { "Yes" } else { "No" }
			);
		}
		format!(
			r#"<input type="checkbox" name="{}"{}{} />"#,
			html_escape(&self.field.id),
			if self.model { " checked" } else { "" },
			if self.field.disabled { " disabled" } else { "" }
		)
	}

	fn take_events(&mut self) -> Vec<WidgetEvent> {
		std::mem::take(&mut self.events)
	}
}
