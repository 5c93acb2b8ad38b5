//! Adapter for registry-provided custom field types.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::registry::{CustomWidget, RenderHints};
use crate::schema::FieldDefinition;
use crate::validation::ErrorCode;
use crate::widget::{FieldWidget, WidgetEvent, WidgetInput};

/// Bridges a [`CustomWidget`] capability into the field widget contract.
/// Text and choice interactions write the model directly; everything else
/// is up to the capability's own rendering.
pub struct CustomFieldWidget {
	field: FieldDefinition,
	capability: Arc<dyn CustomWidget>,
	model: Value,
	errors: Vec<ErrorCode>,
	events: Vec<WidgetEvent>,
}

impl CustomFieldWidget {
	pub fn new(field: FieldDefinition, capability: Arc<dyn CustomWidget>) -> Self {
		Self {
			field,
			capability,
			model: Value::Null,
			errors: vec![],
			events: vec![],
		}
	}

	fn publish_model(&mut self) {
		self.events.push(WidgetEvent::ModelChange {
			id: self.field.id.clone(),
			value: self.model.clone(),
		});
	}
}

impl FieldWidget for CustomFieldWidget {
	fn id(&self) -> &str {
		&self.field.id
	}

	fn model(&self) -> Value {
		self.model.clone()
	}

	fn set_model(&mut self, value: Value) {
		self.model = value;
	}

	fn validate(&mut self, silent: bool) -> bool {
		let codes = self.capability.validate(&self.field, &self.model);
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
		match input {
			WidgetInput::Input { text } => {
				self.model = Value::String(text);
				self.publish_model();
			}
			WidgetInput::Choose { option_id } => {
				self.model = Value::String(option_id);
				self.publish_model();
			}
			_ => {}
		}
	}

	fn tick(&mut self, _now: Instant) {}

	fn render(&self, hints: &RenderHints) -> String {
		self.capability.render(&self.field, &self.model, hints)
	}

	fn take_events(&mut self) -> Vec<WidgetEvent> {
		std::mem::take(&mut self.events)
	}
}
