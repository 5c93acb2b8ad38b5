//! Radio button groups.

use std::time::Instant;

use serde_json::Value;

use crate::registry::RenderHints;
use crate::schema::FieldDefinition;
use crate::validation::{self, ErrorCode, RuleSet};
use crate::widget::{html_escape, FieldWidget, WidgetEvent, WidgetInput};

/// Single-choice group rendered as one radio input per option.
///
/// Choosing an option re-validates before the model notification goes out,
/// so a "Please select an option" failure disappears in the same turn the
/// selection lands.
pub struct RadioInput {
	field: FieldDefinition,
	model: String,
	errors: Vec<ErrorCode>,
	events: Vec<WidgetEvent>,
}

impl RadioInput {
	pub fn new(field: FieldDefinition) -> Self {
		Self {
			field,
			model: String::new(),
			errors: vec![],
			events: vec![],
		}
	}
}

impl FieldWidget for RadioInput {
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
			self.validate(false);
			self.events.push(WidgetEvent::ModelChange {
				id: self.field.id.clone(),
				value: self.model(),
			});
		}
	}

	fn tick(&mut self, _now: Instant) {}

	fn render(&self, hints: &RenderHints) -> String {
		if hints.displaymode {
			let name = self
				.field
				.options
				.iter()
				.find(|opt| opt.id == self.model)
				.map(|opt| opt.name.as_str());
			return match name {
				Some(name) => format!(r#"<div class="display">{}</div>"#, html_escape(name)),
				None => r#"<div class="display empty">(empty)</div>"#.to_string(),
			};
		}

		let mut html = format!(
			r#"<div class="radio-group{}" role="radiogroup">"#,
			if self.field.horizontal { " horizontal" } else { "" }
		);
		for option in &self.field.options {
			html.push_str(&format!(
				r#"<label><input type="radio" name="{}" value="{}"{}{} />{}</label>"#,
				html_escape(&self.field.id),
				html_escape(&option.id),
				if option.id == self.model { " checked" } else { "" },
				if self.field.disabled { " disabled" } else { "" },
				html_escape(&option.name)
			));
		}
		html.push_str("</div>");
		html
	}

	fn take_events(&mut self) -> Vec<WidgetEvent> {
		std::mem::take(&mut self.events)
	}
}
