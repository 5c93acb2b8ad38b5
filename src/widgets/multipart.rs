//! Multipart input: several small parts submitting as one field.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::{json, Value};

use crate::model::{is_empty_value, value_text};
use crate::registry::RenderHints;
use crate::schema::{FieldDefinition, FieldType, PartDefinition, PartLayout};
use crate::validation::{self, ErrorCode, RuleSet};
use crate::widget::{html_escape, FieldWidget, WidgetEvent, WidgetInput};

/// Composite control whose model is an ordered list of `{id, value}` pairs,
/// one per part, in schema order.
///
/// Validation walks every part even after one fails, so all part errors
/// surface in a single pass.
pub struct MultipartInput {
	field: FieldDefinition,
	values: HashMap<String, Value>,
	errors: Vec<ErrorCode>,
	events: Vec<WidgetEvent>,
}

impl MultipartInput {
	pub fn new(field: FieldDefinition) -> Self {
		Self {
			field,
			values: HashMap::new(),
			errors: vec![],
			events: vec![],
		}
	}

	// Effective value of one part: what the host set, else the part default,
	// else the empty string.
	fn part_value(&self, part: &PartDefinition) -> Value {
		let stored = self.values.get(&part.id);
		if !is_empty_value(stored) {
			return stored.cloned().unwrap_or(Value::Null);
		}
		part.default.clone().unwrap_or_else(|| json!(""))
	}

	fn layout_class(&self) -> &'static str {
		match self.field.layout.unwrap_or_default() {
			PartLayout::Horizontal => "horizontal",
			PartLayout::HorizontalWrap => "horizontal-wrap",
			PartLayout::Vertical => "vertical",
		}
	}

	fn render_part(&self, part: &PartDefinition) -> String {
		let value = value_text(&self.part_value(part));
		match part.field_type {
			FieldType::Hidden => format!(
				r#"<input type="hidden" name="{}" value="{}" />"#,
				html_escape(&part.id),
				html_escape(&value)
			),
			FieldType::Dropdown => {
				let mut html = format!(r#"<select name="{}""#, html_escape(&part.id));
				if part.required {
					html.push_str(" required");
				}
				html.push('>');
				for option in &part.options {
					html.push_str(&format!(
						r#"<option value="{}"{}>{}</option>"#,
						html_escape(&option.id),
						if option.id == value { " selected" } else { "" },
						html_escape(&option.name)
					));
				}
				html.push_str("</select>");
				html
			}
			_ => {
				let mut html = format!(
					r#"<input type="{}" name="{}""#,
					if part.field_type == FieldType::Number { "number" } else { "text" },
					html_escape(&part.id)
				);
				if let Some(placeholder) = part.placeholder.as_deref() {
					html.push_str(&format!(r#" placeholder="{}""#, html_escape(placeholder)));
				}
				if part.required {
					html.push_str(" required");
				}
				html.push_str(&format!(r#" value="{}" />"#, html_escape(&value)));
				html
			}
		}
	}
}

impl FieldWidget for MultipartInput {
	fn id(&self) -> &str {
		&self.field.id
	}

	fn model(&self) -> Value {
		let pairs: Vec<Value> = self
			.field
			.parts
			.iter()
			.map(|part| json!({ "id": part.id, "value": self.part_value(part) }))
			.collect();
		Value::Array(pairs)
	}

	fn set_model(&mut self, value: Value) {
		self.values.clear();
		if let Value::Array(entries) = value {
			for entry in entries {
				if let Some(id) = entry.get("id").and_then(Value::as_str) {
					let part_value = entry.get("value").cloned().unwrap_or(Value::Null);
					self.values.insert(id.to_string(), part_value);
				}
			}
		}
	}

	fn validate(&mut self, silent: bool) -> bool {
		let mut codes = vec![];
		for part in &self.field.parts {
			codes.extend(validation::evaluate(
				&RuleSet::from(part),
				&self.part_value(part),
				None,
			));
		}
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
		if let WidgetInput::SetPart { part_id, value } = input {
			self.values.insert(part_id, value);
			self.events.push(WidgetEvent::ModelChange {
				id: self.field.id.clone(),
				value: self.model(),
			});
			// Clear promptly once an error is showing.
			if !self.errors.is_empty() {
				self.validate(false);
			}
		}
	}

	fn tick(&mut self, _now: Instant) {}

	fn render(&self, hints: &RenderHints) -> String {
		if hints.displaymode {
			let joined = self
				.field
				.parts
				.iter()
				.map(|part| value_text(&self.part_value(part)))
				.filter(|text| !text.is_empty())
				.collect::<Vec<_>>()
				.join(" ");
			return if joined.is_empty() {
				r#"<div class="display empty">(empty)</div>"#.to_string()
			} else {
				format!(r#"<div class="display">{}</div>"#, html_escape(&joined))
			};
		}

		let mut html = format!(r#"<div class="multipart {}">"#, self.layout_class());
		for part in &self.field.parts {
			html.push_str(&self.render_part(part));
		}
		html.push_str("</div>");
		html
	}

	fn take_events(&mut self) -> Vec<WidgetEvent> {
		std::mem::take(&mut self.events)
	}
}
