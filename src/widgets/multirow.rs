//! Multirow group: a growable list of identical rows.

use std::time::Instant;

use serde_json::{json, Value};

use crate::model::{is_empty_value, value_text};
use crate::registry::RenderHints;
use crate::schema::{FieldDefinition, FieldType, RowFieldConfig};
use crate::validation::{self, ErrorCode, RuleSet};
use crate::widget::{html_escape, FieldWidget, WidgetEvent, WidgetInput};

/// Repeating group whose model is an array with one entry per row.
///
/// The first model assignment pads the array up to `default_row_count` with
/// per-type empty rows and publishes the padded model, so the form model and
/// the visible rows agree from the start.
pub struct MultirowGroup {
	field: FieldDefinition,
	rows: Vec<Value>,
	errors: Vec<ErrorCode>,
	events: Vec<WidgetEvent>,
	initialized: bool,
}

impl MultirowGroup {
	pub fn new(field: FieldDefinition) -> Self {
		Self {
			field,
			rows: vec![],
			errors: vec![],
			events: vec![],
			initialized: false,
		}
	}

	fn row_config(&self) -> Option<&RowFieldConfig> {
		self.field.row_field.as_ref()
	}

	// A freshly added row carries the empty value of its type, so text rows
	// start blank and number rows start at zero.
	fn empty_row(&self) -> Value {
		match self.row_config().map(|config| &config.field_type) {
			Some(FieldType::MultipartInput) => json!([]),
			Some(FieldType::Number) => json!(0),
			Some(FieldType::ShortText) | Some(FieldType::LongText) => json!(""),
			_ => Value::Null,
		}
	}

	fn row_codes(&self, row: &Value) -> Vec<ErrorCode> {
		let Some(config) = self.row_config() else {
			return vec![];
		};
		match config.field_type {
			FieldType::MultipartInput => {
				let mut codes = vec![];
				for part in &config.schema {
					let stored = row
						.as_array()
						.and_then(|entries| {
							entries.iter().find(|entry| {
								entry.get("id").and_then(Value::as_str) == Some(part.id.as_str())
							})
						})
						.and_then(|entry| entry.get("value"));
					let value = if is_empty_value(stored) {
						part.default.clone().unwrap_or_else(|| json!(""))
					} else {
						stored.cloned().unwrap_or(Value::Null)
					};
					codes.extend(validation::evaluate(&RuleSet::from(part), &value, None));
				}
				codes
			}
			_ => {
				let rules = RuleSet {
					required: config.required,
					minlength: None,
					validate_as: config.validate_as,
					validate_regex: None,
					disable_validation: false,
				};
				validation::evaluate(&rules, row, None)
			}
		}
	}

	fn publish_model(&mut self) {
		self.events.push(WidgetEvent::ModelChange {
			id: self.field.id.clone(),
			value: self.model(),
		});
	}

	fn revalidate_if_showing(&mut self) {
		if !self.errors.is_empty() {
			self.validate(false);
		}
	}
}

impl FieldWidget for MultirowGroup {
	fn id(&self) -> &str {
		&self.field.id
	}

	fn model(&self) -> Value {
		Value::Array(self.rows.clone())
	}

	fn set_model(&mut self, value: Value) {
		self.rows = match value {
			Value::Array(rows) => rows,
			_ => vec![],
		};
		if !self.initialized {
			self.initialized = true;
			if self.rows.len() < self.field.default_row_count {
				while self.rows.len() < self.field.default_row_count {
					self.rows.push(self.empty_row());
				}
				self.publish_model();
			}
		}
	}

	fn validate(&mut self, silent: bool) -> bool {
		let mut codes = vec![];
		for row in &self.rows {
			codes.extend(self.row_codes(row));
		}
		if self.field.required && self.rows.is_empty() {
			codes.push(ErrorCode::NoRows);
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
		match input {
			WidgetInput::AddRow => {
				self.rows.push(self.empty_row());
				self.publish_model();
				self.revalidate_if_showing();
			}
			WidgetInput::DeleteRow { index } => {
				if index < self.rows.len() {
					self.rows.remove(index);
					self.publish_model();
					self.revalidate_if_showing();
				}
			}
			_ => {}
		}
	}

	fn tick(&mut self, _now: Instant) {}

	fn render(&self, hints: &RenderHints) -> String {
		if hints.displaymode {
			let joined = self
				.rows
				.iter()
				.map(value_text)
				.filter(|text| !text.is_empty())
				.collect::<Vec<_>>()
				.join(", ");
			return if joined.is_empty() {
				r#"<div class="display empty">(empty)</div>"#.to_string()
			} else {
				format!(r#"<div class="display">{}</div>"#, html_escape(&joined))
			};
		}

		let mut html = String::from(r#"<div class="multirow">"#);
		for (index, row) in self.rows.iter().enumerate() {
			html.push_str(&format!(
				r#"<div class="row" data-index="{index}"><input type="text" value="{}" /><button type="button" class="delete-row">✕</button></div>"#,
				html_escape(&value_text(row))
			));
		}
		let button_text = self.field.button_text.as_deref().unwrap_or("Add row");
		html.push_str(&format!(
			r#"<button type="button" class="add-row">{}</button>"#,
			html_escape(button_text)
		));
		html.push_str("</div>");
		html
	}

	fn take_events(&mut self) -> Vec<WidgetEvent> {
		std::mem::take(&mut self.events)
	}
}
