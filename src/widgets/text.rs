//! Text-like inputs: short text, long text, and number.

use std::time::Instant;

use serde_json::Value;

use crate::debounce::Debouncer;
use crate::registry::RenderHints;
use crate::schema::{FieldDefinition, FieldType};
use crate::validation::{self, ErrorCode, FieldValidator, RuleSet};
use crate::widget::{html_escape, FieldWidget, WidgetEvent, WidgetInput};

/// Editable text control. Number fields share it: they filter input down to
/// digits and surface their model as a JSON number.
pub struct TextInput {
	field: FieldDefinition,
	validator: Option<FieldValidator>,
	model: String,
	errors: Vec<ErrorCode>,
	debouncer: Debouncer<String>,
	events: Vec<WidgetEvent>,
	focused: bool,
}

impl TextInput {
	pub fn new(field: FieldDefinition) -> Self {
		Self {
			field,
			validator: None,
			model: String::new(),
			errors: vec![],
			debouncer: Debouncer::default(),
			events: vec![],
			focused: false,
		}
	}

	pub fn with_validator(mut self, validator: FieldValidator) -> Self {
		self.validator = Some(validator);
		self
	}

	fn is_number(&self) -> bool {
		self.field.field_type == FieldType::Number
	}

	fn is_textarea(&self) -> bool {
		self.field.field_type == FieldType::LongText
	}

	// Number fields expose the digit string as a JSON number; an empty
	// string stays absent rather than becoming zero.
	fn typed_value(&self, text: &str) -> Value {
		if self.is_number() {
			if text.is_empty() {
				return Value::Null;
			}
			match text.parse::<u64>() {
				Ok(n) => Value::Number(n.into()),
				Err(_) => Value::String(text.to_string()),
			}
		} else {
			Value::String(text.to_string())
		}
	}

	fn queue_model_change(&mut self, text: String) {
		let value = self.typed_value(&text);
		self.events.push(WidgetEvent::ModelChange {
			id: self.field.id.clone(),
			value,
		});
	}

	fn publish_errors(&mut self, errors: Vec<ErrorCode>) {
		self.errors = errors.clone();
		self.events.push(WidgetEvent::ErrorsChange {
			id: self.field.id.clone(),
			errors,
		});
	}
}

impl FieldWidget for TextInput {
	fn id(&self) -> &str {
		&self.field.id
	}

	fn model(&self) -> Value {
		self.typed_value(&self.model)
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
		let codes = validation::evaluate(
			&RuleSet::from(&self.field),
			&self.model(),
			self.validator.as_ref(),
		);
		let valid = codes.is_empty();
		if !silent {
			self.publish_errors(codes);
		}
		valid
	}

	fn errors(&self) -> &[ErrorCode] {
		&self.errors
	}

	fn handle(&mut self, input: WidgetInput, now: Instant) {
		match input {
			WidgetInput::Input { text } => {
				let text = if self.is_number() {
					text.chars().filter(|c| c.is_ascii_digit()).collect()
				} else {
					text
				};
				self.model = text.clone();
				// Silent while the field is clean, loud once an error is
				// showing so it clears as soon as the input recovers.
				let silent = self.errors.is_empty();
				self.validate(silent);
				self.debouncer.push(text, now);
			}
			WidgetInput::Enter => {
				if self.is_textarea() {
					return;
				}
				if let Some(text) = self.debouncer.flush() {
					self.queue_model_change(text);
				}
				self.events.push(WidgetEvent::InputSubmit {
					id: self.field.id.clone(),
					value: self.model(),
				});
			}
			WidgetInput::Escape => {
				self.debouncer.flush();
				self.events.push(WidgetEvent::InputCancel {
					id: self.field.id.clone(),
				});
			}
			WidgetInput::Blur => {
				self.focused = false;
				if let Some(text) = self.debouncer.flush() {
					self.queue_model_change(text);
				}
				self.validate(false);
			}
			_ => {}
		}
	}

	fn focus(&mut self) {
		self.focused = true;
	}

	fn tick(&mut self, now: Instant) {
		if let Some(text) = self.debouncer.poll(now) {
			self.queue_model_change(text);
		}
	}

	fn render(&self, hints: &RenderHints) -> String {
		if hints.displaymode {
			return if self.model.is_empty() {
				r#"<div class="display empty">(empty)</div>"#.to_string()
			} else {
				format!(r#"<div class="display">{}</div>"#, html_escape(&self.model))
			};
		}

		let mut html = if self.is_textarea() {
			format!(r#"<textarea name="{}""#, html_escape(&self.field.id))
		} else {
			format!(
				r#"<input type="{}" name="{}""#,
				if self.is_number() { "number" } else { "text" },
				html_escape(&self.field.id)
			)
		};

		if let Some(placeholder) = self.field.placeholder.as_deref() {
			html.push_str(&format!(r#" placeholder="{}""#, html_escape(placeholder)));
		}
		if self.field.required {
			html.push_str(" required");
		}
		if self.field.disabled {
			html.push_str(" disabled");
		}
		if self.focused {
			html.push_str(" autofocus");
		}
		if !self.errors.is_empty() {
			html.push_str(r#" class="border-error""#);
		}

		if self.is_textarea() {
			html.push('>');
			html.push_str(&html_escape(&self.model));
			html.push_str("</textarea>");
		} else {
			html.push_str(&format!(r#" value="{}" />"#, html_escape(&self.model)));
		}
		html
	}

	fn take_events(&mut self) -> Vec<WidgetEvent> {
		std::mem::take(&mut self.events)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use std::time::Duration;

	fn drain(widget: &mut TextInput) -> Vec<WidgetEvent> {
		widget.take_events()
	}

	#[rstest]
	fn test_typing_debounces_model_publication() {
		// Arrange
		let mut widget = TextInput::new(FieldDefinition::new("foo", FieldType::ShortText));
		let start = Instant::now();

		// Act: two keystrokes inside the quiet window
		widget.handle(
			WidgetInput::Input {
				text: "H".to_string(),
			},
			start,
		);
		widget.handle(
			WidgetInput::Input {
				text: "He".to_string(),
			},
			start + Duration::from_millis(50),
		);
		widget.tick(start + Duration::from_millis(100));
		let early = drain(&mut widget);
		widget.tick(start + Duration::from_millis(260));
		let settled = drain(&mut widget);

		// Assert: nothing until the window closes, then only the last value
		assert!(early.iter().all(|e| !matches!(e, WidgetEvent::ModelChange { .. })));
		assert_eq!(
			settled,
			vec![WidgetEvent::ModelChange {
				id: "foo".to_string(),
				value: json!("He"),
			}]
		);
	}

	#[rstest]
	fn test_enter_flushes_then_submits() {
		// Arrange
		let mut widget = TextInput::new(FieldDefinition::new("foo", FieldType::ShortText));
		let start = Instant::now();
		widget.handle(
			WidgetInput::Input {
				text: "Hello".to_string(),
			},
			start,
		);
		drain(&mut widget);

		// Act: Enter right away, before the quiet window closes
		widget.handle(WidgetInput::Enter, start + Duration::from_millis(10));
		let events = drain(&mut widget);

		// Assert: flush emits the pending model before the submit event
		assert_eq!(
			events,
			vec![
				WidgetEvent::ModelChange {
					id: "foo".to_string(),
					value: json!("Hello"),
				},
				WidgetEvent::InputSubmit {
					id: "foo".to_string(),
					value: json!("Hello"),
				},
			]
		);
	}

	#[rstest]
	fn test_escape_drops_pending_edit_and_cancels() {
		// Arrange
		let mut widget = TextInput::new(FieldDefinition::new("foo", FieldType::ShortText));
		let start = Instant::now();
		widget.handle(
			WidgetInput::Input {
				text: "draft".to_string(),
			},
			start,
		);
		drain(&mut widget);

		// Act
		widget.handle(WidgetInput::Escape, start + Duration::from_millis(10));
		widget.tick(start + Duration::from_millis(400));
		let events = drain(&mut widget);

		// Assert: no ModelChange sneaks out after the cancel
		assert_eq!(
			events,
			vec![WidgetEvent::InputCancel {
				id: "foo".to_string(),
			}]
		);
	}

	#[rstest]
	fn test_number_input_strips_non_digits() {
		// Arrange
		let mut widget = TextInput::new(FieldDefinition::new("amount", FieldType::Number));
		let start = Instant::now();

		// Act
		widget.handle(
			WidgetInput::Input {
				text: "1a2b3".to_string(),
			},
			start,
		);

		// Assert
		assert_eq!(widget.model(), json!(123));
	}

	#[rstest]
	fn test_number_zero_is_a_value_and_empty_is_absent() {
		// Arrange
		let mut widget = TextInput::new(FieldDefinition::new("amount", FieldType::Number));

		// Act + Assert
		widget.set_model(json!(0));
		assert_eq!(widget.model(), json!(0));

		widget.set_model(json!(null));
		assert_eq!(widget.model(), json!(null));
	}

	#[rstest]
	fn test_silent_validation_while_clean_then_loud_after_error() {
		// Arrange
		let field = FieldDefinition::new("name", FieldType::ShortText).required();
		let mut widget = TextInput::new(field);
		let start = Instant::now();

		// Act: typing while clean publishes no errors
		widget.handle(
			WidgetInput::Input {
				text: "".to_string(),
			},
			start,
		);
		let while_typing = drain(&mut widget);

		// Blur publishes the failure
		widget.handle(WidgetInput::Blur, start + Duration::from_millis(10));
		let after_blur = drain(&mut widget);

		// Typing again now validates loudly and clears promptly
		widget.handle(
			WidgetInput::Input {
				text: "A".to_string(),
			},
			start + Duration::from_millis(20),
		);
		let after_fix = drain(&mut widget);

		// Assert
		assert!(while_typing
			.iter()
			.all(|e| !matches!(e, WidgetEvent::ErrorsChange { .. })));
		assert!(after_blur.iter().any(|e| matches!(
			e,
			WidgetEvent::ErrorsChange { errors, .. } if errors == &vec![ErrorCode::Required]
		)));
		assert!(after_fix.iter().any(|e| matches!(
			e,
			WidgetEvent::ErrorsChange { errors, .. } if errors.is_empty()
		)));
	}

	#[rstest]
	fn test_render_input_and_displaymode() {
		// Arrange
		let mut widget = TextInput::new(
			FieldDefinition::new("foo", FieldType::ShortText)
				.required()
				.with_placeholder("Your name"),
		);
		widget.set_model(json!("Ada"));

		// Act
		let edit = widget.render(&RenderHints::default());
		let display = widget.render(&RenderHints {
			displaymode: true,
			..RenderHints::default()
		});

		// Assert
		assert!(edit.contains(r#"<input type="text" name="foo""#));
		assert!(edit.contains(r#"placeholder="Your name""#));
		assert!(edit.contains(" required"));
		assert!(edit.contains(r#"value="Ada""#));
		assert_eq!(display, r#"<div class="display">Ada</div>"#);
	}
}
