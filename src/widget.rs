//! The field widget contract.
//!
//! Widgets are headless interactive controls: they hold a local model,
//! evaluate their own validation rules, render to an HTML string, and queue
//! notifications instead of mutating shared state. The engine drains the
//! queue and is the only writer of the form model and error map.

use std::time::Instant;

use serde_json::Value;

use crate::registry::RenderHints;
use crate::validation::ErrorCode;

/// Notifications a widget queues for the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
	/// The local model changed (possibly debounced).
	ModelChange { id: String, value: Value },
	/// Published validation state changed.
	ErrorsChange { id: String, errors: Vec<ErrorCode> },
	/// The user asked to submit from within the field (Enter, blur in
	/// click-to-edit mode).
	InputSubmit { id: String, value: Value },
	/// The user abandoned the edit (Escape).
	InputCancel { id: String },
}

/// Host interactions delivered to a widget. Widgets ignore inputs that do
/// not apply to them.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetInput {
	/// Live typing into a text-like control.
	Input { text: String },
	/// Selecting an option by id (radio, dropdown).
	Choose { option_id: String },
	/// Flipping a checkbox.
	Toggle,
	/// Focus leaving the control.
	Blur,
	Enter,
	Escape,
	/// Appending a row to a multirow group.
	AddRow,
	/// Removing a row from a multirow group.
	DeleteRow { index: usize },
	/// Setting one part of a multipart field.
	SetPart { part_id: String, value: Value },
}

/// The capability the engine requires of every field control.
pub trait FieldWidget: Send {
	fn id(&self) -> &str;

	/// Current local model value.
	fn model(&self) -> Value;

	/// Overwrite the local model (engine-side resolution result).
	fn set_model(&mut self, value: Value);

	/// Evaluate the widget's rules against its current model.
	///
	/// Returns true when valid. When `silent` is set the fresh result is
	/// returned but not published: the stored error state and the event
	/// queue stay untouched, so no flicker reaches observers while the
	/// user is mid-edit.
	fn validate(&mut self, silent: bool) -> bool;

	/// Last published error codes.
	fn errors(&self) -> &[ErrorCode];

	/// Deliver one host interaction.
	fn handle(&mut self, input: WidgetInput, now: Instant);

	/// Advance the widget's clock (debounce windows).
	fn tick(&mut self, now: Instant);

	fn focus(&mut self) {}

	fn render(&self, hints: &RenderHints) -> String;

	/// Drain queued notifications, oldest first.
	fn take_events(&mut self) -> Vec<WidgetEvent>;
}

pub(crate) fn html_escape(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
		.replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("a&b", "a&amp;b")]
	#[case("<script>", "&lt;script&gt;")]
	#[case("\"quoted\"", "&quot;quoted&quot;")]
	#[case("it's", "it&#x27;s")]
	fn test_html_escape(#[case] raw: &str, #[case] escaped: &str) {
		assert_eq!(html_escape(raw), escaped);
	}
}
