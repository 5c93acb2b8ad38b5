//! Field validation rules.
//!
//! The evaluator is a pure function of (rule set, value): it never touches
//! shared error state. Publication of the resulting codes (and the silent
//! mode that skips it) is the widget and engine layer's concern.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::model::value_text;
use crate::schema::{FieldDefinition, FieldType, PartDefinition, ValidateAs};

// Email shape check only; deliverability is the caller's problem.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("EMAIL_REGEX: invalid regex pattern")
});

/// Validation failure codes, ordered by display priority where they appear
/// together in an evaluation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
	Required,
	MinLength,
	Validation,
	InvalidEmail,
	Invalid,
	/// A required multirow group has no rows.
	NoRows,
	/// Code returned by a caller-supplied validator.
	Custom(String),
}

impl ErrorCode {
	pub fn as_str(&self) -> &str {
		match self {
			ErrorCode::Required => "required",
			ErrorCode::MinLength => "minlength",
			ErrorCode::Validation => "validation",
			ErrorCode::InvalidEmail => "invalid-email",
			ErrorCode::Invalid => "invalid",
			ErrorCode::NoRows => "no_rows",
			ErrorCode::Custom(code) => code,
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Result of a caller-supplied per-field validator.
#[derive(Debug, Clone)]
pub struct FieldCheck {
	pub valid: bool,
	pub error: Option<ErrorCode>,
}

impl FieldCheck {
	pub fn pass() -> Self {
		Self {
			valid: true,
			error: None,
		}
	}
	pub fn fail(error: ErrorCode) -> Self {
		Self {
			valid: false,
			error: Some(error),
		}
	}
}

/// Caller-supplied per-field validator, run against the trimmed value.
pub type FieldValidator = Arc<dyn Fn(&str) -> FieldCheck + Send + Sync>;

/// The rule inputs shared by full field definitions and multipart parts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSet<'a> {
	pub required: bool,
	pub minlength: Option<usize>,
	pub validate_as: Option<ValidateAs>,
	pub validate_regex: Option<&'a str>,
	pub disable_validation: bool,
}

impl<'a> From<&'a FieldDefinition> for RuleSet<'a> {
	fn from(field: &'a FieldDefinition) -> Self {
		Self {
			required: field.required,
			minlength: field.minlength,
			validate_as: field.validate_as,
			validate_regex: field.validate_regex.as_deref(),
			disable_validation: field.disable_validation,
		}
	}
}

impl<'a> From<&'a PartDefinition> for RuleSet<'a> {
	fn from(part: &'a PartDefinition) -> Self {
		Self {
			required: part.required,
			minlength: None,
			validate_as: part.validate_as,
			validate_regex: None,
			disable_validation: false,
		}
	}
}

/// Evaluate the rule set against a value.
///
/// Rules run in fixed priority order; every failing rule contributes a code
/// and the first entry of the result is the one a widget displays:
///
/// 1. `required`: trimmed value is empty;
/// 2. `minlength`: only checked when the field is required and non-empty;
/// 3. the caller-supplied validator;
/// 4. `validate_as = email`: the value fails the email shape check;
/// 5. `validate_regex`: a non-empty value fails the pattern.
///
/// `disable_validation` short-circuits everything to valid.
pub fn evaluate(rules: &RuleSet<'_>, value: &Value, validator: Option<&FieldValidator>) -> Vec<ErrorCode> {
	if rules.disable_validation {
		return vec![];
	}

	let text = value_text(value);
	let trimmed = text.trim();
	let mut codes = vec![];

	if rules.required {
		if trimmed.is_empty() {
			codes.push(ErrorCode::Required);
		} else if let Some(minlength) = rules.minlength
			&& trimmed.chars().count() < minlength
		{
			codes.push(ErrorCode::MinLength);
		}
	}

	if let Some(validator) = validator {
		let check = validator(trimmed);
		if !check.valid {
			codes.push(check.error.unwrap_or(ErrorCode::Validation));
		}
	}

	if rules.validate_as == Some(ValidateAs::Email) && !EMAIL_REGEX.is_match(trimmed) {
		codes.push(ErrorCode::InvalidEmail);
	}

	if let Some(pattern) = rules.validate_regex
		&& !trimmed.is_empty()
	{
		match Regex::new(pattern) {
			Ok(regex) => {
				if !regex.is_match(trimmed) {
					codes.push(ErrorCode::Invalid);
				}
			}
			Err(error) => {
				tracing::warn!(pattern, %error, "skipping unparseable validate_regex");
			}
		}
	}

	codes
}

/// Evaluate a field definition's rules against a value.
///
/// # Examples
///
/// ```
/// use formwright::validation::{validate_field, ErrorCode};
/// use formwright::{FieldDefinition, FieldType};
/// use serde_json::json;
///
/// let field = FieldDefinition::new("name", FieldType::ShortText).required();
/// assert_eq!(
///     validate_field(&field, &json!("   "), None),
///     vec![ErrorCode::Required]
/// );
/// assert!(validate_field(&field, &json!("Ada"), None).is_empty());
/// ```
pub fn validate_field(
	field: &FieldDefinition,
	value: &Value,
	validator: Option<&FieldValidator>,
) -> Vec<ErrorCode> {
	evaluate(&RuleSet::from(field), value, validator)
}

/// Human-readable message for a failure code on a given field.
pub fn display_message(field: &FieldDefinition, code: &ErrorCode) -> String {
	let label = field.label_text();
	match code {
		ErrorCode::Required => match field.field_type {
			FieldType::Radio | FieldType::Dropdown => "Please select an option".to_string(),
			_ => format!("{label} cannot be blank"),
		},
		ErrorCode::MinLength => {
			let minlength = field.minlength.unwrap_or(0);
			format!("{label} should have at least length {minlength}")
		}
		ErrorCode::InvalidEmail => format!("{label} is not a valid email"),
		ErrorCode::Validation | ErrorCode::Invalid => format!("{label} is invalid"),
		ErrorCode::NoRows => "Add at least one row".to_string(),
		ErrorCode::Custom(text) => text.clone(),
	}
}
