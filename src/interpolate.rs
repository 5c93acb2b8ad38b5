//! Placeholder substitution for computed field expressions.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::model::{is_empty_value, value_text};

static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\{\{(.*?)\}\}").expect("PLACEHOLDER_REGEX: invalid regex pattern")
});

/// Replace every `{{token}}` in `template` with the matching entry from
/// `values`. Tokens without an entry (or with an empty value) are replaced
/// by the empty string.
///
/// # Examples
///
/// ```
/// use formwright::interpolate::replace_placeholders;
/// use serde_json::json;
/// use std::collections::HashMap;
///
/// let mut values = HashMap::new();
/// values.insert("name".to_string(), json!("Ada"));
/// assert_eq!(
///     replace_placeholders("Hello {{name}}{{punct}}", &values),
///     "Hello Ada"
/// );
/// ```
pub fn replace_placeholders(template: &str, values: &HashMap<String, Value>) -> String {
	PLACEHOLDER_REGEX
		.replace_all(template, |caps: &regex::Captures<'_>| {
			let token = &caps[1];
			match values.get(token) {
				Some(value) if !is_empty_value(Some(value)) => value_text(value),
				_ => String::new(),
			}
		})
		.into_owned()
}
