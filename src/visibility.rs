//! Conditional field visibility.
//!
//! Show rules are declarative conditions over the current model: a field
//! with rules is hidden until one of them matches. The evaluator is a pure
//! function of (rule set, model snapshot); the engine re-evaluates it on
//! every model mutation that touches a referenced field.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::model::{is_empty_value, value_text};
use crate::schema::{FieldDefinition, FormSchema, MATCH_ANY};

/// Decide whether a field renders under the given model.
///
/// Fields without show rules are always visible. Otherwise the field is
/// hidden unless ANY rule matches: the referenced field's value must be
/// non-empty and either equal one of the rule's `matches` literals or the
/// rule must carry the `"ANY"` sentinel.
///
/// # Examples
///
/// ```
/// use formwright::visibility::is_visible;
/// use formwright::{FieldDefinition, FieldType, ShowRule};
/// use serde_json::json;
/// use std::collections::HashMap;
///
/// let field = FieldDefinition::new("detail", FieldType::ShortText)
///     .with_show_rule(ShowRule::new("kind", vec!["foo".to_string()]));
///
/// let mut model = HashMap::new();
/// assert!(!is_visible(&field, &model));
///
/// model.insert("kind".to_string(), json!("foo"));
/// assert!(is_visible(&field, &model));
///
/// model.insert("kind".to_string(), json!("bar"));
/// assert!(!is_visible(&field, &model));
/// ```
pub fn is_visible(field: &FieldDefinition, model: &HashMap<String, Value>) -> bool {
	if field.show_rules.is_empty() {
		return true;
	}

	field.show_rules.iter().any(|rule| {
		let value = model.get(&rule.field_id);
		if is_empty_value(value) {
			return false;
		}
		let text = value.map(value_text).unwrap_or_default();
		rule.matches
			.iter()
			.any(|m| m == MATCH_ANY || *m == text)
	})
}

/// Reverse index from referenced field ids to the fields whose visibility
/// (and cached render) depends on them.
///
/// Rebuilt whenever the schema is replaced. A change to field `X`
/// invalidates the cached render of every field listed under `X`.
#[derive(Debug, Default)]
pub struct DependencyIndex {
	dependents: HashMap<String, HashSet<String>>,
}

impl DependencyIndex {
	pub fn from_schema(schema: &FormSchema) -> Self {
		let known: HashSet<&str> = schema.fields.iter().map(|f| f.id.as_str()).collect();
		let mut dependents: HashMap<String, HashSet<String>> = HashMap::new();
		for field in &schema.fields {
			for rule in &field.show_rules {
				if !known.contains(rule.field_id.as_str()) {
					tracing::warn!(
						field = %field.id,
						references = %rule.field_id,
						"show rule references a field id not present in the schema"
					);
				}
				dependents
					.entry(rule.field_id.clone())
					.or_default()
					.insert(field.id.clone());
			}
		}
		Self { dependents }
	}

	/// Fields whose visibility depends on `field_id`.
	pub fn dependents_of(&self, field_id: &str) -> impl Iterator<Item = &str> {
		self.dependents
			.get(field_id)
			.into_iter()
			.flat_map(|set| set.iter().map(|s| s.as_str()))
	}

	/// Field ids a given field's rules reference, in rule order.
	pub fn references_of<'a>(&self, field: &'a FieldDefinition) -> Vec<&'a str> {
		field
			.show_rules
			.iter()
			.map(|rule| rule.field_id.as_str())
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{FieldType, ShowRule};
	use rstest::rstest;
	use serde_json::json;

	fn model_of(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.clone()))
			.collect()
	}

	#[rstest]
	fn test_no_rules_always_visible() {
		// Arrange
		let field = FieldDefinition::new("plain", FieldType::ShortText);

		// Act + Assert
		assert!(is_visible(&field, &HashMap::new()));
		assert!(is_visible(&field, &model_of(&[("other", json!("x"))])));
	}

	#[rstest]
	#[case(&[], false)]
	#[case(&[("abcd", json!("foo"))], true)]
	#[case(&[("abcd", json!("bar"))], false)]
	#[case(&[("abcd", json!(""))], false)]
	#[case(&[("abcd", json!(null))], false)]
	fn test_literal_match(#[case] pairs: &[(&str, Value)], #[case] expected: bool) {
		// Arrange
		let field = FieldDefinition::new("bcde", FieldType::ShortText)
			.with_show_rule(ShowRule::new("abcd", vec!["foo".to_string()]));

		// Act + Assert
		assert_eq!(is_visible(&field, &model_of(pairs)), expected);
	}

	#[rstest]
	#[case(&[("abcd", json!("foo"))], true)]
	#[case(&[("abcd", json!("bar"))], true)]
	#[case(&[("abcd", json!(0))], true)]
	#[case(&[], false)]
	#[case(&[("abcd", json!(""))], false)]
	fn test_any_sentinel(#[case] pairs: &[(&str, Value)], #[case] expected: bool) {
		// Arrange
		let field = FieldDefinition::new("bcde", FieldType::ShortText)
			.with_show_rule(ShowRule::any("abcd"));

		// Act + Assert
		assert_eq!(is_visible(&field, &model_of(pairs)), expected);
	}

	#[rstest]
	fn test_any_rule_in_set_suffices() {
		// Arrange: two rules, only the second matches
		let field = FieldDefinition::new("dep", FieldType::ShortText)
			.with_show_rule(ShowRule::new("a", vec!["never".to_string()]))
			.with_show_rule(ShowRule::new("b", vec!["yes".to_string()]));

		// Act + Assert
		assert!(is_visible(&field, &model_of(&[("b", json!("yes"))])));
	}

	#[rstest]
	fn test_numeric_value_matches_literal() {
		// Arrange: model values are matched through their string form
		let field = FieldDefinition::new("dep", FieldType::ShortText)
			.with_show_rule(ShowRule::new("count", vec!["3".to_string()]));

		// Act + Assert
		assert!(is_visible(&field, &model_of(&[("count", json!(3))])));
		assert!(!is_visible(&field, &model_of(&[("count", json!(4))])));
	}

	#[rstest]
	fn test_dependency_index() {
		// Arrange
		let mut schema = FormSchema::new();
		schema.add_field(FieldDefinition::new("kind", FieldType::Dropdown));
		schema.add_field(
			FieldDefinition::new("detail", FieldType::ShortText)
				.with_show_rule(ShowRule::new("kind", vec!["foo".to_string()])),
		);
		schema.add_field(
			FieldDefinition::new("extra", FieldType::ShortText)
				.with_show_rule(ShowRule::any("kind")),
		);

		// Act
		let index = DependencyIndex::from_schema(&schema);
		let mut dependents: Vec<&str> = index.dependents_of("kind").collect();
		dependents.sort_unstable();

		// Assert
		assert_eq!(dependents, vec!["detail", "extra"]);
		assert_eq!(index.dependents_of("detail").count(), 0);
	}
}
