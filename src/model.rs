//! Authoritative form model plus the shadow previous-value map.

use std::collections::HashMap;

use serde_json::Value;

use crate::interpolate::replace_placeholders;
use crate::schema::FieldDefinition;

/// True when the value counts as absent: missing, null, or the empty string.
///
/// Numbers are always present (`0` is a valid explicit value) and so are
/// booleans, arrays, and objects.
///
/// # Examples
///
/// ```
/// use formwright::model::is_empty_value;
/// use serde_json::json;
///
/// assert!(is_empty_value(None));
/// assert!(is_empty_value(Some(&json!(null))));
/// assert!(is_empty_value(Some(&json!(""))));
/// assert!(!is_empty_value(Some(&json!(0))));
/// assert!(!is_empty_value(Some(&json!(false))));
/// ```
pub fn is_empty_value(value: Option<&Value>) -> bool {
	match value {
		None => true,
		Some(Value::Null) => true,
		Some(Value::String(s)) => s.is_empty(),
		Some(_) => false,
	}
}

/// String form of a scalar value, used for show-rule matching.
pub fn value_text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Number(n) => n.to_string(),
		Value::Bool(b) => b.to_string(),
		Value::Null => String::new(),
		other => other.to_string(),
	}
}

/// The form model plus the previous-value shadow map used for revert.
///
/// The shadow map records, once per field, the value a field held before its
/// first mutation in the current session. Replaying [`ModelStore::revert_field`]
/// for every shadowed key restores the store to its state immediately after
/// the last wholesale [`ModelStore::set_model`] (or successful submit, which
/// clears the shadow map).
#[derive(Debug, Default)]
pub struct ModelStore {
	model: HashMap<String, Value>,
	// None records "key was absent before the first change".
	prev: HashMap<String, Option<Value>>,
}

impl ModelStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Wholesale replace of the authoritative model. Clears the shadow map:
	/// a fresh model starts a fresh edit session.
	pub fn set_model(&mut self, model: HashMap<String, Value>) {
		self.model = model;
		self.prev.clear();
	}

	/// Defensive copy of the current model.
	///
	/// # Examples
	///
	/// ```
	/// use formwright::model::ModelStore;
	/// use serde_json::json;
	/// use std::collections::HashMap;
	///
	/// let mut store = ModelStore::new();
	/// let mut model = HashMap::new();
	/// model.insert("foo".to_string(), json!("Test"));
	/// store.set_model(model.clone());
	/// assert_eq!(store.model(), model);
	/// ```
	pub fn model(&self) -> HashMap<String, Value> {
		self.model.clone()
	}

	pub fn get(&self, id: &str) -> Option<&Value> {
		self.model.get(id)
	}

	/// Set a field's value, snapshotting the pre-change value the first time
	/// the field is touched in this session.
	pub fn update_field(&mut self, id: &str, value: Value) {
		self.prev
			.entry(id.to_string())
			.or_insert_with(|| self.model.get(id).cloned());
		self.model.insert(id.to_string(), value);
	}

	/// Restore a field from the shadow map. Returns true when a snapshot
	/// existed and was applied.
	pub fn revert_field(&mut self, id: &str) -> bool {
		match self.prev.remove(id) {
			Some(Some(value)) => {
				self.model.insert(id.to_string(), value);
				true
			}
			Some(None) => {
				self.model.remove(id);
				true
			}
			None => false,
		}
	}

	/// Drop a field's snapshot without restoring it (per-field submit accepts
	/// the new value as the baseline).
	pub fn commit_field(&mut self, id: &str) {
		self.prev.remove(id);
	}

	/// Drop every snapshot: the current model becomes the baseline.
	pub fn commit_all(&mut self) {
		self.prev.clear();
	}

	pub fn has_pending_edit(&self, id: &str) -> bool {
		self.prev.contains_key(id)
	}

	/// Reset the model to empty along with the shadow map.
	pub fn clear(&mut self) {
		self.model.clear();
		self.prev.clear();
	}

	/// Value resolution for rendering, in precedence order:
	///
	/// 1. computed fields resolve through the interpolation map: a value
	///    keyed by the field id wins, otherwise the computed expression is
	///    interpolated against the map;
	/// 2. the live model value when non-empty (`0` counts as present);
	/// 3. the prefill map, keyed by id and then by alias id;
	/// 4. null.
	pub fn resolve_field_value(
		&self,
		field: &FieldDefinition,
		prefill: &HashMap<String, Value>,
		interpolate: &HashMap<String, Value>,
	) -> Value {
		if field.computed
			&& let Some(expression) = field.computed_expression.as_deref()
		{
			if let Some(resolved) = interpolate.get(&field.id) {
				return resolved.clone();
			}
			return Value::String(replace_placeholders(expression, interpolate));
		}

		let live = self.model.get(&field.id);
		if !is_empty_value(live) {
			return live.cloned().unwrap_or(Value::Null);
		}

		if let Some(value) = prefill.get(&field.id) {
			return value.clone();
		}
		if let Some(alias) = field.alias_id.as_deref()
			&& let Some(value) = prefill.get(alias)
		{
			return value.clone();
		}

		Value::Null
	}
}
