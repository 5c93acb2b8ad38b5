//! Registry for caller-defined field types.
//!
//! The built-in [`FieldType`](crate::schema::FieldType) set is closed; a
//! caller extends it by registering a render/validate capability under a
//! custom tag. The engine resolves `FieldType::Custom` tags here without
//! knowing the implementation.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::schema::FieldDefinition;
use crate::validation::ErrorCode;

/// Rendering context handed to widgets.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderHints {
	pub displaymode: bool,
	pub click_to_edit: bool,
	/// Position of the field within the render pass.
	pub index: usize,
}

/// Capability pair a custom field type provides.
pub trait CustomWidget: Send + Sync {
	fn render(&self, field: &FieldDefinition, value: &Value, hints: &RenderHints) -> String;

	/// Custom types without rules validate clean by default.
	fn validate(&self, _field: &FieldDefinition, _value: &Value) -> Vec<ErrorCode> {
		vec![]
	}
}

/// Mapping from custom type tags to their capability.
#[derive(Default)]
pub struct WidgetRegistry {
	widgets: HashMap<String, Arc<dyn CustomWidget>>,
}

impl WidgetRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a capability under a type tag, replacing any previous one.
	pub fn register(&mut self, tag: impl Into<String>, widget: Arc<dyn CustomWidget>) {
		self.widgets.insert(tag.into(), widget);
	}

	pub fn get(&self, tag: &str) -> Option<Arc<dyn CustomWidget>> {
		self.widgets.get(tag).cloned()
	}

	pub fn contains(&self, tag: &str) -> bool {
		self.widgets.contains_key(tag)
	}
}
