//! Declarative form schema types.
//!
//! A [`FormSchema`] is plain serializable data: it carries no closures or
//! trait objects, so it can be loaded from JSON configuration, stored, and
//! shipped across process boundaries. Runtime attachments (custom field
//! validators, the whole-form validator, the pre-submit hook) are configured
//! on the engine instead.

use serde::{Deserialize, Serialize};

use crate::error::{FormError, FormResult};

/// Sentinel match value: the rule matches any non-empty value of the
/// referenced field.
pub const MATCH_ANY: &str = "ANY";

/// Field type discriminant.
///
/// The built-in set is closed; unknown tags deserialize into
/// [`FieldType::Custom`] and are resolved through the widget registry.
///
/// # Examples
///
/// ```
/// use formwright::FieldType;
///
/// let ty: FieldType = serde_json::from_str("\"short_text\"").unwrap();
/// assert_eq!(ty, FieldType::ShortText);
///
/// let custom: FieldType = serde_json::from_str("\"color_picker\"").unwrap();
/// assert_eq!(custom, FieldType::Custom("color_picker".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
	ShortText,
	LongText,
	Number,
	Radio,
	Dropdown,
	Hidden,
	Checkbox,
	MultipartInput,
	MultirowGroup,
	Label,
	/// Caller-registered type, resolved through the widget registry.
	Custom(String),
}

impl FieldType {
	pub fn as_str(&self) -> &str {
		match self {
			FieldType::ShortText => "short_text",
			FieldType::LongText => "long_text",
			FieldType::Number => "number",
			FieldType::Radio => "radio",
			FieldType::Dropdown => "dropdown",
			FieldType::Hidden => "hidden",
			FieldType::Checkbox => "checkbox",
			FieldType::MultipartInput => "multipart_input",
			FieldType::MultirowGroup => "multirow_group",
			FieldType::Label => "label",
			FieldType::Custom(tag) => tag,
		}
	}
	/// Types that carry free text and participate in trim/minlength rules.
	pub fn is_text(&self) -> bool {
		matches!(
			self,
			FieldType::ShortText | FieldType::LongText | FieldType::Number
		)
	}
}

impl From<String> for FieldType {
	fn from(tag: String) -> Self {
		match tag.as_str() {
			"short_text" => FieldType::ShortText,
			"long_text" => FieldType::LongText,
			"number" => FieldType::Number,
			"radio" => FieldType::Radio,
			"dropdown" => FieldType::Dropdown,
			"hidden" => FieldType::Hidden,
			"checkbox" => FieldType::Checkbox,
			"multipart_input" => FieldType::MultipartInput,
			"multirow_group" => FieldType::MultirowGroup,
			"label" => FieldType::Label,
			_ => FieldType::Custom(tag),
		}
	}
}

impl From<FieldType> for String {
	fn from(ty: FieldType) -> Self {
		ty.as_str().to_string()
	}
}

/// Shape check applied to a text value on top of the generic rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidateAs {
	Email,
}

/// One selectable option for choice-type fields (radio, dropdown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
	pub id: String,
	pub name: String,
}

impl ChoiceOption {
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
		}
	}
}

/// Conditional-visibility predicate referencing another field's value.
///
/// A field carrying show rules is hidden by default and becomes visible
/// when ANY of its rules matches. A rule matches when the referenced
/// field's value is non-empty and either appears literally in `matches`
/// or `matches` contains the [`MATCH_ANY`] sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowRule {
	pub field_id: String,
	#[serde(default)]
	pub matches: Vec<String>,
}

impl ShowRule {
	pub fn new(field_id: impl Into<String>, matches: Vec<String>) -> Self {
		Self {
			field_id: field_id.into(),
			matches,
		}
	}
	/// Rule that matches any non-empty value of the referenced field.
	pub fn any(field_id: impl Into<String>) -> Self {
		Self {
			field_id: field_id.into(),
			matches: vec![MATCH_ANY.to_string()],
		}
	}
}

/// Layout of the parts inside a multipart field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartLayout {
	#[default]
	Horizontal,
	HorizontalWrap,
	Vertical,
}

/// One part of a multipart field.
///
/// Parts are a restricted form of field definition: no show rules, no
/// nested composites beyond `hidden` defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDefinition {
	pub id: String,
	#[serde(rename = "type")]
	pub field_type: FieldType,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub placeholder: Option<String>,
	#[serde(default)]
	pub required: bool,
	#[serde(default)]
	pub horizontal: bool,
	#[serde(default)]
	pub options: Vec<ChoiceOption>,
	#[serde(default)]
	pub validate_as: Option<ValidateAs>,
	/// Value used when the model carries nothing for this part (hidden parts).
	#[serde(default)]
	pub default: Option<serde_json::Value>,
}

impl PartDefinition {
	pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			id: id.into(),
			field_type,
			label: None,
			description: None,
			placeholder: None,
			required: false,
			horizontal: false,
			options: vec![],
			validate_as: None,
			default: None,
		}
	}
	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}
	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}
	pub fn with_options(mut self, options: Vec<ChoiceOption>) -> Self {
		self.options = options;
		self
	}
	pub fn with_default(mut self, default: serde_json::Value) -> Self {
		self.default = Some(default);
		self
	}
}

/// Configuration of the repeated field inside a multirow group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFieldConfig {
	#[serde(rename = "type")]
	pub field_type: FieldType,
	/// Parts schema, used when the row type is `multipart_input`.
	#[serde(default)]
	pub schema: Vec<PartDefinition>,
	#[serde(default)]
	pub layout: PartLayout,
	#[serde(default)]
	pub required: bool,
	#[serde(default)]
	pub min: Option<f64>,
	#[serde(default)]
	pub max: Option<f64>,
	#[serde(default)]
	pub validate_as: Option<ValidateAs>,
}

impl RowFieldConfig {
	pub fn new(field_type: FieldType) -> Self {
		Self {
			field_type,
			schema: vec![],
			layout: PartLayout::default(),
			required: false,
			min: None,
			max: None,
			validate_as: None,
		}
	}
	pub fn with_schema(mut self, schema: Vec<PartDefinition>) -> Self {
		self.schema = schema;
		self
	}
}

/// Declarative description of one form field.
///
/// Immutable per render pass. The custom per-field validator is a runtime
/// attachment registered on the engine, keyed by this field's `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
	/// Unique id within the schema; doubles as the model key.
	pub id: String,
	/// Secondary key used for prefill lookups.
	#[serde(default)]
	pub alias_id: Option<String>,
	#[serde(rename = "type")]
	pub field_type: FieldType,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub placeholder: Option<String>,
	#[serde(default)]
	pub required: bool,
	#[serde(default)]
	pub disabled: bool,
	/// Value derives from `computed_expression` instead of user input.
	#[serde(default)]
	pub computed: bool,
	/// Bypasses all rule evaluation for this field.
	#[serde(default)]
	pub disable_validation: bool,
	#[serde(default)]
	pub minlength: Option<usize>,
	#[serde(default)]
	pub validate_as: Option<ValidateAs>,
	/// Pattern a non-empty value must match.
	#[serde(default)]
	pub validate_regex: Option<String>,
	#[serde(default)]
	pub options: Vec<ChoiceOption>,
	/// When non-empty, the field is hidden unless at least one rule matches.
	#[serde(default)]
	pub show_rules: Vec<ShowRule>,
	/// Template with `{{token}}` placeholders, for computed fields.
	#[serde(default)]
	pub computed_expression: Option<String>,
	/// Repeated-field configuration, for `multirow_group` fields.
	#[serde(default)]
	pub row_field: Option<RowFieldConfig>,
	/// Parts schema, for `multipart_input` fields.
	#[serde(default)]
	pub parts: Vec<PartDefinition>,
	/// Lay choice options out horizontally (radio).
	#[serde(default)]
	pub horizontal: bool,
	/// Part layout, for `multipart_input` fields.
	#[serde(default)]
	pub layout: Option<PartLayout>,
	/// Rows created up front on first render (multirow groups).
	#[serde(default)]
	pub default_row_count: usize,
	/// Add-row button label (multirow groups).
	#[serde(default)]
	pub button_text: Option<String>,
	/// Value supplied when the model carries nothing (hidden fields).
	#[serde(default)]
	pub default: Option<serde_json::Value>,
}

impl FieldDefinition {
	/// Create a field definition with the given id and type.
	///
	/// # Examples
	///
	/// ```
	/// use formwright::{FieldDefinition, FieldType};
	///
	/// let field = FieldDefinition::new("email", FieldType::ShortText);
	/// assert_eq!(field.id, "email");
	/// assert!(!field.required);
	/// ```
	pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			id: id.into(),
			alias_id: None,
			field_type,
			label: None,
			description: None,
			placeholder: None,
			required: false,
			disabled: false,
			computed: false,
			disable_validation: false,
			minlength: None,
			validate_as: None,
			validate_regex: None,
			options: vec![],
			show_rules: vec![],
			computed_expression: None,
			row_field: None,
			parts: vec![],
			horizontal: false,
			layout: None,
			default_row_count: 0,
			button_text: None,
			default: None,
		}
	}
	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}
	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}
	pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
		self.placeholder = Some(placeholder.into());
		self
	}
	pub fn with_alias_id(mut self, alias_id: impl Into<String>) -> Self {
		self.alias_id = Some(alias_id.into());
		self
	}
	pub fn with_minlength(mut self, minlength: usize) -> Self {
		self.minlength = Some(minlength);
		self
	}
	pub fn with_validate_as(mut self, validate_as: ValidateAs) -> Self {
		self.validate_as = Some(validate_as);
		self
	}
	pub fn with_validate_regex(mut self, pattern: impl Into<String>) -> Self {
		self.validate_regex = Some(pattern.into());
		self
	}
	pub fn with_options(mut self, options: Vec<ChoiceOption>) -> Self {
		self.options = options;
		self
	}
	pub fn with_show_rule(mut self, rule: ShowRule) -> Self {
		self.show_rules.push(rule);
		self
	}
	pub fn computed(mut self, expression: impl Into<String>) -> Self {
		self.computed = true;
		self.computed_expression = Some(expression.into());
		self
	}
	pub fn with_row_field(mut self, row_field: RowFieldConfig) -> Self {
		self.row_field = Some(row_field);
		self
	}
	pub fn with_parts(mut self, parts: Vec<PartDefinition>) -> Self {
		self.parts = parts;
		self
	}
	pub fn disable_validation(mut self) -> Self {
		self.disable_validation = true;
		self
	}
	pub fn with_default_value(mut self, default: serde_json::Value) -> Self {
		self.default = Some(default);
		self
	}
	/// Display text for error messages: the label when set, the id otherwise.
	pub fn label_text(&self) -> &str {
		match self.label.as_deref() {
			Some(label) if !label.is_empty() => label,
			_ => &self.id,
		}
	}
}

/// The declarative, caller-supplied description of a form.
///
/// Field order is significant: it is both render order and the precedence
/// order for the first-field-with-error lookup.
///
/// # Examples
///
/// ```
/// use formwright::{FieldDefinition, FieldType, FormSchema};
///
/// let mut schema = FormSchema::new();
/// schema.add_field(FieldDefinition::new("name", FieldType::ShortText).required());
/// schema.add_field(FieldDefinition::new("bio", FieldType::LongText));
/// assert_eq!(schema.fields.len(), 2);
/// assert!(schema.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub fields: Vec<FieldDefinition>,
}

impl FormSchema {
	pub fn new() -> Self {
		Self::default()
	}
	pub fn with_title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}
	pub fn add_field(&mut self, field: FieldDefinition) {
		self.fields.push(field);
	}
	pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
		self.fields.iter().find(|f| f.id == id)
	}
	/// Check structural invariants: field ids must be non-empty and unique.
	pub fn validate(&self) -> FormResult<()> {
		let mut seen = std::collections::HashSet::new();
		for field in &self.fields {
			if field.id.is_empty() {
				return Err(FormError::Schema("field id must not be empty".to_string()));
			}
			if !seen.insert(field.id.as_str()) {
				return Err(FormError::DuplicateField(field.id.clone()));
			}
		}
		Ok(())
	}
}
