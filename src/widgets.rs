//! Built-in field widgets and the factory that picks one per field type.

pub mod checkbox;
pub mod custom;
pub mod hidden;
pub mod label;
pub mod multipart;
pub mod multirow;
pub mod radio;
pub mod select;
pub mod text;

pub use checkbox::CheckboxInput;
pub use custom::CustomFieldWidget;
pub use hidden::HiddenInput;
pub use label::LabelWidget;
pub use multipart::MultipartInput;
pub use multirow::MultirowGroup;
pub use radio::RadioInput;
pub use select::SelectInput;
pub use text::TextInput;

use crate::registry::WidgetRegistry;
use crate::schema::{FieldDefinition, FieldType};
use crate::validation::FieldValidator;
use crate::widget::FieldWidget;

/// Instantiate the widget for a field definition.
///
/// Custom types resolve through the registry; an unregistered tag yields
/// `None` and the field is skipped.
pub fn build(
	field: &FieldDefinition,
	registry: &WidgetRegistry,
	validator: Option<FieldValidator>,
) -> Option<Box<dyn FieldWidget>> {
	let field = field.clone();
	let widget: Box<dyn FieldWidget> = match field.field_type.clone() {
		FieldType::ShortText | FieldType::LongText | FieldType::Number => {
			let text = TextInput::new(field);
			Box::new(match validator {
				Some(validator) => text.with_validator(validator),
				None => text,
			})
		}
		FieldType::Dropdown => Box::new(SelectInput::new(field)),
		FieldType::Radio => Box::new(RadioInput::new(field)),
		FieldType::Checkbox => Box::new(CheckboxInput::new(field)),
		FieldType::Hidden => Box::new(HiddenInput::new(field)),
		FieldType::Label => Box::new(LabelWidget::new(field)),
		FieldType::MultipartInput => Box::new(MultipartInput::new(field)),
		FieldType::MultirowGroup => Box::new(MultirowGroup::new(field)),
		FieldType::Custom(tag) => {
			let Some(capability) = registry.get(&tag) else {
				tracing::warn!(field = %field.id, tag, "no widget registered for custom type");
				return None;
			};
			Box::new(CustomFieldWidget::new(field, capability))
		}
	};
	Some(widget)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(FieldType::ShortText)]
	#[case(FieldType::Dropdown)]
	#[case(FieldType::Radio)]
	#[case(FieldType::Checkbox)]
	#[case(FieldType::Hidden)]
	#[case(FieldType::Label)]
	#[case(FieldType::MultipartInput)]
	#[case(FieldType::MultirowGroup)]
	fn test_builtin_types_all_build(#[case] field_type: FieldType) {
		// Arrange
		let field = FieldDefinition::new("f", field_type);
		let registry = WidgetRegistry::new();

		// Act
		let widget = build(&field, &registry, None);

		// Assert
		assert!(widget.is_some_and(|w| w.id() == "f"));
	}

	#[rstest]
	fn test_unregistered_custom_type_builds_nothing() {
		// Arrange
		let field = FieldDefinition::new("f", FieldType::Custom("sparkline".to_string()));
		let registry = WidgetRegistry::new();

		// Act + Assert
		assert!(build(&field, &registry, None).is_none());
	}
}
