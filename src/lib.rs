//! Schema-driven form engine
//!
//! This crate turns a declarative [`FormSchema`] into a running form:
//! - dynamic field instantiation over a closed set of built-in types plus
//!   a registry for caller-defined ones
//! - bidirectional model binding with revert-on-cancel semantics
//! - per-field validation (required, min-length, email, pattern, custom)
//!   in a fixed priority order, with silent evaluation while typing
//! - conditional field visibility driven by show rules, including the
//!   `"ANY"` sentinel
//! - a submit lifecycle with whole-form validation and an async pre-submit
//!   hook, observable as an explicit phase
//!
//! Widgets are headless: they render HTML strings and queue change, submit,
//! and cancel notifications which the [`FormEngine`] drains and applies.

pub mod debounce;
pub mod engine;
pub mod error;
pub mod interpolate;
pub mod model;
pub mod registry;
pub mod schema;
pub mod validation;
pub mod visibility;
pub mod widget;
pub mod widgets;

pub use debounce::{Debouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use engine::{
	EngineSignal, FieldRender, FormEngine, FormValidator, PresubmitHook, SubmitOutcome,
	SubmitPhase, SubmitTrigger, ValidationHold,
};
pub use error::{FormError, FormResult};
pub use interpolate::replace_placeholders;
pub use model::ModelStore;
pub use registry::{CustomWidget, RenderHints, WidgetRegistry};
pub use schema::{
	ChoiceOption, FieldDefinition, FieldType, FormSchema, PartDefinition, PartLayout,
	RowFieldConfig, ShowRule, ValidateAs, MATCH_ANY,
};
pub use validation::{validate_field, ErrorCode, FieldCheck, FieldValidator};
pub use visibility::{is_visible, DependencyIndex};
pub use widget::{FieldWidget, WidgetEvent, WidgetInput};
