//! The form engine: schema interpretation, model propagation, validation
//! aggregation, and the submit lifecycle.
//!
//! The engine owns the model store and both error channels. Widgets never
//! write shared state; they queue [`WidgetEvent`]s which the engine drains
//! after every interaction, inside the same dispatch turn. Hosts drive the
//! engine with [`dispatch`](FormEngine::dispatch) and [`tick`](FormEngine::tick)
//! and act on the returned [`EngineSignal`]s, typically by awaiting
//! [`submit`](FormEngine::submit).

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::debounce::Debouncer;
use crate::error::{FormError, FormResult};
use crate::model::ModelStore;
use crate::registry::{RenderHints, WidgetRegistry};
use crate::schema::{FieldDefinition, FormSchema};
use crate::validation::{display_message, ErrorCode, FieldValidator};
use crate::visibility::{is_visible, DependencyIndex};
use crate::widget::{FieldWidget, WidgetEvent, WidgetInput};
use crate::widgets;

/// Resting states of the whole-form submit lifecycle.
///
/// Rejection and pre-submit failure are edges, not states: both return the
/// engine to `Idle` within the same `submit` call and are reported through
/// [`SubmitOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPhase {
	#[default]
	Idle,
	Validating,
	PresubmitPending,
	Submitted,
}

impl SubmitPhase {
	pub fn as_str(&self) -> &'static str {
		match self {
			SubmitPhase::Idle => "idle",
			SubmitPhase::Validating => "validating",
			SubmitPhase::PresubmitPending => "presubmit_pending",
			SubmitPhase::Submitted => "submitted",
		}
	}
}

/// What started a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitTrigger {
	/// The form-level submit action.
	Form,
	/// A field-level trigger (Enter, or blur in click-to-edit mode).
	Field(String),
}

/// Result of one `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
	/// The model was emitted to the submit observers.
	Submitted,
	/// The guard refused to start: submission disabled, errors outstanding,
	/// or display mode.
	Blocked,
	/// Validation failed; nothing was emitted.
	Rejected { first_error_field: Option<String> },
	/// The pre-submit hook rejected; submission was re-enabled.
	PresubmitFailed,
}

/// Actions the engine asks the host to take after a dispatch turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSignal {
	/// Await [`FormEngine::submit`] with this trigger.
	SubmitRequested(SubmitTrigger),
	/// An in-field edit was abandoned and reverted.
	EditCancelled(String),
}

/// Whole-form validator: model in, message-per-field-id out. An empty map
/// means valid. The returned map fully replaces the previous custom error
/// channel.
pub type FormValidator = Box<dyn Fn(&HashMap<String, Value>) -> HashMap<String, String> + Send + Sync>;

/// Async gate run after validation passes and before the submit observers
/// fire. Pass means emit; fail means re-enable submission and do nothing.
pub type PresubmitHook =
	Box<dyn Fn() -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>> + Send + Sync>;

pub type SubmitObserver = Arc<dyn Fn(&HashMap<String, Value>) + Send + Sync>;
pub type CancelObserver = Arc<dyn Fn() + Send + Sync>;
pub type ErrorsObserver = Arc<dyn Fn(&str, &[ErrorCode]) + Send + Sync>;
pub type FirstErrorObserver = Arc<dyn Fn(&str) + Send + Sync>;

/// Guard returned by [`FormEngine::clear_form`]. Validation stays paused
/// until the host drops or [`release`](ValidationHold::release)s it after
/// its grace period, so the freshly emptied fields do not flash errors.
#[must_use = "validation stays paused until the hold is dropped"]
pub struct ValidationHold {
	flag: Arc<AtomicBool>,
}

impl ValidationHold {
	pub fn release(self) {}
}

impl Drop for ValidationHold {
	fn drop(&mut self) {
		self.flag.store(false, Ordering::Relaxed);
	}
}

/// One field's slice of a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRender {
	pub id: String,
	pub visible: bool,
	/// Nothing about the field changed since the last pass; `html` is the
	/// cached markup and the subtree can be reused as-is.
	pub reused: bool,
	/// Empty when the field is not visible.
	pub html: String,
	/// Highest-priority display message, if any rule currently fails.
	pub error: Option<String>,
}

// Memoization key per field: when the tuple is unchanged the widget subtree
// is reported as reusable.
#[derive(Debug, Clone, PartialEq)]
struct RenderFingerprint {
	displaymode: bool,
	generation: u64,
	visible: bool,
	value: Value,
	dependency_values: Vec<(String, Value)>,
	field_errors: Vec<ErrorCode>,
	custom_error: Option<String>,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Schema-driven form orchestrator.
///
/// ```mermaid
/// flowchart LR
///     H[host input] -->|dispatch| W[field widget]
///     W -->|ModelChange / ErrorsChange| E[engine]
///     E -->|update| M[(model store)]
///     M -->|visibility + resolution| R[render pass]
///     E -->|SubmitRequested| H
///     H -->|await submit| E
///     E -->|validate all, form validator, presubmit hook| O[submit observers]
/// ```
///
/// All interaction is turn-based: each `dispatch` fully processes the
/// widget's queued events, including derived model writes and eager error
/// re-validation, before returning.
pub struct FormEngine {
	schema: FormSchema,
	store: ModelStore,
	deps: DependencyIndex,
	registry: WidgetRegistry,
	widgets: Vec<Box<dyn FieldWidget>>,
	mounted: bool,

	// Error channels: per-field rule codes, and messages from the
	// whole-form validator or `set_field_error`. The custom channel is
	// fully replaced by every whole-form pass; the field channel is merged
	// key-by-key as widgets publish.
	field_errors: HashMap<String, Vec<ErrorCode>>,
	custom_errors: HashMap<String, String>,

	prefill_fields: HashMap<String, Value>,
	hidden_fields: HashSet<String>,
	interpolate_map: HashMap<String, Value>,
	field_validators: HashMap<String, FieldValidator>,
	form_validator: Option<FormValidator>,
	presubmit_hook: Option<PresubmitHook>,

	validate: bool,
	autosubmit: bool,
	displaymode: bool,
	click_to_edit: bool,
	disable_validation: bool,
	form_focus: bool,

	phase: SubmitPhase,
	disable_submit: bool,
	validation_hold: Arc<AtomicBool>,
	first_error_field: Option<String>,
	generation: u64,
	fingerprints: HashMap<String, (RenderFingerprint, FieldRender)>,
	inline_submit: Debouncer<String>,

	on_submit: Vec<SubmitObserver>,
	on_cancel: Vec<CancelObserver>,
	on_errors_change: Vec<ErrorsObserver>,
	on_first_error: Vec<FirstErrorObserver>,
}

impl FormEngine {
	/// Build an engine for a schema. Fails when the schema carries
	/// duplicate field ids.
	pub fn new(schema: FormSchema) -> FormResult<Self> {
		schema.validate()?;
		let deps = DependencyIndex::from_schema(&schema);
		Ok(Self {
			schema,
			store: ModelStore::new(),
			deps,
			registry: WidgetRegistry::new(),
			widgets: vec![],
			mounted: false,
			field_errors: HashMap::new(),
			custom_errors: HashMap::new(),
			prefill_fields: HashMap::new(),
			hidden_fields: HashSet::new(),
			interpolate_map: HashMap::new(),
			field_validators: HashMap::new(),
			form_validator: None,
			presubmit_hook: None,
			validate: true,
			autosubmit: false,
			displaymode: false,
			click_to_edit: false,
			disable_validation: false,
			form_focus: false,
			phase: SubmitPhase::Idle,
			disable_submit: false,
			validation_hold: Arc::new(AtomicBool::new(false)),
			first_error_field: None,
			generation: 0,
			fingerprints: HashMap::new(),
			inline_submit: Debouncer::default(),
			on_submit: vec![],
			on_cancel: vec![],
			on_errors_change: vec![],
			on_first_error: vec![],
		})
	}

	pub fn with_model(mut self, model: HashMap<String, Value>) -> Self {
		self.store.set_model(model);
		self
	}

	pub fn with_registry(mut self, registry: WidgetRegistry) -> Self {
		self.registry = registry;
		self
	}

	pub fn with_prefill(mut self, prefill: HashMap<String, Value>) -> Self {
		self.prefill_fields = prefill;
		self
	}

	/// Suppress the listed field ids from rendering without touching the
	/// model. Suppressed fields do not validate or contribute to submits.
	pub fn with_hidden_fields(mut self, ids: impl IntoIterator<Item = String>) -> Self {
		self.hidden_fields = ids.into_iter().collect();
		self
	}

	pub fn with_interpolate_map(mut self, map: HashMap<String, Value>) -> Self {
		self.interpolate_map = map;
		self
	}

	/// Attach a custom validator to one field.
	pub fn with_field_validator(mut self, field_id: impl Into<String>, validator: FieldValidator) -> Self {
		self.field_validators.insert(field_id.into(), validator);
		self
	}

	pub fn with_form_validator(
		mut self,
		validator: impl Fn(&HashMap<String, Value>) -> HashMap<String, String> + Send + Sync + 'static,
	) -> Self {
		self.form_validator = Some(Box::new(validator));
		self
	}

	pub fn with_presubmit_hook(
		mut self,
		hook: impl Fn() -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>
			+ Send
			+ Sync
			+ 'static,
	) -> Self {
		self.presubmit_hook = Some(Box::new(hook));
		self
	}

	/// Submit automatically after every model change.
	pub fn autosubmit(mut self) -> Self {
		self.autosubmit = true;
		self
	}

	/// Render the whole form read-only; validation and submission are inert.
	pub fn displaymode(mut self) -> Self {
		self.displaymode = true;
		self
	}

	/// Per-field inline editing: Enter and blur submit just that field,
	/// Escape reverts it.
	pub fn click_to_edit(mut self) -> Self {
		self.click_to_edit = true;
		self
	}

	/// Turn off validation engine-wide.
	pub fn without_validation(mut self) -> Self {
		self.validate = false;
		self
	}

	pub fn disable_validation(mut self) -> Self {
		self.disable_validation = true;
		self
	}

	/// Focus the first visible field when the form mounts.
	pub fn form_focus(mut self) -> Self {
		self.form_focus = true;
		self
	}

	pub fn observe_submit(&mut self, observer: impl Fn(&HashMap<String, Value>) + Send + Sync + 'static) {
		self.on_submit.push(Arc::new(observer));
	}

	pub fn observe_cancel(&mut self, observer: impl Fn() + Send + Sync + 'static) {
		self.on_cancel.push(Arc::new(observer));
	}

	pub fn observe_errors(&mut self, observer: impl Fn(&str, &[ErrorCode]) + Send + Sync + 'static) {
		self.on_errors_change.push(Arc::new(observer));
	}

	/// Observe the first failing field id after a rejected submit, the
	/// host's cue to scroll it into view and focus it.
	pub fn observe_first_error(&mut self, observer: impl Fn(&str) + Send + Sync + 'static) {
		self.on_first_error.push(Arc::new(observer));
	}

	pub fn phase(&self) -> SubmitPhase {
		self.phase
	}

	pub fn first_error_field(&self) -> Option<&str> {
		self.first_error_field.as_deref()
	}

	pub fn is_submit_disabled(&self) -> bool {
		self.disable_submit
	}

	/// Last published rule codes for a field.
	pub fn field_errors(&self, id: &str) -> &[ErrorCode] {
		self.field_errors.get(id).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Display message for a field. Rule codes win over external messages;
	/// the external channel only shows when no local rule currently fails.
	pub fn error_message(&self, id: &str) -> Option<String> {
		if let Some(codes) = self.field_errors.get(id)
			&& let Some(code) = codes.first()
			&& let Some(field) = self.schema.field(id)
		{
			return Some(display_message(field, code));
		}
		self.custom_errors.get(id).cloned()
	}

	pub fn has_errors(&self) -> bool {
		self.field_errors.values().any(|codes| !codes.is_empty()) || !self.custom_errors.is_empty()
	}

	/// Defensive copy of the authoritative model.
	pub fn model(&self) -> HashMap<String, Value> {
		self.store.model()
	}

	/// Wholesale model replacement. Re-enables submission and resyncs every
	/// widget against the new values.
	pub fn set_model(&mut self, model: HashMap<String, Value>) {
		self.store.set_model(model);
		self.disable_submit = false;
		self.set_phase(SubmitPhase::Idle);
		self.first_error_field = None;
		if self.mounted {
			self.sync_widgets();
		}
	}

	/// Replace the schema wholesale. Resets widgets, memoization, and all
	/// visibility bookkeeping; the model is kept.
	pub fn set_schema(&mut self, schema: FormSchema) -> FormResult<()> {
		schema.validate()?;
		self.deps = DependencyIndex::from_schema(&schema);
		self.schema = schema;
		self.generation += 1;
		self.mounted = false;
		self.widgets.clear();
		self.fingerprints.clear();
		self.field_errors.clear();
		self.custom_errors.clear();
		self.first_error_field = None;
		Ok(())
	}

	pub fn set_displaymode(&mut self, on: bool) {
		self.displaymode = on;
	}

	/// Inject an external error message (e.g. a server-side validation
	/// failure after submit). Blocks submission until cleared by a passing
	/// whole-form pass or by the caller.
	pub fn set_field_error(&mut self, field_id: impl Into<String>, message: impl Into<String>) {
		self.custom_errors.insert(field_id.into(), message.into());
	}

	/// Re-allow submission after the host has handled a submit result.
	pub fn enable_submit(&mut self) {
		self.disable_submit = false;
		self.set_phase(SubmitPhase::Idle);
	}

	/// Announce cancellation of the whole form. The model is untouched;
	/// discarding it is the host's decision.
	pub fn cancel(&self) {
		for observer in &self.on_cancel {
			observer();
		}
	}

	/// Empty the model and pause validation until the returned hold is
	/// dropped, so the cleared fields do not flash errors before the host
	/// installs a fresh model.
	pub fn clear_form(&mut self) -> ValidationHold {
		self.validation_hold.store(true, Ordering::Relaxed);
		self.store.clear();
		self.field_errors.clear();
		self.custom_errors.clear();
		self.disable_submit = false;
		self.set_phase(SubmitPhase::Idle);
		self.first_error_field = None;
		if self.mounted {
			self.sync_widgets();
		}
		ValidationHold {
			flag: Arc::clone(&self.validation_hold),
		}
	}

	/// Deliver one host interaction to a field and process everything it
	/// causes. The returned signals are the host's follow-up work.
	pub fn dispatch(
		&mut self,
		field_id: &str,
		input: WidgetInput,
		now: Instant,
	) -> FormResult<Vec<EngineSignal>> {
		self.ensure_mounted();
		let is_blur = input == WidgetInput::Blur;
		let Some(index) = self.widget_index(field_id) else {
			return Err(FormError::UnknownField(field_id.to_string()));
		};
		self.widgets[index].handle(input, now);
		let mut signals = self.pump(now);
		// Blur submits the edited field in click-to-edit mode; coalesced
		// with Enter through the same debouncer so blur-then-Enter emits
		// one submission.
		if is_blur && self.click_to_edit {
			self.inline_submit.push(field_id.to_string(), now);
		}
		signals.extend(self.poll_inline_submit(now));
		Ok(signals)
	}

	/// Advance time: debounce windows inside widgets and the inline submit
	/// window. Call this on the host's timer cadence.
	pub fn tick(&mut self, now: Instant) -> Vec<EngineSignal> {
		self.ensure_mounted();
		for index in 0..self.widgets.len() {
			self.widgets[index].tick(now);
		}
		let mut signals = self.pump(now);
		signals.extend(self.poll_inline_submit(now));
		signals
	}

	/// Render every schema field in order, memoized per field.
	///
	/// A field re-renders only when its fingerprint changed: display-mode
	/// flag, schema generation, visibility, resolved value, the values of
	/// its show-rule dependencies, and its error entries. Anything else is
	/// returned as `reused` with the cached markup.
	pub fn render(&mut self) -> Vec<FieldRender> {
		self.ensure_mounted();
		let model = self.store.model();
		let mut out = Vec::with_capacity(self.schema.fields.len());

		for index in 0..self.schema.fields.len() {
			let field = self.schema.fields[index].clone();
			let visible =
				!self.hidden_fields.contains(&field.id) && is_visible(&field, &model);
			let value = self
				.store
				.resolve_field_value(&field, &self.prefill_fields, &self.interpolate_map);
			let dependency_values: Vec<(String, Value)> = self
				.deps
				.references_of(&field)
				.into_iter()
				.map(|id| (id.to_string(), model.get(id).cloned().unwrap_or(Value::Null)))
				.collect();
			let fingerprint = RenderFingerprint {
				displaymode: self.displaymode,
				generation: self.generation,
				visible,
				value: value.clone(),
				dependency_values,
				field_errors: self.field_errors.get(&field.id).cloned().unwrap_or_default(),
				custom_error: self.custom_errors.get(&field.id).cloned(),
			};

			if let Some((cached, rendered)) = self.fingerprints.get(&field.id)
				&& *cached == fingerprint
			{
				let mut rendered = rendered.clone();
				rendered.reused = true;
				out.push(rendered);
				continue;
			}

			let rendered = self.render_field(&field, visible, value, index);
			self.fingerprints
				.insert(field.id.clone(), (fingerprint, rendered.clone()));
			out.push(rendered);
		}

		// Renders can queue initialization events (row padding).
		let _ = self.pump(Instant::now());
		out
	}

	/// Run the full submit lifecycle for a trigger.
	///
	/// Standard mode validates every visible field in schema order, then
	/// the whole-form validator, then awaits the pre-submit hook, and only
	/// then emits the accumulated model to the submit observers. Click-to-
	/// edit field triggers validate and emit just that field.
	pub async fn submit(&mut self, trigger: SubmitTrigger) -> SubmitOutcome {
		self.ensure_mounted();
		if self.displaymode {
			return SubmitOutcome::Blocked;
		}
		if let SubmitTrigger::Field(field_id) = &trigger
			&& self.click_to_edit
		{
			return self.submit_single_field(&field_id.clone());
		}
		self.submit_standard().await
	}

	fn submit_single_field(&mut self, field_id: &str) -> SubmitOutcome {
		let Some(index) = self.widget_index(field_id) else {
			tracing::warn!(field = field_id, "submit trigger for unknown field");
			return SubmitOutcome::Blocked;
		};
		if self.validation_active() && !self.widgets[index].validate(false) {
			let _ = self.pump(Instant::now());
			self.reject(Some(field_id.to_string()));
			return SubmitOutcome::Rejected {
				first_error_field: Some(field_id.to_string()),
			};
		}
		let _ = self.pump(Instant::now());

		let value = trim_value(self.widgets[index].model());
		let partial: HashMap<String, Value> = [(field_id.to_string(), value)].into();
		// The edit is final: the revert snapshot for this field is gone.
		self.store.commit_field(field_id);
		self.first_error_field = None;
		for observer in &self.on_submit {
			observer(&partial);
		}
		SubmitOutcome::Submitted
	}

	async fn submit_standard(&mut self) -> SubmitOutcome {
		if self.disable_submit || self.has_errors() {
			return SubmitOutcome::Blocked;
		}
		self.set_phase(SubmitPhase::Validating);

		let model = self.store.model();
		let mut candidate: HashMap<String, Value> = HashMap::new();
		let mut first_failed: Option<String> = None;

		for index in 0..self.schema.fields.len() {
			let field = self.schema.fields[index].clone();
			if self.hidden_fields.contains(&field.id) || !is_visible(&field, &model) {
				continue;
			}
			let Some(widget_index) = self.widget_index(&field.id) else {
				continue;
			};
			let value = trim_value(self.widgets[widget_index].model());
			if !value.is_null() {
				candidate.insert(field.id.clone(), value);
			}
			if self.validation_active() && !self.widgets[widget_index].validate(false) {
				first_failed.get_or_insert(field.id.clone());
			}
			let _ = self.pump(Instant::now());
		}

		if let Some(field_id) = first_failed {
			self.reject(Some(field_id.clone()));
			return SubmitOutcome::Rejected {
				first_error_field: Some(field_id),
			};
		}

		if let Some(validator) = &self.form_validator {
			let custom = validator(&candidate);
			self.custom_errors = custom;
			if !self.custom_errors.is_empty() {
				let first = self
					.schema
					.fields
					.iter()
					.map(|field| &field.id)
					.find(|id| self.custom_errors.contains_key(*id))
					.cloned();
				self.reject(first.clone());
				return SubmitOutcome::Rejected {
					first_error_field: first,
				};
			}
		}

		if !self.autosubmit {
			self.disable_submit = true;
		}
		self.set_phase(SubmitPhase::PresubmitPending);
		let pending = self.presubmit_hook.as_ref().map(|hook| hook());
		if let Some(future) = pending {
			if let Err(error) = future.await {
				tracing::debug!(%error, "presubmit hook rejected");
				self.disable_submit = false;
				self.set_phase(SubmitPhase::Idle);
				return SubmitOutcome::PresubmitFailed;
			}
		}

		self.store.commit_all();
		self.first_error_field = None;
		self.set_phase(SubmitPhase::Submitted);
		for observer in &self.on_submit {
			observer(&candidate);
		}
		SubmitOutcome::Submitted
	}

	fn reject(&mut self, first: Option<String>) {
		self.first_error_field = first;
		self.set_phase(SubmitPhase::Idle);
		if let Some(field_id) = self.first_error_field.clone() {
			for observer in &self.on_first_error {
				observer(&field_id);
			}
		}
	}

	fn set_phase(&mut self, phase: SubmitPhase) {
		if self.phase != phase {
			tracing::debug!(from = self.phase.as_str(), to = phase.as_str(), "submit phase");
			self.phase = phase;
		}
	}

	fn validation_active(&self) -> bool {
		self.validate
			&& !self.disable_validation
			&& !self.validation_hold.load(Ordering::Relaxed)
	}

	fn widget_index(&self, field_id: &str) -> Option<usize> {
		self.widgets.iter().position(|widget| widget.id() == field_id)
	}

	fn ensure_mounted(&mut self) {
		if self.mounted {
			return;
		}
		self.mounted = true;
		self.widgets.clear();
		for field in self.schema.fields.clone() {
			let validator = self.field_validators.get(&field.id).cloned();
			if let Some(widget) = widgets::build(&field, &self.registry, validator) {
				self.widgets.push(widget);
			}
		}
		self.sync_widgets();
		if self.form_focus {
			let model = self.store.model();
			for index in 0..self.schema.fields.len() {
				let field = self.schema.fields[index].clone();
				if self.hidden_fields.contains(&field.id) || !is_visible(&field, &model) {
					continue;
				}
				if let Some(widget_index) = self.widget_index(&field.id) {
					self.widgets[widget_index].focus();
					break;
				}
			}
		}
	}

	// Push resolved values into every widget and absorb whatever that
	// provokes (row padding publishes a model change).
	fn sync_widgets(&mut self) {
		for index in 0..self.schema.fields.len() {
			let field = self.schema.fields[index].clone();
			let Some(widget_index) = self.widget_index(&field.id) else {
				continue;
			};
			let value = self
				.store
				.resolve_field_value(&field, &self.prefill_fields, &self.interpolate_map);
			self.widgets[widget_index].set_model(value);
		}
		let _ = self.pump(Instant::now());
	}

	// Drain queued widget events until quiescent, applying each to the
	// shared state. Returns the signals the host must act on.
	fn pump(&mut self, now: Instant) -> Vec<EngineSignal> {
		let mut signals = vec![];
		loop {
			let mut drained = vec![];
			for index in 0..self.widgets.len() {
				drained.extend(self.widgets[index].take_events());
			}
			if drained.is_empty() {
				return signals;
			}
			for event in drained {
				match event {
					WidgetEvent::ModelChange { id, value } => {
						self.apply_model_change(&id, value);
						if self.autosubmit {
							signals.push(EngineSignal::SubmitRequested(SubmitTrigger::Form));
						}
					}
					WidgetEvent::ErrorsChange { id, errors } => {
						if errors.is_empty() {
							self.field_errors.remove(&id);
						} else {
							self.field_errors.insert(id.clone(), errors.clone());
						}
						for observer in &self.on_errors_change {
							observer(&id, &errors);
						}
					}
					WidgetEvent::InputSubmit { id, .. } => {
						if self.click_to_edit {
							self.inline_submit.push(id, now);
						} else {
							signals.push(EngineSignal::SubmitRequested(SubmitTrigger::Field(id)));
						}
					}
					WidgetEvent::InputCancel { id } => {
						self.cancel_field(&id);
						signals.push(EngineSignal::EditCancelled(id));
					}
				}
			}
		}
	}

	fn apply_model_change(&mut self, id: &str, value: Value) {
		self.store.update_field(id, value);
		// A field with a recorded custom error re-runs the whole-form
		// validator immediately so the message clears as soon as the
		// mismatch is gone.
		if self.custom_errors.contains_key(id)
			&& let Some(validator) = &self.form_validator
		{
			self.custom_errors = validator(&self.store.model());
		}
	}

	fn cancel_field(&mut self, id: &str) {
		if self.inline_submit.is_pending() {
			self.inline_submit.flush();
		}
		self.store.revert_field(id);
		if let Some(field) = self.schema.field(id).cloned()
			&& let Some(index) = self.widget_index(id)
		{
			let value = self
				.store
				.resolve_field_value(&field, &self.prefill_fields, &self.interpolate_map);
			self.widgets[index].set_model(value);
		}
	}

	fn poll_inline_submit(&mut self, now: Instant) -> Vec<EngineSignal> {
		match self.inline_submit.poll(now) {
			Some(field_id) => vec![EngineSignal::SubmitRequested(SubmitTrigger::Field(field_id))],
			None => vec![],
		}
	}

	fn render_field(
		&mut self,
		field: &FieldDefinition,
		visible: bool,
		value: Value,
		index: usize,
	) -> FieldRender {
		if !visible {
			return FieldRender {
				id: field.id.clone(),
				visible: false,
				reused: false,
				html: String::new(),
				error: None,
			};
		}
		let error = self.error_message(&field.id);
		let Some(widget_index) = self.widget_index(&field.id) else {
			return FieldRender {
				id: field.id.clone(),
				visible: false,
				reused: false,
				html: String::new(),
				error,
			};
		};
		self.widgets[widget_index].set_model(value);
		let hints = RenderHints {
			displaymode: self.displaymode,
			click_to_edit: self.click_to_edit,
			index,
		};
		FieldRender {
			id: field.id.clone(),
			visible: true,
			reused: false,
			html: self.widgets[widget_index].render(&hints),
			error,
		}
	}
}

fn trim_value(value: Value) -> Value {
	match value {
		Value::String(s) => Value::String(s.trim().to_string()),
		other => other,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{ChoiceOption, FieldType, ShowRule};
	use crate::validation::FieldCheck;
	use rstest::rstest;
	use serde_json::json;
	use std::sync::Mutex;

	fn schema_of(fields: Vec<FieldDefinition>) -> FormSchema {
		let mut schema = FormSchema::new();
		for field in fields {
			schema.add_field(field);
		}
		schema
	}

	fn model_of(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.clone()))
			.collect()
	}

	#[rstest]
	fn test_duplicate_field_ids_are_refused() {
		// Arrange
		let schema = schema_of(vec![
			FieldDefinition::new("foo", FieldType::ShortText),
			FieldDefinition::new("foo", FieldType::Number),
		]);

		// Act + Assert
		assert!(matches!(
			FormEngine::new(schema),
			Err(FormError::DuplicateField(id)) if id == "foo"
		));
	}

	#[rstest]
	fn test_dispatch_to_unknown_field_errors() {
		// Arrange
		let mut engine =
			FormEngine::new(schema_of(vec![FieldDefinition::new("foo", FieldType::ShortText)]))
				.unwrap();

		// Act + Assert
		assert!(matches!(
			engine.dispatch("nope", WidgetInput::Enter, Instant::now()),
			Err(FormError::UnknownField(id)) if id == "nope"
		));
	}

	#[rstest]
	fn test_submit_blocked_while_errors_outstanding() {
		// Arrange
		let mut engine =
			FormEngine::new(schema_of(vec![FieldDefinition::new("foo", FieldType::ShortText)]))
				.unwrap();
		engine.set_field_error("foo", "taken");

		// Act
		let outcome = tokio_test::block_on(engine.submit(SubmitTrigger::Form));

		// Assert
		assert_eq!(outcome, SubmitOutcome::Blocked);
	}

	#[rstest]
	fn test_successful_submit_disables_until_enable_submit() {
		// Arrange
		let mut engine =
			FormEngine::new(schema_of(vec![FieldDefinition::new("foo", FieldType::ShortText)]))
				.unwrap()
				.with_model(model_of(&[("foo", json!("ok"))]));

		// Act
		let first = tokio_test::block_on(engine.submit(SubmitTrigger::Form));
		let second = tokio_test::block_on(engine.submit(SubmitTrigger::Form));
		engine.enable_submit();
		let third = tokio_test::block_on(engine.submit(SubmitTrigger::Form));

		// Assert
		assert_eq!(first, SubmitOutcome::Submitted);
		assert_eq!(second, SubmitOutcome::Blocked);
		assert_eq!(third, SubmitOutcome::Submitted);
	}

	#[rstest]
	fn test_phase_transitions_across_a_submit() {
		// Arrange
		let mut engine =
			FormEngine::new(schema_of(vec![FieldDefinition::new("foo", FieldType::ShortText)]))
				.unwrap();

		// Act + Assert
		assert_eq!(engine.phase(), SubmitPhase::Idle);
		let outcome = tokio_test::block_on(engine.submit(SubmitTrigger::Form));
		assert_eq!(outcome, SubmitOutcome::Submitted);
		assert_eq!(engine.phase(), SubmitPhase::Submitted);
		engine.enable_submit();
		assert_eq!(engine.phase(), SubmitPhase::Idle);
	}

	#[rstest]
	fn test_rejected_submit_reports_first_failing_field_in_schema_order() {
		// Arrange
		let mut engine = FormEngine::new(schema_of(vec![
			FieldDefinition::new("first", FieldType::ShortText).required(),
			FieldDefinition::new("second", FieldType::ShortText).required(),
		]))
		.unwrap();
		let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
		let sink = Arc::clone(&seen);
		engine.observe_first_error(move |id| sink.lock().unwrap().push(id.to_string()));

		// Act
		let outcome = tokio_test::block_on(engine.submit(SubmitTrigger::Form));

		// Assert
		assert_eq!(
			outcome,
			SubmitOutcome::Rejected {
				first_error_field: Some("first".to_string())
			}
		);
		assert_eq!(engine.first_error_field(), Some("first"));
		assert_eq!(seen.lock().unwrap().as_slice(), ["first".to_string()]);
	}

	#[rstest]
	fn test_invisible_fields_neither_validate_nor_contribute() {
		// Arrange: required field hidden behind an unmatched show rule
		let mut engine = FormEngine::new(schema_of(vec![
			FieldDefinition::new("gate", FieldType::ShortText),
			FieldDefinition::new("detail", FieldType::ShortText)
				.required()
				.with_show_rule(ShowRule::new("gate", vec!["on".to_string()])),
		]))
		.unwrap();
		let submitted: Arc<Mutex<Vec<HashMap<String, Value>>>> = Arc::new(Mutex::new(vec![]));
		let sink = Arc::clone(&submitted);
		engine.observe_submit(move |model| sink.lock().unwrap().push(model.clone()));

		// Act
		let outcome = tokio_test::block_on(engine.submit(SubmitTrigger::Form));

		// Assert: the hidden required field does not block or contribute
		assert_eq!(outcome, SubmitOutcome::Submitted);
		let emitted = submitted.lock().unwrap();
		assert!(!emitted[0].contains_key("detail"));
	}

	#[rstest]
	fn test_hidden_fields_map_suppresses_rendering_but_not_model() {
		// Arrange
		let mut engine = FormEngine::new(schema_of(vec![
			FieldDefinition::new("foo", FieldType::ShortText),
			FieldDefinition::new("secret", FieldType::ShortText),
		]))
		.unwrap()
		.with_model(model_of(&[("secret", json!("keep"))]))
		.with_hidden_fields(["secret".to_string()]);

		// Act
		let rendered = engine.render();

		// Assert
		let secret = rendered.iter().find(|r| r.id == "secret").unwrap();
		assert!(!secret.visible);
		assert_eq!(engine.model().get("secret"), Some(&json!("keep")));
	}

	#[rstest]
	fn test_render_memoizes_unchanged_fields() {
		// Arrange
		let mut engine = FormEngine::new(schema_of(vec![
			FieldDefinition::new("foo", FieldType::ShortText),
			FieldDefinition::new("bar", FieldType::ShortText),
		]))
		.unwrap()
		.with_model(model_of(&[("foo", json!("a")), ("bar", json!("b"))]));

		// Act
		let first = engine.render();
		let second = engine.render();
		engine
			.dispatch(
				"foo",
				WidgetInput::Input {
					text: "changed".to_string(),
				},
				Instant::now(),
			)
			.unwrap();
		engine.tick(Instant::now() + crate::debounce::DEFAULT_DEBOUNCE_WINDOW);
		let third = engine.render();

		// Assert: pass two reuses everything, pass three re-renders foo only
		assert!(first.iter().all(|r| !r.reused));
		assert!(second.iter().all(|r| r.reused));
		assert!(!third.iter().find(|r| r.id == "foo").unwrap().reused);
		assert!(third.iter().find(|r| r.id == "bar").unwrap().reused);
	}

	#[rstest]
	fn test_dependent_field_rerenders_when_referenced_value_changes() {
		// Arrange: bcde's options could derive from abcd, so a change to
		// abcd must invalidate bcde's cached render even while visible
		let mut engine = FormEngine::new(schema_of(vec![
			FieldDefinition::new("abcd", FieldType::ShortText),
			FieldDefinition::new("bcde", FieldType::ShortText)
				.with_show_rule(ShowRule::any("abcd")),
		]))
		.unwrap()
		.with_model(model_of(&[("abcd", json!("x")), ("bcde", json!("kept"))]));
		engine.render();

		// Act
		engine.set_model(model_of(&[("abcd", json!("y")), ("bcde", json!("kept"))]));
		let rendered = engine.render();

		// Assert
		assert!(!rendered.iter().find(|r| r.id == "bcde").unwrap().reused);
	}

	#[rstest]
	fn test_clear_form_holds_validation_until_released() {
		// Arrange
		let mut engine = FormEngine::new(schema_of(vec![
			FieldDefinition::new("foo", FieldType::ShortText).required(),
		]))
		.unwrap()
		.with_model(model_of(&[("foo", json!("ok"))]));

		// Act: clear, then submit while the hold is alive
		let hold = engine.clear_form();
		let held = tokio_test::block_on(engine.submit(SubmitTrigger::Form));
		engine.enable_submit();
		hold.release();
		let released = tokio_test::block_on(engine.submit(SubmitTrigger::Form));

		// Assert: the empty required field passes under the hold, fails after
		assert_eq!(held, SubmitOutcome::Submitted);
		assert_eq!(
			released,
			SubmitOutcome::Rejected {
				first_error_field: Some("foo".to_string())
			}
		);
	}

	#[rstest]
	fn test_displaymode_makes_submission_inert() {
		// Arrange
		let mut engine =
			FormEngine::new(schema_of(vec![FieldDefinition::new("foo", FieldType::ShortText)]))
				.unwrap()
				.displaymode();

		// Act + Assert
		assert_eq!(
			tokio_test::block_on(engine.submit(SubmitTrigger::Form)),
			SubmitOutcome::Blocked
		);
	}

	#[rstest]
	fn test_external_error_shows_only_when_no_rule_fails() {
		// Arrange
		let mut engine = FormEngine::new(schema_of(vec![
			FieldDefinition::new("email", FieldType::ShortText)
				.required()
				.with_label("Email"),
		]))
		.unwrap();
		engine.set_field_error("email", "already registered");

		// Act + Assert: external message first, rule message once one fails
		assert_eq!(
			engine.error_message("email"),
			Some("already registered".to_string())
		);
		engine
			.dispatch("email", WidgetInput::Blur, Instant::now())
			.unwrap();
		assert_eq!(
			engine.error_message("email"),
			Some("Email cannot be blank".to_string())
		);
	}

	#[rstest]
	fn test_autosubmit_requests_submit_on_model_change() {
		// Arrange
		let mut engine = FormEngine::new(schema_of(vec![
			FieldDefinition::new("choice", FieldType::Dropdown).with_options(vec![
				ChoiceOption::new("a", "A"),
				ChoiceOption::new("b", "B"),
			]),
		]))
		.unwrap()
		.autosubmit();

		// Act
		let signals = engine
			.dispatch(
				"choice",
				WidgetInput::Choose {
					option_id: "a".to_string(),
				},
				Instant::now(),
			)
			.unwrap();

		// Assert
		assert!(signals.contains(&EngineSignal::SubmitRequested(SubmitTrigger::Form)));
	}

	#[rstest]
	fn test_unregistered_custom_field_is_skipped() {
		// Arrange
		let mut engine = FormEngine::new(schema_of(vec![
			FieldDefinition::new("foo", FieldType::ShortText),
			FieldDefinition::new("gauge", FieldType::Custom("gauge".to_string())),
		]))
		.unwrap();

		// Act
		let rendered = engine.render();

		// Assert: no widget, not rendered, and submits still work
		assert!(!rendered.iter().find(|r| r.id == "gauge").unwrap().visible);
		assert_eq!(
			tokio_test::block_on(engine.submit(SubmitTrigger::Form)),
			SubmitOutcome::Submitted
		);
	}

	#[rstest]
	fn test_form_focus_lands_on_first_visible_field() {
		// Arrange: the first field is ruled out, so focus falls through
		let mut engine = FormEngine::new(schema_of(vec![
			FieldDefinition::new("coupon", FieldType::ShortText)
				.with_show_rule(ShowRule::new("plan", vec!["paid".to_string()])),
			FieldDefinition::new("name", FieldType::ShortText),
			FieldDefinition::new("email", FieldType::ShortText),
		]))
		.unwrap()
		.form_focus();

		// Act
		let rendered = engine.render();

		// Assert
		assert!(!rendered[0].visible);
		assert!(rendered[1].html.contains(" autofocus"));
		assert!(!rendered[2].html.contains(" autofocus"));
	}

	#[rstest]
	fn test_field_validator_codes_surface_on_submit() {
		// Arrange
		let mut engine = FormEngine::new(schema_of(vec![FieldDefinition::new(
			"sku",
			FieldType::ShortText,
		)]))
		.unwrap()
		.with_model(model_of(&[("sku", json!("legacy-1"))]))
		.with_field_validator(
			"sku",
			Arc::new(|text: &str| {
				if text.starts_with("sku-") {
					FieldCheck::pass()
				} else {
					FieldCheck::fail(ErrorCode::Custom("unknown prefix".to_string()))
				}
			}),
		);

		// Act
		let outcome = tokio_test::block_on(engine.submit(SubmitTrigger::Form));

		// Assert
		assert_eq!(
			outcome,
			SubmitOutcome::Rejected {
				first_error_field: Some("sku".to_string())
			}
		);
		assert_eq!(
			engine.field_errors("sku"),
			[ErrorCode::Custom("unknown prefix".to_string())]
		);
		assert_eq!(
			engine.error_message("sku"),
			Some("unknown prefix".to_string())
		);
	}
}
