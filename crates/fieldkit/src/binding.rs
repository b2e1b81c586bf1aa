#![forbid(unsafe_code)]

//! The field binding: one field's value and error, kept in sync with a
//! controller and validated after the value settles.
//!
//! # Lifecycle
//!
//! 1. [`FieldBinding::mount`] resolves the initial value (start value, else the
//!    controller's value through the optional modifier, else undefined) and
//!    registers with the controller exactly once.
//! 2. Every [`set_value`](FieldBinding::set_value) notifies `on_change`,
//!    propagates to the controller, commits, and re-arms the debounce window.
//! 3. When the window elapses the validation service runs against the value
//!    current at that moment; its message becomes the error text.
//! 4. [`unmount`](FieldBinding::unmount), or dropping the last handle, aborts
//!    the pending window. Runs already in flight finish but no longer touch the
//!    field once every handle is gone.
//!
//! # Invariants
//!
//! - `value()` reflects the last `set_value` immediately.
//! - Only an elapsed, uncancelled window starts a validation run.
//! - A run's result is dropped when a later-started run was already applied.
//! - `styled().has_error == !error().is_empty()` at every point.
//!
//! # Failure Modes
//!
//! | Condition                     | Behavior                                       |
//! |-------------------------------|------------------------------------------------|
//! | Service returns `Err`         | Error text unchanged, `last_service_error` set |
//! | Service never completes       | Error text stays stale                         |
//! | Callback or controller panics | Propagates to the caller                       |
//!
//! Bindings are `!Send` and spawn onto the current `tokio::task::LocalSet`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use fieldkit_core::{BindingConfig, DebounceStats, Debouncer};

use crate::descriptor::{BindingOptions, FieldDescriptor};
use crate::presentation::{LabelDescriptor, StyledProjection, label_descriptor};
use crate::validation::{
    ValidationRules, ValidationSequencer, ValidationService, ValidationServiceError,
    ValidationToken, ValidationTrace,
};

/// Mutable per-field state.
#[derive(Debug, Clone)]
struct FieldState<V> {
    value: Option<V>,
    /// Empty means valid.
    error: String,
    last_service_error: Option<ValidationServiceError>,
}

struct BindingInner<V> {
    descriptor: FieldDescriptor<V>,
    id: String,
    service: Rc<dyn ValidationService<V>>,
    state: RefCell<FieldState<V>>,
    debouncer: RefCell<Debouncer<Option<V>>>,
    sequencer: RefCell<ValidationSequencer>,
    mounted: Cell<bool>,
}

/// Inputs of one validation run, captured when it starts.
struct ValidationRun<V> {
    token: ValidationToken,
    value: Option<V>,
    label: String,
    rules: ValidationRules,
    default_value: Option<V>,
    service: Rc<dyn ValidationService<V>>,
}

impl<V> ValidationRun<V> {
    async fn call(&self) -> Result<Option<String>, ValidationServiceError> {
        self.service
            .validate(
                self.value.as_ref(),
                &self.label,
                &self.rules,
                self.default_value.as_ref(),
            )
            .await
    }
}

impl<V: Clone> BindingInner<V> {
    fn begin_run(&self) -> ValidationRun<V> {
        let token = self.sequencer.borrow_mut().start();
        let value = self.state.borrow().value.clone();
        fieldkit_core::debug!(
            field = self.descriptor.name(),
            token = token.raw(),
            "validation started"
        );
        ValidationRun {
            token,
            value,
            label: self.descriptor.label_text().to_string(),
            rules: self.descriptor.rules().cloned().unwrap_or_default(),
            default_value: self.descriptor.default_value_ref().cloned(),
            service: Rc::clone(&self.service),
        }
    }

    fn finish_run(
        &self,
        token: ValidationToken,
        outcome: &Result<Option<String>, ValidationServiceError>,
    ) {
        match outcome {
            Ok(message) => {
                let applied = self
                    .sequencer
                    .borrow_mut()
                    .try_apply(token, message.is_none());
                if applied {
                    let mut state = self.state.borrow_mut();
                    state.error = message.clone().unwrap_or_default();
                    state.last_service_error = None;
                    fieldkit_core::debug!(
                        field = self.descriptor.name(),
                        token = token.raw(),
                        valid = message.is_none(),
                        "validation applied"
                    );
                } else {
                    fieldkit_core::debug!(
                        field = self.descriptor.name(),
                        token = token.raw(),
                        "stale validation result discarded"
                    );
                }
            }
            Err(err) => {
                self.sequencer.borrow_mut().record_failure(token);
                self.state.borrow_mut().last_service_error = Some(err.clone());
                fieldkit_core::warn!(
                    field = self.descriptor.name(),
                    token = token.raw(),
                    error = %err,
                    "validation service failed"
                );
            }
        }
    }
}

/// Debounced run: the binding is only held while capturing inputs and applying.
async fn run_scheduled<V: Clone>(weak: Weak<BindingInner<V>>) {
    let Some(run) = weak.upgrade().map(|inner| inner.begin_run()) else {
        return;
    };
    let outcome = run.call().await;
    if let Some(inner) = weak.upgrade() {
        inner.finish_run(run.token, &outcome);
    }
}

/// Handle to a mounted field. Clones share the same field.
pub struct FieldBinding<V> {
    inner: Rc<BindingInner<V>>,
}

impl<V> Clone for FieldBinding<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for FieldBinding<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("FieldBinding")
            .field("name", &self.inner.descriptor.name())
            .field("id", &self.inner.id)
            .field("value", &state.value)
            .field("error", &state.error)
            .field("mounted", &self.inner.mounted.get())
            .finish()
    }
}

impl<V: Clone + PartialEq + 'static> FieldBinding<V> {
    /// Mount a field using configuration from the environment.
    ///
    /// # Panics
    ///
    /// With `validate_on_mount`, panics inside a tokio runtime but outside a
    /// `tokio::task::LocalSet`. Without a runtime nothing is armed.
    pub fn mount(
        descriptor: FieldDescriptor<V>,
        options: BindingOptions<V>,
        service: Rc<dyn ValidationService<V>>,
    ) -> Self {
        Self::mount_with_config(descriptor, options, service, BindingConfig::from_env())
    }

    /// Mount a field with explicit configuration.
    ///
    /// # Panics
    ///
    /// With `validate_on_mount`, panics inside a tokio runtime but outside a
    /// `tokio::task::LocalSet`. Without a runtime nothing is armed.
    pub fn mount_with_config(
        descriptor: FieldDescriptor<V>,
        options: BindingOptions<V>,
        service: Rc<dyn ValidationService<V>>,
        config: BindingConfig,
    ) -> Self {
        let BindingOptions {
            start_value,
            controller_value_modifier,
            validate_on_mount,
        } = options;

        let registered = descriptor
            .controller_ref()
            .and_then(|controller| controller.add_field(descriptor.name()).value)
            .map(|value| match &controller_value_modifier {
                Some(modifier) => modifier(value),
                None => value,
            });
        let initial = start_value.or(registered);

        let delay = config.debounce_for(descriptor.rules().and_then(|r| r.debounce_timer));
        let id = descriptor.resolved_id();
        fieldkit_core::debug!(
            field = descriptor.name(),
            id = %id,
            delay_ms = delay.as_millis() as u64,
            has_controller = descriptor.controller_ref().is_some(),
            "field mounted"
        );

        let binding = Self {
            inner: Rc::new(BindingInner {
                id,
                service,
                state: RefCell::new(FieldState {
                    value: initial.clone(),
                    error: String::new(),
                    last_service_error: None,
                }),
                debouncer: RefCell::new(Debouncer::new(delay)),
                sequencer: RefCell::new(ValidationSequencer::with_trace_capacity(
                    config.trace_capacity,
                )),
                mounted: Cell::new(true),
                descriptor,
            }),
        };

        if validate_on_mount {
            binding.arm_validation(initial);
        } else {
            binding.inner.debouncer.borrow_mut().prime(initial);
        }
        binding
    }

    fn arm_validation(&self, deps: Option<V>) {
        if !self.inner.mounted.get() {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let armed = self
            .inner
            .debouncer
            .borrow_mut()
            .observe(deps, move || run_scheduled(weak));
        if armed {
            fieldkit_core::trace!(field = self.inner.descriptor.name(), "validation armed");
        }
    }

    /// Replace the value.
    ///
    /// Calls `on_change(new, previous)`, propagates to the controller, commits,
    /// then re-arms validation if the value differs from the last armed one.
    /// Without a tokio runtime on the thread the value is still committed and
    /// propagated, but no window is armed.
    ///
    /// # Panics
    ///
    /// Panics when a window must be armed inside a tokio runtime but outside a
    /// `tokio::task::LocalSet`.
    pub fn set_value(&self, new_value: V) {
        let previous = self.inner.state.borrow().value.clone();

        if let Some(on_change) = self.inner.descriptor.change_callback() {
            on_change(&new_value, previous.as_ref());
        }
        if let Some(controller) = self.inner.descriptor.controller_ref() {
            controller.handle_change(self.inner.descriptor.name(), new_value.clone());
        }
        self.inner.state.borrow_mut().value = Some(new_value.clone());

        self.arm_validation(Some(new_value));
    }

    /// Run the validation service now, outside the debounce schedule.
    ///
    /// The outcome is applied under the same staleness rule as debounced runs
    /// and returned to the caller.
    pub async fn validate(&self) -> Result<Option<String>, ValidationServiceError> {
        let run = self.inner.begin_run();
        let outcome = run.call().await;
        self.inner.finish_run(run.token, &outcome);
        outcome
    }
}

impl<V: Clone> FieldBinding<V> {
    /// Current value; `None` while undefined.
    #[must_use]
    pub fn value(&self) -> Option<V> {
        self.inner.state.borrow().value.clone()
    }

    /// Invoke `on_focus_in` with the current value, if set.
    pub fn focus_in(&self) {
        if let Some(callback) = self.inner.descriptor.focus_in_callback() {
            let value = self.value();
            callback(value.as_ref());
        }
    }

    /// Invoke `on_focus_out` with the current value, if set.
    pub fn focus_out(&self) {
        if let Some(callback) = self.inner.descriptor.focus_out_callback() {
            let value = self.value();
            callback(value.as_ref());
        }
    }
}

impl<V> FieldBinding<V> {
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.descriptor.name()
    }

    /// The explicit id or the one derived from the name.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn descriptor(&self) -> &FieldDescriptor<V> {
        &self.inner.descriptor
    }

    /// Current error text; empty when valid.
    #[must_use]
    pub fn error(&self) -> String {
        self.inner.state.borrow().error.clone()
    }

    /// Overwrite the error text, e.g. with a server-side rejection.
    pub fn set_error(&self, error: impl Into<String>) {
        self.inner.state.borrow_mut().error = error.into();
    }

    #[must_use]
    pub fn styled(&self) -> StyledProjection {
        let descriptor = &self.inner.descriptor;
        StyledProjection {
            has_error: !self.inner.state.borrow().error.is_empty(),
            required: descriptor.is_required(),
            read_only: descriptor.is_read_only(),
            disabled: descriptor.is_disabled(),
            ignore_error_margin: descriptor.ignores_error_margin(),
        }
    }

    /// Label to render, or `None` for an unlabeled field.
    #[must_use]
    pub fn label(&self) -> Option<LabelDescriptor> {
        let descriptor = &self.inner.descriptor;
        label_descriptor(
            descriptor.label_text(),
            descriptor.is_required(),
            &self.inner.id,
        )
    }

    /// The most recent service failure, cleared by the next applied result.
    #[must_use]
    pub fn last_service_error(&self) -> Option<ValidationServiceError> {
        self.inner.state.borrow().last_service_error.clone()
    }

    /// A window is armed or a run has not finished.
    #[must_use]
    pub fn is_validation_pending(&self) -> bool {
        self.inner.debouncer.borrow().is_pending() || self.inner.sequencer.borrow().has_in_flight()
    }

    #[must_use]
    pub fn debounce_stats(&self) -> DebounceStats {
        self.inner.debouncer.borrow().stats()
    }

    /// Copy of the recent validation events, bounded by
    /// [`BindingConfig::trace_capacity`].
    #[must_use]
    pub fn trace(&self) -> ValidationTrace {
        self.inner.sequencer.borrow().trace().clone()
    }

    /// Inspect the trace without copying it.
    pub fn with_trace<R>(&self, f: impl FnOnce(&ValidationTrace) -> R) -> R {
        f(self.inner.sequencer.borrow().trace())
    }

    pub fn clear_trace(&self) {
        self.inner.sequencer.borrow_mut().clear_trace();
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    /// Abort the pending window and stop arming new ones.
    ///
    /// Values can still be set and are still propagated to the controller.
    pub fn unmount(&self) {
        if self.inner.mounted.replace(false) {
            let cancelled = self.inner.debouncer.borrow_mut().cancel();
            fieldkit_core::debug!(
                field = self.inner.descriptor.name(),
                cancelled,
                "field unmounted"
            );
        }
    }
}
