#![forbid(unsafe_code)]

//! Static per-field configuration: the descriptor and mount options.

use std::fmt;
use std::rc::Rc;

use crate::controller::FormController;
use crate::presentation::input_id_by_name;
use crate::validation::ValidationRules;

/// Called with `(new_value, previous_value)` before a value is committed.
pub type ChangeFn<V> = Rc<dyn Fn(&V, Option<&V>)>;
/// Called with the current value on focus changes.
pub type FocusFn<V> = Rc<dyn Fn(Option<&V>)>;
/// Transform applied to a controller-sourced initial value.
pub type ValueModifierFn<V> = Rc<dyn Fn(V) -> V>;

/// Describes one field: identity, presentation flags, rules, and callbacks.
pub struct FieldDescriptor<V> {
    name: String,
    label: String,
    id: Option<String>,
    read_only: bool,
    disabled: bool,
    ignore_error_margin: bool,
    validation_rules: Option<ValidationRules>,
    default_value: Option<V>,
    controller: Option<Rc<dyn FormController<V>>>,
    on_change: Option<ChangeFn<V>>,
    on_focus_in: Option<FocusFn<V>>,
    on_focus_out: Option<FocusFn<V>>,
}

impl<V: Clone> Clone for FieldDescriptor<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            label: self.label.clone(),
            id: self.id.clone(),
            read_only: self.read_only,
            disabled: self.disabled,
            ignore_error_margin: self.ignore_error_margin,
            validation_rules: self.validation_rules.clone(),
            default_value: self.default_value.clone(),
            controller: self.controller.clone(),
            on_change: self.on_change.clone(),
            on_focus_in: self.on_focus_in.clone(),
            on_focus_out: self.on_focus_out.clone(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for FieldDescriptor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("id", &self.id)
            .field("read_only", &self.read_only)
            .field("disabled", &self.disabled)
            .field("ignore_error_margin", &self.ignore_error_margin)
            .field("validation_rules", &self.validation_rules)
            .field("default_value", &self.default_value)
            .field("controller", &self.controller.is_some())
            .finish_non_exhaustive()
    }
}

impl<V> FieldDescriptor<V> {
    /// Start a descriptor for the field `name`. Everything else is optional.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            id: None,
            read_only: false,
            disabled: false,
            ignore_error_margin: false,
            validation_rules: None,
            default_value: None,
            controller: None,
            on_change: None,
            on_focus_in: None,
            on_focus_out: None,
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Explicit identifier; otherwise derived from the name.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn ignore_error_margin(mut self, ignore: bool) -> Self {
        self.ignore_error_margin = ignore;
        self
    }

    #[must_use]
    pub fn validation_rules(mut self, rules: ValidationRules) -> Self {
        self.validation_rules = Some(rules);
        self
    }

    /// Passed through to the validation service.
    #[must_use]
    pub fn default_value(mut self, value: V) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Attach a controller. [`FormStore`](crate::FormStore) clones share storage,
    /// so passing a clone keeps the caller's handle live.
    #[must_use]
    pub fn controller<C>(mut self, controller: C) -> Self
    where
        C: FormController<V> + 'static,
    {
        self.controller = Some(Rc::new(controller));
        self
    }

    /// Attach an already shared controller.
    #[must_use]
    pub fn shared_controller(mut self, controller: Rc<dyn FormController<V>>) -> Self {
        self.controller = Some(controller);
        self
    }

    #[must_use]
    pub fn on_change(mut self, callback: impl Fn(&V, Option<&V>) + 'static) -> Self {
        self.on_change = Some(Rc::new(callback));
        self
    }

    #[must_use]
    pub fn on_focus_in(mut self, callback: impl Fn(Option<&V>) + 'static) -> Self {
        self.on_focus_in = Some(Rc::new(callback));
        self
    }

    #[must_use]
    pub fn on_focus_out(mut self, callback: impl Fn(Option<&V>) + 'static) -> Self {
        self.on_focus_out = Some(Rc::new(callback));
        self
    }

    // -- accessors --

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn label_text(&self) -> &str {
        &self.label
    }

    /// The explicit id, or one derived from the name.
    #[must_use]
    pub fn resolved_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| input_id_by_name(&self.name))
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub fn ignores_error_margin(&self) -> bool {
        self.ignore_error_margin
    }

    #[must_use]
    pub fn rules(&self) -> Option<&ValidationRules> {
        self.validation_rules.as_ref()
    }

    /// Whether the rule set marks the field required. No rules means not required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.validation_rules.as_ref().is_some_and(|r| r.required)
    }

    #[must_use]
    pub fn default_value_ref(&self) -> Option<&V> {
        self.default_value.as_ref()
    }

    pub(crate) fn controller_ref(&self) -> Option<&Rc<dyn FormController<V>>> {
        self.controller.as_ref()
    }

    pub(crate) fn change_callback(&self) -> Option<ChangeFn<V>> {
        self.on_change.clone()
    }

    pub(crate) fn focus_in_callback(&self) -> Option<FocusFn<V>> {
        self.on_focus_in.clone()
    }

    pub(crate) fn focus_out_callback(&self) -> Option<FocusFn<V>> {
        self.on_focus_out.clone()
    }
}

/// Options read once at mount.
pub struct BindingOptions<V> {
    /// Highest-priority initial value.
    pub start_value: Option<V>,
    /// Applied only to a value obtained from the controller.
    pub controller_value_modifier: Option<ValueModifierFn<V>>,
    /// Arm one debounce window for the initial value right after mount.
    pub validate_on_mount: bool,
}

impl<V> Default for BindingOptions<V> {
    fn default() -> Self {
        Self {
            start_value: None,
            controller_value_modifier: None,
            validate_on_mount: false,
        }
    }
}

impl<V> fmt::Debug for BindingOptions<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingOptions")
            .field("start_value", &self.start_value.is_some())
            .field(
                "controller_value_modifier",
                &self.controller_value_modifier.is_some(),
            )
            .field("validate_on_mount", &self.validate_on_mount)
            .finish()
    }
}

impl<V> BindingOptions<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn start_value(mut self, value: V) -> Self {
        self.start_value = Some(value);
        self
    }

    #[must_use]
    pub fn controller_value_modifier(mut self, modifier: impl Fn(V) -> V + 'static) -> Self {
        self.controller_value_modifier = Some(Rc::new(modifier));
        self
    }

    #[must_use]
    pub fn validate_on_mount(mut self, enabled: bool) -> Self {
        self.validate_on_mount = enabled;
        self
    }
}
