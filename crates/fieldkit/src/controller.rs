#![forbid(unsafe_code)]

//! The shared form controller seen by field bindings.
//!
//! A controller maps field names to values. Bindings register once when they
//! mount and then push every committed value under their own name. Nothing
//! here locks: [`FormStore`] is `!Send` and is meant to be shared through
//! clones on one thread. Sharing it across threads would need a mutex around
//! the whole store.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// What a controller knows about a field at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegistration<V> {
    /// Current value if one was recorded, else the form-level default, else `None`.
    pub value: Option<V>,
}

/// Registry of field values keyed by name.
pub trait FormController<V> {
    /// Register interest in `name` and report its current or default value.
    ///
    /// Calling it again for the same name has no effect beyond bookkeeping.
    fn add_field(&self, name: &str) -> FieldRegistration<V>;

    /// Record a new value for `name`. Must return without waiting.
    fn handle_change(&self, name: &str, value: V);
}

// ---------------------------------------------------------------------------
// FormStore
// ---------------------------------------------------------------------------

struct StoreInner<V> {
    defaults: BTreeMap<String, V>,
    values: BTreeMap<String, V>,
    registered: BTreeSet<String>,
    registrations: u64,
    changes: u64,
}

/// In-memory [`FormController`]. Clones share the same storage.
pub struct FormStore<V> {
    inner: Rc<RefCell<StoreInner<V>>>,
}

impl<V> Clone for FormStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> Default for FormStore<V> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                defaults: BTreeMap::new(),
                values: BTreeMap::new(),
                registered: BTreeSet::new(),
                registrations: 0,
                changes: 0,
            })),
        }
    }
}

impl<V> fmt::Debug for FormStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FormStore")
            .field("registered", &inner.registered)
            .field("values", &inner.values.len())
            .field("changes", &inner.changes)
            .finish()
    }
}

impl<V> FormStore<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the value a field reports before anything was changed.
    #[must_use]
    pub fn with_default(self, name: impl Into<String>, value: V) -> Self {
        self.set_default(name, value);
        self
    }

    pub fn set_default(&self, name: impl Into<String>, value: V) {
        self.inner.borrow_mut().defaults.insert(name.into(), value);
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.borrow().registered.contains(name)
    }

    /// Registered field names in sorted order.
    #[must_use]
    pub fn registered_fields(&self) -> Vec<String> {
        self.inner.borrow().registered.iter().cloned().collect()
    }

    /// Total `add_field` calls, repeats included.
    #[must_use]
    pub fn registration_count(&self) -> u64 {
        self.inner.borrow().registrations
    }

    /// Total `handle_change` calls.
    #[must_use]
    pub fn change_count(&self) -> u64 {
        self.inner.borrow().changes
    }

    /// Forget recorded values; defaults and registrations stay.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.values.clear();
        inner.changes = 0;
    }
}

impl<V: Clone> FormStore<V> {
    /// Current value of `name`, falling back to its default.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<V> {
        let inner = self.inner.borrow();
        inner
            .values
            .get(name)
            .or_else(|| inner.defaults.get(name))
            .cloned()
    }

    /// Snapshot of every known field, defaults overlaid with recorded values.
    #[must_use]
    pub fn values(&self) -> BTreeMap<String, V> {
        let inner = self.inner.borrow();
        let mut merged = inner.defaults.clone();
        for (name, value) in &inner.values {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }
}

impl<V: PartialEq> FormStore<V> {
    /// Whether a recorded value differs from the field's default.
    #[must_use]
    pub fn is_dirty(&self, name: &str) -> bool {
        let inner = self.inner.borrow();
        match inner.values.get(name) {
            Some(value) => inner.defaults.get(name) != Some(value),
            None => false,
        }
    }

    /// Names of dirty fields in sorted order.
    #[must_use]
    pub fn dirty_fields(&self) -> Vec<String> {
        let inner = self.inner.borrow();
        inner
            .values
            .iter()
            .filter(|(name, value)| inner.defaults.get(*name) != Some(*value))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl<V: Clone> FormController<V> for FormStore<V> {
    fn add_field(&self, name: &str) -> FieldRegistration<V> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.registrations += 1;
            inner.registered.insert(name.to_string());
        }
        fieldkit_core::debug!(field = name, "field registered");
        FieldRegistration {
            value: self.get(name),
        }
    }

    fn handle_change(&self, name: &str, value: V) {
        let mut inner = self.inner.borrow_mut();
        inner.values.insert(name.to_string(), value);
        inner.changes += 1;
    }
}
