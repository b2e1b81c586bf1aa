//! Form field bindings with debounced asynchronous validation.
//!
//! A [`FieldBinding`] owns one field's value and error text. It pushes every
//! committed value to an optional shared [`FormController`] and, once the value
//! has been quiet for the field's debounce interval, asks a
//! [`ValidationService`](validation::ValidationService) for a verdict.
//! Renderers read [`FieldBinding::styled`] and [`FieldBinding::label`].
//!
//! # Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`binding`] | The binding and its lifecycle |
//! | [`controller`] | Controller trait and the in-memory [`FormStore`] |
//! | [`descriptor`] | Field descriptor and mount options |
//! | [`presentation`] | Styled projection and label descriptor |
//! | [`validation`] | Service contract, built-in rules, run sequencing |
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use fieldkit::validation::{RuleSetService, ValidationRules};
//! use fieldkit::{BindingConfig, BindingOptions, FieldBinding, FieldDescriptor, FormStore};
//!
//! let store: FormStore<String> = FormStore::new().with_default("email", "a@b.com".into());
//! let binding = FieldBinding::mount_with_config(
//!     FieldDescriptor::new("email")
//!         .label("Email")
//!         .validation_rules(ValidationRules::new().required(true).email(true))
//!         .controller(store.clone()),
//!     BindingOptions::new(),
//!     Rc::new(RuleSetService),
//!     BindingConfig::default(),
//! );
//!
//! assert_eq!(binding.value().as_deref(), Some("a@b.com"));
//! assert_eq!(binding.label().map(|l| l.text).as_deref(), Some("*Email"));
//! assert!(!binding.styled().has_error);
//! ```
//!
//! Setting a value arms a timer with `tokio::task::spawn_local`, so bindings
//! that change must live inside a `tokio::task::LocalSet`.

#![forbid(unsafe_code)]

pub mod binding;
pub mod controller;
pub mod descriptor;
pub mod presentation;
pub mod validation;

pub use binding::FieldBinding;
pub use controller::{FieldRegistration, FormController, FormStore};
pub use descriptor::{BindingOptions, FieldDescriptor};
pub use presentation::{LabelDescriptor, StyledProjection};

pub use fieldkit_core::{BindingConfig, DebounceStats};
