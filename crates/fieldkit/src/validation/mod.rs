#![forbid(unsafe_code)]

//! Validation: the service contract, built-in rules, and run sequencing.
//!
//! A binding never decides validity itself. It hands
//! (value, label, rules, default value) to a [`ValidationService`] and stores
//! whatever message comes back. [`RuleSetService`] covers the common text
//! rules; anything else plugs in through the trait.
//!
//! # Example
//!
//! ```rust
//! use fieldkit::validation::{Rule, ValidationRules};
//!
//! let rules = ValidationRules::new().required(true).email(true);
//! let check = rules.text_rules();
//!
//! assert!(check.check("a@b.com", "Email").is_valid());
//! assert_eq!(
//!     check.check("", "Email").message().as_deref(),
//!     Some("Email is required")
//! );
//! ```

pub mod sequencing;
pub mod service;
mod validators;

pub use sequencing::{ValidationEvent, ValidationSequencer, ValidationToken, ValidationTrace};
pub use service::{RuleSetService, ValidationRules, ValidationService, ValidationServiceError};
pub use validators::{
    // Composition
    All,
    // Error codes
    ERROR_CODE_EMAIL,
    ERROR_CODE_MAX_LENGTH,
    ERROR_CODE_MIN_LENGTH,
    ERROR_CODE_REQUIRED,
    // Built-in rules
    Email,
    MaxLength,
    MinLength,
    Required,
    // Core types
    Rule,
    RuleOutcome,
    RuleViolation,
};
