#![forbid(unsafe_code)]

//! The validation service contract and the built-in rule-set service.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::validators::{All, Email, MaxLength, MinLength, Required, Rule};

// ---------------------------------------------------------------------------
// ValidationRules
// ---------------------------------------------------------------------------

/// Per-field rule set: the flags the binding reads plus rule-specific parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRules {
    /// The field must hold a non-blank value. Also drives the label marker.
    pub required: bool,
    /// Debounce interval; `None` uses the configured default.
    pub debounce_timer: Option<Duration>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub email: bool,
    /// Parameters for custom services, passed through untouched.
    pub params: BTreeMap<String, String>,
}

impl ValidationRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the debounce interval in milliseconds.
    #[must_use]
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_timer = Some(Duration::from_millis(ms));
        self
    }

    #[must_use]
    pub fn debounce_timer(mut self, delay: Duration) -> Self {
        self.debounce_timer = Some(delay);
        self
    }

    #[must_use]
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    #[must_use]
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    #[must_use]
    pub fn email(mut self, email: bool) -> Self {
        self.email = email;
        self
    }

    /// Attach a rule-specific parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Compose the built-in text rules enabled by this rule set.
    #[must_use]
    pub fn text_rules(&self) -> All<str> {
        let mut rules: Vec<Box<dyn Rule<str>>> = Vec::new();
        if self.required {
            rules.push(Box::new(Required));
        }
        if let Some(min) = self.min_length {
            rules.push(Box::new(MinLength::new(min)));
        }
        if let Some(max) = self.max_length {
            rules.push(Box::new(MaxLength::new(max)));
        }
        if self.email {
            rules.push(Box::new(Email));
        }
        All::new(rules)
    }
}

// ---------------------------------------------------------------------------
// ValidationServiceError
// ---------------------------------------------------------------------------

/// The service could not produce a verdict (as opposed to rejecting the value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationServiceError {
    /// The backing validator is not reachable.
    Unavailable(String),
    /// The validator ran but failed.
    Failed(String),
}

impl fmt::Display for ValidationServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "validation service unavailable: {msg}"),
            Self::Failed(msg) => write!(f, "validation service failed: {msg}"),
        }
    }
}

impl std::error::Error for ValidationServiceError {}

// ---------------------------------------------------------------------------
// ValidationService
// ---------------------------------------------------------------------------

/// Asynchronously maps (value, label, rules, default value) to an optional message.
///
/// `Ok(None)` means the value is valid and `Ok(Some(message))` that it is not.
/// `value` is `None` while the field is still undefined.
#[async_trait(?Send)]
pub trait ValidationService<V> {
    async fn validate(
        &self,
        value: Option<&V>,
        label: &str,
        rules: &ValidationRules,
        default_value: Option<&V>,
    ) -> Result<Option<String>, ValidationServiceError>;
}

// ---------------------------------------------------------------------------
// RuleSetService
// ---------------------------------------------------------------------------

/// Applies [`ValidationRules::text_rules`] to text-like values.
///
/// An undefined value falls back to the default value, then to empty text.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSetService;

#[async_trait(?Send)]
impl<V: AsRef<str> + 'static> ValidationService<V> for RuleSetService {
    async fn validate(
        &self,
        value: Option<&V>,
        label: &str,
        rules: &ValidationRules,
        default_value: Option<&V>,
    ) -> Result<Option<String>, ValidationServiceError> {
        let text = value.or(default_value).map_or("", |v| v.as_ref());
        Ok(rules.text_rules().check(text, label).message())
    }
}
