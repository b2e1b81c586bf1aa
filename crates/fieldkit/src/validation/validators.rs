#![forbid(unsafe_code)]

//! Rule validators backing the built-in rule-set service.

use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Error Codes
// ---------------------------------------------------------------------------

/// Error code for required field validation.
pub const ERROR_CODE_REQUIRED: &str = "required";
/// Error code for minimum length validation.
pub const ERROR_CODE_MIN_LENGTH: &str = "too_short";
/// Error code for maximum length validation.
pub const ERROR_CODE_MAX_LENGTH: &str = "too_long";
/// Error code for email validation.
pub const ERROR_CODE_EMAIL: &str = "email";

// ---------------------------------------------------------------------------
// RuleViolation
// ---------------------------------------------------------------------------

/// A failed rule with a stable code and an interpolated message.
///
/// Messages use `{key}` placeholders filled from `params` by
/// [`format_message`](Self::format_message).
///
/// ```rust
/// use fieldkit::validation::RuleViolation;
///
/// let violation = RuleViolation::new("too_short", "{label} needs {min} characters")
///     .with_param("label", "Password")
///     .with_param("min", 8);
///
/// assert_eq!(violation.format_message(), "Password needs 8 characters");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    /// Stable error code for programmatic handling.
    pub code: &'static str,
    /// Message template.
    pub message: String,
    /// Interpolation parameters.
    pub params: BTreeMap<String, String>,
}

impl RuleViolation {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add an interpolation parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Render the template with every `{key}` replaced by its parameter.
    ///
    /// Substitution is a single pass over the template, so placeholders that
    /// appear inside parameter values are left as they are. Unknown keys and
    /// unmatched braces are copied through.
    #[must_use]
    pub fn format_message(&self) -> String {
        let mut result = String::with_capacity(self.message.len());
        let mut rest = self.message.as_str();
        while let Some(open) = rest.find('{') {
            result.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                rest = &rest[open..];
                break;
            };
            let key = &after[..close];
            match self.params.get(key) {
                Some(value) => result.push_str(value),
                None => result.push_str(&rest[open..open + close + 2]),
            }
            rest = &after[close + 1..];
        }
        result.push_str(rest);
        result
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_message())
    }
}

impl std::error::Error for RuleViolation {}

// ---------------------------------------------------------------------------
// RuleOutcome
// ---------------------------------------------------------------------------

/// The result of checking one value against one or more rules.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuleOutcome {
    #[default]
    Valid,
    Invalid(RuleViolation),
}

impl RuleOutcome {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    #[must_use]
    pub fn violation(&self) -> Option<&RuleViolation> {
        match self {
            Self::Valid => None,
            Self::Invalid(v) => Some(v),
        }
    }

    /// The rendered message, or `None` when valid.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.violation().map(RuleViolation::format_message)
    }
}

// ---------------------------------------------------------------------------
// Rule Trait
// ---------------------------------------------------------------------------

/// A synchronous rule over a value of type `T`.
///
/// `label` is the field's display text; rules use it in their messages.
pub trait Rule<T: ?Sized> {
    fn check(&self, value: &T, label: &str) -> RuleOutcome;
}

// ---------------------------------------------------------------------------
// Built-in Rules
// ---------------------------------------------------------------------------

/// Rejects empty or whitespace-only text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl Rule<str> for Required {
    fn check(&self, value: &str, label: &str) -> RuleOutcome {
        if value.trim().is_empty() {
            RuleOutcome::Invalid(
                RuleViolation::new(ERROR_CODE_REQUIRED, "{label} is required")
                    .with_param("label", display_label(label)),
            )
        } else {
            RuleOutcome::Valid
        }
    }
}

/// Requires at least `min` characters. Empty text passes; pair with [`Required`].
#[derive(Debug, Clone, Copy)]
pub struct MinLength {
    pub min: usize,
}

impl MinLength {
    #[must_use]
    pub fn new(min: usize) -> Self {
        Self { min }
    }
}

impl Rule<str> for MinLength {
    fn check(&self, value: &str, label: &str) -> RuleOutcome {
        let len = value.chars().count();
        if len > 0 && len < self.min {
            RuleOutcome::Invalid(
                RuleViolation::new(
                    ERROR_CODE_MIN_LENGTH,
                    "{label} must be at least {min} characters",
                )
                .with_param("label", display_label(label))
                .with_param("min", self.min)
                .with_param("actual", len),
            )
        } else {
            RuleOutcome::Valid
        }
    }
}

/// Allows at most `max` characters.
#[derive(Debug, Clone, Copy)]
pub struct MaxLength {
    pub max: usize,
}

impl MaxLength {
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl Rule<str> for MaxLength {
    fn check(&self, value: &str, label: &str) -> RuleOutcome {
        let len = value.chars().count();
        if len > self.max {
            RuleOutcome::Invalid(
                RuleViolation::new(
                    ERROR_CODE_MAX_LENGTH,
                    "{label} must be at most {max} characters",
                )
                .with_param("label", display_label(label))
                .with_param("max", self.max)
                .with_param("actual", len),
            )
        } else {
            RuleOutcome::Valid
        }
    }
}

/// Heuristic email check: `local@domain.tld` with a TLD of two or more characters.
///
/// Empty text passes; pair with [`Required`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

impl Email {
    fn is_plausible(value: &str) -> bool {
        let Some((local, domain)) = value.split_once('@') else {
            return false;
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return false;
        }
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
            return false;
        }
        labels.last().is_some_and(|tld| tld.chars().count() >= 2)
    }
}

impl Rule<str> for Email {
    fn check(&self, value: &str, label: &str) -> RuleOutcome {
        let trimmed = value.trim();
        if trimmed.is_empty() || Self::is_plausible(trimmed) {
            RuleOutcome::Valid
        } else {
            RuleOutcome::Invalid(
                RuleViolation::new(ERROR_CODE_EMAIL, "{label} must be a valid email address")
                    .with_param("label", display_label(label)),
            )
        }
    }
}

/// Runs rules in order and stops at the first violation.
pub struct All<T: ?Sized> {
    rules: Vec<Box<dyn Rule<T>>>,
}

impl<T: ?Sized> All<T> {
    #[must_use]
    pub fn new(rules: Vec<Box<dyn Rule<T>>>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T: ?Sized> fmt::Debug for All<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("All").field("rules", &self.rules.len()).finish()
    }
}

impl<T: ?Sized> Rule<T> for All<T> {
    fn check(&self, value: &T, label: &str) -> RuleOutcome {
        for rule in &self.rules {
            let outcome = rule.check(value, label);
            if outcome.is_invalid() {
                return outcome;
            }
        }
        RuleOutcome::Valid
    }
}

/// Fields without a label are referred to generically in messages.
fn display_label(label: &str) -> &str {
    if label.is_empty() {
        "This field"
    } else {
        label
    }
}
