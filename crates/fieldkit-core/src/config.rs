#![forbid(unsafe_code)]

//! Binding configuration resolved from the environment.

use std::time::Duration;

/// Debounce interval used when a field's rules do not set one.
pub const DEFAULT_VALIDATION_DEBOUNCE: Duration = Duration::from_millis(500);

/// Environment variable overriding [`DEFAULT_VALIDATION_DEBOUNCE`], in milliseconds.
pub const ENV_VALIDATION_DEBOUNCE_MS: &str = "FIELDKIT_VALIDATION_DEBOUNCE_MS";

/// Validation trace events kept per binding before the oldest are dropped.
pub const DEFAULT_TRACE_CAPACITY: usize = 256;

/// Environment variable overriding [`DEFAULT_TRACE_CAPACITY`].
pub const ENV_VALIDATION_TRACE_CAPACITY: &str = "FIELDKIT_VALIDATION_TRACE_CAPACITY";

/// Process-wide defaults applied to every binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingConfig {
    /// Debounce interval for fields without an explicit `debounce_timer`.
    pub default_debounce: Duration,
    /// Maximum validation trace events retained per binding; 0 disables the trace.
    pub trace_capacity: usize,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            default_debounce: DEFAULT_VALIDATION_DEBOUNCE,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
        }
    }
}

impl BindingConfig {
    /// Resolve configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Resolve configuration using a custom environment lookup (for tests).
    ///
    /// Unparseable values are ignored and the default applies.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = get_env(ENV_VALIDATION_DEBOUNCE_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.default_debounce = Duration::from_millis(ms),
                Err(_) => {
                    crate::warn!(
                        var = ENV_VALIDATION_DEBOUNCE_MS,
                        value = %raw,
                        "ignoring invalid debounce override"
                    );
                }
            }
        }
        if let Some(raw) = get_env(ENV_VALIDATION_TRACE_CAPACITY) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) => config.trace_capacity = capacity,
                Err(_) => {
                    crate::warn!(
                        var = ENV_VALIDATION_TRACE_CAPACITY,
                        value = %raw,
                        "ignoring invalid trace capacity override"
                    );
                }
            }
        }
        config
    }

    /// Override the default debounce interval.
    #[must_use]
    pub fn with_default_debounce(mut self, delay: Duration) -> Self {
        self.default_debounce = delay;
        self
    }

    /// Override the number of trace events kept per binding.
    #[must_use]
    pub fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity;
        self
    }

    /// Pick the debounce interval for a field: its own value if set, else the default.
    #[must_use]
    pub fn debounce_for(&self, field_timer: Option<Duration>) -> Duration {
        field_timer.unwrap_or(self.default_debounce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn default_when_env_missing() {
        let config = BindingConfig::from_env_with(env_of(&[]));
        assert_eq!(config.default_debounce, DEFAULT_VALIDATION_DEBOUNCE);
    }

    #[test]
    fn env_override_applies() {
        let config =
            BindingConfig::from_env_with(env_of(&[(ENV_VALIDATION_DEBOUNCE_MS, " 120 ")]));
        assert_eq!(config.default_debounce, Duration::from_millis(120));
    }

    #[test]
    fn invalid_env_value_is_ignored() {
        let config =
            BindingConfig::from_env_with(env_of(&[(ENV_VALIDATION_DEBOUNCE_MS, "soon")]));
        assert_eq!(config, BindingConfig::default());
    }

    #[test]
    fn trace_capacity_override() {
        let config =
            BindingConfig::from_env_with(env_of(&[(ENV_VALIDATION_TRACE_CAPACITY, "32")]));
        assert_eq!(config.trace_capacity, 32);
        assert_eq!(config.default_debounce, DEFAULT_VALIDATION_DEBOUNCE);

        let invalid =
            BindingConfig::from_env_with(env_of(&[(ENV_VALIDATION_TRACE_CAPACITY, "-1")]));
        assert_eq!(invalid.trace_capacity, DEFAULT_TRACE_CAPACITY);
    }

    #[test]
    fn field_timer_wins_over_default() {
        let config = BindingConfig::default().with_default_debounce(Duration::from_millis(50));
        assert_eq!(
            config.debounce_for(Some(Duration::from_millis(300))),
            Duration::from_millis(300)
        );
        assert_eq!(config.debounce_for(None), Duration::from_millis(50));
    }
}
