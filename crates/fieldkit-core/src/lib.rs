#![forbid(unsafe_code)]

//! Core: debounce scheduling, binding configuration, and the logging facade.
//!
//! Everything here runs on a single-threaded tokio `LocalSet`; nothing is `Send`.

pub mod config;
pub mod debounce;
pub mod logging;

pub use config::{
    BindingConfig, DEFAULT_TRACE_CAPACITY, DEFAULT_VALIDATION_DEBOUNCE,
    ENV_VALIDATION_DEBOUNCE_MS, ENV_VALIDATION_TRACE_CAPACITY,
};
pub use debounce::{DebounceStats, Debouncer};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, trace, warn};
