#![forbid(unsafe_code)]

//! Token sequencing for overlapping validation runs.
//!
//! Validation calls are not serialized: a run started earlier can finish
//! after a run started later. Every run is tagged with a [`ValidationToken`]
//! when it starts, and a result is applied only if its token is not lower than
//! the highest token already applied. Everything else is discarded as stale.
//!
//! # Invariants
//!
//! - Tokens are strictly monotonic per sequencer; token 0 means "none".
//! - Applied tokens are strictly increasing.
//! - A `StaleDiscarded` event always carries `token < highest_applied`.
//!
//! Every transition is appended to a [`ValidationTrace`], which can be
//! checksummed for golden comparisons under a paused tokio clock. The trace is
//! a ring: once it holds `capacity` events the oldest are dropped.

use std::collections::VecDeque;
use std::collections::hash_map::DefaultHasher;
use std::collections::vec_deque;
use std::fmt;
use std::hash::{Hash, Hasher};

use fieldkit_core::DEFAULT_TRACE_CAPACITY;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// ValidationToken
// ---------------------------------------------------------------------------

/// Identifies one validation run. Later runs carry larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ValidationToken(u64);

impl ValidationToken {
    /// The null token: nothing started or applied yet.
    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ValidationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ValidationEvent
// ---------------------------------------------------------------------------

/// One step in the life of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidationEvent {
    Started {
        token: ValidationToken,
        elapsed_ns: u64,
    },
    /// The service answered; `is_valid` is whether it returned no message.
    Completed {
        token: ValidationToken,
        is_valid: bool,
        duration_ns: u64,
        elapsed_ns: u64,
    },
    /// The answer became the field's error state.
    Applied {
        token: ValidationToken,
        is_valid: bool,
        elapsed_ns: u64,
    },
    /// A newer run had already been applied.
    StaleDiscarded {
        token: ValidationToken,
        highest_applied: ValidationToken,
        elapsed_ns: u64,
    },
    /// The service returned an error instead of a verdict.
    Failed {
        token: ValidationToken,
        elapsed_ns: u64,
    },
}

impl ValidationEvent {
    #[must_use]
    pub fn token(&self) -> ValidationToken {
        match self {
            Self::Started { token, .. }
            | Self::Completed { token, .. }
            | Self::Applied { token, .. }
            | Self::StaleDiscarded { token, .. }
            | Self::Failed { token, .. } => *token,
        }
    }

    /// Event type name for logging and trace queries.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Completed { .. } => "completed",
            Self::Applied { .. } => "applied",
            Self::StaleDiscarded { .. } => "stale_discarded",
            Self::Failed { .. } => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationTrace
// ---------------------------------------------------------------------------

/// Ordered log of the most recent validation events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTrace {
    events: VecDeque<ValidationEvent>,
    capacity: usize,
    dropped: u64,
}

impl Default for ValidationTrace {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRACE_CAPACITY)
    }
}

impl ValidationTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A trace keeping at most `capacity` events. Zero records nothing.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_TRACE_CAPACITY)),
            capacity,
            dropped: 0,
        }
    }

    /// Append an event, evicting the oldest when full.
    pub fn push(&mut self, event: ValidationEvent) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    /// Oldest first.
    pub fn events(&self) -> vec_deque::Iter<'_, ValidationEvent> {
        self.events.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events evicted or never stored because of the capacity.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Forget every event; the capacity stays.
    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }

    #[must_use]
    pub fn contains_event_type(&self, token: ValidationToken, event_type: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.token() == token && e.event_type() == event_type)
    }

    #[must_use]
    pub fn events_for_token(&self, token: ValidationToken) -> Vec<&ValidationEvent> {
        self.events.iter().filter(|e| e.token() == token).collect()
    }

    /// Number of events of the given type.
    #[must_use]
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    /// Hash of every event in order.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for event in &self.events {
            event.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Check the sequencing invariants; returns one line per violation.
    #[must_use]
    pub fn verify_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut last_started = ValidationToken::NONE;
        let mut last_applied = ValidationToken::NONE;

        for event in &self.events {
            match event {
                ValidationEvent::Started { token, .. } => {
                    if *token <= last_started {
                        violations.push(format!(
                            "Non-monotonic start token: {token} after {last_started}"
                        ));
                    }
                    last_started = *token;
                }
                ValidationEvent::Applied { token, .. } => {
                    if *token <= last_applied {
                        violations.push(format!(
                            "Applied {token} after already applying {last_applied}"
                        ));
                    }
                    last_applied = *token;
                }
                ValidationEvent::StaleDiscarded {
                    token,
                    highest_applied,
                    ..
                } => {
                    if token >= highest_applied {
                        violations.push(format!(
                            "StaleDiscarded with non-stale token: {token} >= {highest_applied}"
                        ));
                    }
                }
                ValidationEvent::Completed { .. } | ValidationEvent::Failed { .. } => {}
            }
        }

        violations
    }
}

// ---------------------------------------------------------------------------
// ValidationSequencer
// ---------------------------------------------------------------------------

/// Issues tokens and decides which completed runs may update the field.
pub struct ValidationSequencer {
    next_token: u64,
    highest_applied: ValidationToken,
    in_flight: Vec<(ValidationToken, Instant)>,
    trace: ValidationTrace,
    created_at: Instant,
}

impl fmt::Debug for ValidationSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSequencer")
            .field("next_token", &self.next_token)
            .field("highest_applied", &self.highest_applied)
            .field("in_flight_count", &self.in_flight.len())
            .field("trace_events", &self.trace.len())
            .finish()
    }
}

impl Default for ValidationSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationSequencer {
    /// Create a sequencer. Timestamps are measured from this call on the tokio clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_trace_capacity(DEFAULT_TRACE_CAPACITY)
    }

    /// Create a sequencer whose trace keeps at most `capacity` events.
    #[must_use]
    pub fn with_trace_capacity(capacity: usize) -> Self {
        Self {
            next_token: 1,
            highest_applied: ValidationToken::NONE,
            in_flight: Vec::new(),
            trace: ValidationTrace::with_capacity(capacity),
            created_at: Instant::now(),
        }
    }

    fn elapsed_ns(&self) -> u64 {
        self.created_at.elapsed().as_nanos() as u64
    }

    /// Tag a new run.
    pub fn start(&mut self) -> ValidationToken {
        let token = ValidationToken(self.next_token);
        self.next_token += 1;
        self.in_flight.push((token, Instant::now()));
        self.trace.push(ValidationEvent::Started {
            token,
            elapsed_ns: self.elapsed_ns(),
        });
        token
    }

    fn finish(&mut self, token: ValidationToken) -> u64 {
        let started_at = self
            .in_flight
            .iter()
            .position(|(t, _)| *t == token)
            .map(|idx| self.in_flight.swap_remove(idx).1);
        started_at.map_or(0, |at| at.elapsed().as_nanos() as u64)
    }

    /// Record a verdict for `token`.
    ///
    /// Returns `true` when the caller should apply it, `false` when a newer
    /// run was already applied.
    pub fn try_apply(&mut self, token: ValidationToken, is_valid: bool) -> bool {
        let duration_ns = self.finish(token);
        let elapsed_ns = self.elapsed_ns();
        self.trace.push(ValidationEvent::Completed {
            token,
            is_valid,
            duration_ns,
            elapsed_ns,
        });

        if token < self.highest_applied {
            self.trace.push(ValidationEvent::StaleDiscarded {
                token,
                highest_applied: self.highest_applied,
                elapsed_ns,
            });
            return false;
        }

        self.highest_applied = token;
        self.trace.push(ValidationEvent::Applied {
            token,
            is_valid,
            elapsed_ns,
        });
        true
    }

    /// Record that the service failed for `token`. Nothing is applied.
    pub fn record_failure(&mut self, token: ValidationToken) {
        self.finish(token);
        let elapsed_ns = self.elapsed_ns();
        self.trace.push(ValidationEvent::Failed { token, elapsed_ns });
    }

    #[must_use]
    pub fn highest_applied(&self) -> ValidationToken {
        self.highest_applied
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    #[must_use]
    pub fn trace(&self) -> &ValidationTrace {
        &self.trace
    }

    /// Drop recorded events. Token state is untouched.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Verify that the trace satisfies all invariants.
    pub fn verify_trace(&self) -> Result<(), Vec<String>> {
        let violations = self.trace.verify_invariants();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
