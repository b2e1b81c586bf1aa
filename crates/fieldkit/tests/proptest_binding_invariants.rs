//! Property-based invariant tests for field bindings.
//!
//! For any sequence of value and error updates:
//!
//! 1. `value()` equals the last value set.
//! 2. `styled().has_error` equals `!error().is_empty()`.
//! 3. The controller holds the last value set.
//! 4. Once the clock settles, the last validation call saw the final value and
//!    the event trace satisfies its ordering invariants.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use fieldkit::validation::{ValidationRules, ValidationService, ValidationServiceError};
use fieldkit::{BindingConfig, BindingOptions, FieldBinding, FieldDescriptor, FormStore};
use proptest::prelude::*;
use tokio::task::LocalSet;
use tokio::time::sleep;

const DEBOUNCE_MS: u64 = 50;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Step {
    SetValue(String),
    SetError(String),
    Wait(u64),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => "[a-c]{0,3}".prop_map(Step::SetValue),
        1 => "[x-z]{0,2}".prop_map(Step::SetError),
        2 => (0u64..(DEBOUNCE_MS * 2)).prop_map(Step::Wait),
    ]
}

/// Rejects values shorter than two characters, with a latency that depends
/// on the value so runs complete out of order.
#[derive(Default)]
struct Jittery {
    calls: RefCell<Vec<Option<String>>>,
}

#[async_trait(?Send)]
impl ValidationService<String> for Jittery {
    async fn validate(
        &self,
        value: Option<&String>,
        _label: &str,
        _rules: &ValidationRules,
        _default_value: Option<&String>,
    ) -> Result<Option<String>, ValidationServiceError> {
        self.calls.borrow_mut().push(value.cloned());
        let text = value.map_or("", String::as_str);
        sleep(Duration::from_millis(text.len() as u64 * 30)).await;
        Ok((text.len() < 2).then(|| "too short".to_string()))
    }
}

struct Outcome {
    violations: Vec<String>,
    last_call: Option<Option<String>>,
    last_set: Option<String>,
}

fn run_steps(steps: &[Step]) -> Outcome {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime");
    let local = LocalSet::new();
    local.block_on(&runtime, async {
        let store: FormStore<String> = FormStore::new();
        let service = Rc::new(Jittery::default());
        let binding = FieldBinding::mount_with_config(
            FieldDescriptor::new("field").controller(store.clone()),
            BindingOptions::new(),
            Rc::clone(&service) as Rc<dyn ValidationService<String>>,
            BindingConfig::default().with_default_debounce(Duration::from_millis(DEBOUNCE_MS)),
        );

        let mut violations = Vec::new();
        let mut last_set: Option<String> = None;
        for step in steps {
            match step {
                Step::SetValue(v) => {
                    binding.set_value(v.clone());
                    last_set = Some(v.clone());
                }
                Step::SetError(e) => binding.set_error(e.clone()),
                Step::Wait(ms) => sleep(Duration::from_millis(*ms)).await,
            }
            if binding.value() != last_set {
                violations.push(format!("value {:?} != {:?}", binding.value(), last_set));
            }
            if binding.styled().has_error == binding.error().is_empty() {
                violations.push(format!("has_error out of sync with {:?}", binding.error()));
            }
            if store.get("field") != last_set {
                violations.push(format!("controller {:?} != {:?}", store.get("field"), last_set));
            }
        }

        sleep(Duration::from_secs(1)).await;
        violations.extend(binding.trace().verify_invariants());

        let last_call = service.calls.borrow().last().cloned();
        Outcome {
            violations,
            last_call,
            last_set,
        }
    })
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. State stays consistent after every step
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn state_consistent_after_every_step(steps in prop::collection::vec(step_strategy(), 0..24)) {
        let outcome = run_steps(&steps);
        prop_assert!(outcome.violations.is_empty(), "{:?}", outcome.violations);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Settled validation sees the final value
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn settled_validation_sees_final_value(steps in prop::collection::vec(step_strategy(), 1..24)) {
        let outcome = run_steps(&steps);
        if let Some(last_set) = outcome.last_set {
            prop_assert_eq!(outcome.last_call, Some(Some(last_set)));
        } else {
            prop_assert_eq!(outcome.last_call, None);
        }
    }
}
