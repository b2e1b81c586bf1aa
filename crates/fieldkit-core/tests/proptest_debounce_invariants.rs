//! Property-based invariant tests for the trailing-edge debouncer.
//!
//! For any schedule of distinct observations:
//!
//! 1. The effect fires once per burst (a burst ends at a gap longer than the delay).
//! 2. Each firing carries the last value observed in its burst.
//! 3. armed = observations, cancelled = armed - fired.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use fieldkit_core::Debouncer;
use proptest::prelude::*;
use tokio::task::LocalSet;
use tokio::time::sleep;

const DELAY_MS: u64 = 100;

// ── Helpers ─────────────────────────────────────────────────────────────

/// Gaps that are never exactly the delay, so timer/observer ordering is unambiguous.
fn gap_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![0u64..DELAY_MS, (DELAY_MS + 1)..(DELAY_MS * 3)]
}

fn expected_firings(gaps: &[u64]) -> Vec<usize> {
    // Observation i is followed by gaps[i]; the final observation always fires.
    let mut fired = Vec::new();
    for (i, gap) in gaps.iter().enumerate() {
        if *gap > DELAY_MS {
            fired.push(i);
        }
    }
    fired.push(gaps.len());
    fired
}

fn run_schedule(gaps: &[u64]) -> (Vec<usize>, fieldkit_core::DebounceStats) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime");
    let local = LocalSet::new();
    local.block_on(&runtime, async {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut debouncer = Debouncer::new(Duration::from_millis(DELAY_MS));

        for i in 0..=gaps.len() {
            let sink = Rc::clone(&log);
            debouncer.observe(i, move || async move { sink.borrow_mut().push(i) });
            if let Some(gap) = gaps.get(i) {
                sleep(Duration::from_millis(*gap)).await;
            }
        }
        sleep(Duration::from_millis(DELAY_MS * 2)).await;

        let fired = log.borrow().clone();
        (fired, debouncer.stats())
    })
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. One firing per burst, carrying the burst's last value
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn one_firing_per_burst(gaps in prop::collection::vec(gap_strategy(), 0..12)) {
        let (fired, _) = run_schedule(&gaps);
        prop_assert_eq!(fired, expected_firings(&gaps), "gaps={:?}", gaps);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Counter bookkeeping
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn counters_balance(gaps in prop::collection::vec(gap_strategy(), 0..12)) {
        let (fired, stats) = run_schedule(&gaps);
        prop_assert_eq!(stats.armed, gaps.len() as u64 + 1);
        prop_assert_eq!(stats.fired, fired.len() as u64);
        prop_assert_eq!(stats.cancelled, stats.armed - stats.fired);
    }
}
