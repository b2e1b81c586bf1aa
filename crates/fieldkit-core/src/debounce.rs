#![forbid(unsafe_code)]

//! Trailing-edge debounce on the local task set.
//!
//! A [`Debouncer`] runs an effect once the observed dependency value has been
//! quiet for `delay`. Each new observation that differs from the previous one
//! aborts the pending timer and arms a fresh one, so a burst of changes yields
//! exactly one effect, carrying the last value.
//!
//! # Invariants
//!
//! - At most one timer is pending at any time.
//! - Only a timer that elapses without being aborted runs its effect.
//! - Once the effect has started it is detached from the debouncer: later
//!   re-arms or [`cancel`](Debouncer::cancel) never interrupt it.
//! - Observing a value equal to the last observed one does not re-arm.
//!
//! # Failure Modes
//!
//! | Condition                          | Behavior                                    |
//! |------------------------------------|---------------------------------------------|
//! | `delay = 0`                        | Effect runs on the next scheduler turn      |
//! | Debouncer dropped                  | Pending timer is aborted                    |
//! | No tokio runtime on the thread     | Nothing is armed, a warning is logged       |
//! | Runtime entered, no `LocalSet`     | `arm` panics (tokio `spawn_local` contract) |

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::AbortHandle;

/// Counters describing a debouncer's history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceStats {
    /// Timers started.
    pub armed: u64,
    /// Timers aborted before elapsing.
    pub cancelled: u64,
    /// Timers that elapsed and handed off their effect.
    pub fired: u64,
}

/// State shared with the spawned timer tasks.
#[derive(Debug, Default)]
struct Shared {
    armed: Cell<u64>,
    cancelled: Cell<u64>,
    fired: Cell<u64>,
    /// Epoch of the timer still waiting to elapse, if any.
    pending: Cell<Option<u64>>,
}

impl Shared {
    fn mark_fired(&self, epoch: u64) {
        if self.pending.get() == Some(epoch) {
            self.pending.set(None);
        }
        self.fired.set(self.fired.get() + 1);
    }
}

/// Debounces an effect against a dependency value of type `D`.
pub struct Debouncer<D> {
    delay: Duration,
    last_deps: Option<D>,
    handle: Option<AbortHandle>,
    shared: Rc<Shared>,
}

impl<D> fmt::Debug for Debouncer<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<D> Debouncer<D> {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_deps: None,
            handle: None,
            shared: Rc::new(Shared::default()),
        }
    }

    /// The quiet period applied to the next arm.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Change the quiet period. A timer already pending keeps its old deadline.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Whether a timer is waiting to elapse.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.shared.pending.get().is_some()
    }

    /// Snapshot of the arm/cancel/fire counters.
    #[must_use]
    pub fn stats(&self) -> DebounceStats {
        DebounceStats {
            armed: self.shared.armed.get(),
            cancelled: self.shared.cancelled.get(),
            fired: self.shared.fired.get(),
        }
    }

    /// The last dependency value passed to [`observe`](Self::observe).
    #[must_use]
    pub fn last_deps(&self) -> Option<&D> {
        self.last_deps.as_ref()
    }

    /// Abort the pending timer, if any. Returns `true` when a timer was aborted.
    pub fn cancel(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        if self.shared.pending.take().is_none() {
            return false;
        }
        handle.abort();
        self.shared.cancelled.set(self.shared.cancelled.get() + 1);
        true
    }

    /// Restart the timer unconditionally with `effect` as the trailing action.
    ///
    /// Returns `false`, leaving any pending timer in place, when no tokio
    /// runtime is entered on this thread.
    ///
    /// # Panics
    ///
    /// Panics inside a runtime but outside a `tokio::task::LocalSet`.
    pub fn arm<F, Fut>(&mut self, effect: F) -> bool
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            crate::warn!("no tokio runtime on this thread, debounce not armed");
            return false;
        }
        self.cancel();

        let epoch = self.shared.armed.get() + 1;
        self.shared.armed.set(epoch);
        self.shared.pending.set(Some(epoch));

        let shared = Rc::clone(&self.shared);
        let delay = self.delay;
        crate::trace!(epoch, delay_ms = delay.as_millis() as u64, "debounce armed");
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            shared.mark_fired(epoch);
            crate::trace!(epoch, "debounce fired");
            // Detach so that a later abort of this timer cannot reach the effect.
            tokio::task::spawn_local(effect());
        });
        self.handle = Some(handle.abort_handle());
        true
    }
}

impl<D: PartialEq> Debouncer<D> {
    /// Record `deps` as already observed without arming a timer.
    ///
    /// A later [`observe`](Self::observe) of the same value is then a no-op.
    pub fn prime(&mut self, deps: D) {
        self.last_deps = Some(deps);
    }

    /// Record `deps` and re-arm when it differs from the last observed value.
    ///
    /// The first observation always arms. Returns `true` when a timer was armed.
    /// A value that could not be armed (see [`arm`](Self::arm)) is not recorded.
    ///
    /// # Panics
    ///
    /// Panics when a timer must be armed inside a runtime but outside a
    /// `tokio::task::LocalSet`.
    pub fn observe<F, Fut>(&mut self, deps: D, effect: F) -> bool
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        if self.last_deps.as_ref() == Some(&deps) {
            return false;
        }
        if !self.arm(effect) {
            return false;
        }
        self.last_deps = Some(deps);
        true
    }
}

impl<D> Drop for Debouncer<D> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tokio::task::LocalSet;
    use tokio::time::sleep;

    const DELAY: Duration = Duration::from_millis(100);

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> std::future::Ready<()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, move |v| {
            sink.borrow_mut().push(v);
            std::future::ready(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_quiet_period() {
        LocalSet::new()
            .run_until(async {
                let (log, record) = recorder();
                let record = Rc::new(record);
                let mut debouncer = Debouncer::new(DELAY);

                let r = Rc::clone(&record);
                assert!(debouncer.observe(1, move || r(1)));
                assert!(debouncer.is_pending());

                sleep(Duration::from_millis(99)).await;
                assert!(log.borrow().is_empty());

                sleep(Duration::from_millis(2)).await;
                assert_eq!(*log.borrow(), vec![1]);
                assert!(!debouncer.is_pending());
                assert_eq!(
                    debouncer.stats(),
                    DebounceStats {
                        armed: 1,
                        cancelled: 0,
                        fired: 1
                    }
                );
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_value() {
        LocalSet::new()
            .run_until(async {
                let (log, record) = recorder();
                let record = Rc::new(record);
                let mut debouncer = Debouncer::new(DELAY);

                for v in 1..=4 {
                    let r = Rc::clone(&record);
                    debouncer.observe(v, move || r(v));
                    sleep(Duration::from_millis(40)).await;
                }
                sleep(DELAY).await;

                assert_eq!(*log.borrow(), vec![4]);
                let stats = debouncer.stats();
                assert_eq!(stats.armed, 4);
                assert_eq!(stats.cancelled, 3);
                assert_eq!(stats.fired, 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn equal_deps_do_not_rearm() {
        LocalSet::new()
            .run_until(async {
                let (log, record) = recorder();
                let record = Rc::new(record);
                let mut debouncer = Debouncer::new(DELAY);

                let r = Rc::clone(&record);
                assert!(debouncer.observe(7, move || r(7)));
                sleep(Duration::from_millis(60)).await;
                let r = Rc::clone(&record);
                assert!(!debouncer.observe(7, move || r(70)));

                // Deadline is still measured from the first observation.
                sleep(Duration::from_millis(41)).await;
                assert_eq!(*log.borrow(), vec![7]);
                assert_eq!(debouncer.last_deps(), Some(&7));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn primed_value_does_not_arm() {
        LocalSet::new()
            .run_until(async {
                let (log, record) = recorder();
                let record = Rc::new(record);
                let mut debouncer = Debouncer::new(DELAY);
                debouncer.prime(3);

                let r = Rc::clone(&record);
                assert!(!debouncer.observe(3, move || r(3)));
                assert!(!debouncer.is_pending());

                let r = Rc::clone(&record);
                assert!(debouncer.observe(4, move || r(4)));
                sleep(DELAY * 2).await;
                assert_eq!(*log.borrow(), vec![4]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_abort_pending_timer() {
        LocalSet::new()
            .run_until(async {
                let (log, record) = recorder();
                let record = Rc::new(record);

                let mut debouncer = Debouncer::new(DELAY);
                let r = Rc::clone(&record);
                debouncer.observe(1, move || r(1));
                assert!(debouncer.cancel());
                assert!(!debouncer.cancel());

                let mut dropped = Debouncer::new(DELAY);
                let r = Rc::clone(&record);
                dropped.observe(2, move || r(2));
                drop(dropped);

                sleep(DELAY * 2).await;
                assert!(log.borrow().is_empty());
                assert_eq!(debouncer.stats().cancelled, 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn started_effect_survives_rearm() {
        LocalSet::new()
            .run_until(async {
                let done = Rc::new(Cell::new(false));
                let mut debouncer: Debouncer<u32> = Debouncer::new(DELAY);

                let flag = Rc::clone(&done);
                debouncer.arm(move || async move {
                    sleep(Duration::from_millis(500)).await;
                    flag.set(true);
                });
                sleep(Duration::from_millis(150)).await;

                // Effect is mid-flight; re-arming must not abort it.
                debouncer.arm(|| async {});
                sleep(Duration::from_millis(500)).await;
                assert!(done.get());
            })
            .await;
    }

    #[test]
    fn arming_without_runtime_is_skipped() {
        let mut debouncer = Debouncer::new(DELAY);
        assert!(!debouncer.observe(1, || async {}));
        assert!(!debouncer.arm(|| async {}));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.last_deps(), None);
        assert_eq!(debouncer.stats(), DebounceStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_runs_on_next_turn() {
        LocalSet::new()
            .run_until(async {
                let (log, record) = recorder();
                let mut debouncer = Debouncer::new(Duration::ZERO);
                debouncer.observe(9, move || record(9));
                assert!(log.borrow().is_empty());
                sleep(Duration::from_millis(1)).await;
                assert_eq!(*log.borrow(), vec![9]);
            })
            .await;
    }
}
