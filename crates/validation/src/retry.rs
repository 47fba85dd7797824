//! Bounded retry for eventually-consistent state.
//!
//! A retrying check is a small state machine: it tracks the attempt
//! count, the wall-clock deadline and the last observation, and decides
//! after every unsatisfied attempt whether to wait, give up, or stop
//! because the caller cancelled.

use serde_json::Value;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Retry budget shared by every retrying check of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of observations per check (including the first)
    pub max_attempts: u32,
    /// Wall-clock budget per check, measured from the first attempt
    pub timeout: Duration,
    /// Delay used when a declaration does not set one
    pub default_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            timeout: Duration::from_secs(60),
            default_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, timeout: Duration, default_delay: Duration) -> Self {
        Self {
            max_attempts,
            timeout,
            default_delay,
        }
    }

    /// Resolve the delay for a declaration, falling back to the default.
    pub fn delay_for(&self, requested: Duration) -> Duration {
        if requested.is_zero() {
            self.default_delay
        } else {
            requested
        }
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    wake: Condvar,
    deadline: Option<Instant>,
}

/// Cancellation signal handed to retrying checks.
///
/// Clones share the same signal. Cancelling wakes any check currently
/// waiting between attempts.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    state: Arc<CancelState>,
}

impl Cancellation {
    /// A signal that only fires on [`Cancellation::cancel`]
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that also fires once `deadline` has passed
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            state: Arc::new(CancelState {
                deadline: Some(deadline),
                ..Default::default()
            }),
        }
    }

    pub fn cancel(&self) {
        let mut cancelled = self
            .state
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.state.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let cancelled = *self
            .state
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        cancelled || self.deadline_passed()
    }

    fn deadline_passed(&self) -> bool {
        self.state
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Block for up to `timeout`, returning early if cancelled.
    ///
    /// Returns `true` when the signal fired before or during the wait.
    pub fn wait(&self, timeout: Duration) -> bool {
        // `None` when the timeout is too large to represent as an instant
        let end = match (Instant::now().checked_add(timeout), self.state.deadline) {
            (Some(end), Some(deadline)) => Some(end.min(deadline)),
            (end, deadline) => end.or(deadline),
        };

        let mut cancelled = self
            .state
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if *cancelled {
                return true;
            }
            let Some(end) = end else {
                cancelled = self
                    .state
                    .wake
                    .wait(cancelled)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };
            let now = Instant::now();
            if now >= end {
                drop(cancelled);
                return self.is_cancelled();
            }
            cancelled = self
                .state
                .wake
                .wait_timeout(cancelled, end - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// What a retrying check does after an unsatisfied attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Wait this long, then observe again
    Wait(Duration),
    /// Attempt cap or timeout reached
    Exhausted,
    /// Caller cancelled or its deadline passed
    Cancelled,
}

/// Last unsatisfied observation
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Last {
    Mismatch { observed: Value, detail: String },
    ProbeError(String),
}

/// Progress of one retrying check
#[derive(Debug)]
pub(crate) struct RetryState {
    attempts: u32,
    started: Instant,
    last: Option<Last>,
}

impl RetryState {
    pub(crate) fn start() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            last: None,
        }
    }

    pub(crate) fn begin_attempt(&mut self) {
        self.attempts += 1;
    }

    pub(crate) fn record(&mut self, last: Last) {
        self.last = Some(last);
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn take_last(&mut self) -> Option<Last> {
        self.last.take()
    }

    /// Decide the next step after an unsatisfied attempt.
    pub(crate) fn next_step(
        &self,
        policy: &RetryPolicy,
        delay: Duration,
        cancel: &Cancellation,
    ) -> Step {
        if cancel.is_cancelled() {
            return Step::Cancelled;
        }
        if self.attempts >= policy.max_attempts.max(1) {
            return Step::Exhausted;
        }
        // A wait that would overrun the budget is never started
        if self.elapsed().saturating_add(delay) > policy.timeout {
            return Step::Exhausted;
        }
        Step::Wait(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_delay_falls_back_to_default() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5), Duration::from_millis(250));
        assert_eq!(policy.delay_for(Duration::ZERO), Duration::from_millis(250));
        assert_eq!(policy.delay_for(Duration::from_secs(2)), Duration::from_secs(2));
    }

    #[test]
    fn test_next_step_respects_attempt_cap() {
        let policy = RetryPolicy::new(2, Duration::from_secs(60), Duration::ZERO);
        let cancel = Cancellation::new();
        let mut state = RetryState::start();

        state.begin_attempt();
        assert_eq!(
            state.next_step(&policy, Duration::from_millis(1), &cancel),
            Step::Wait(Duration::from_millis(1))
        );
        state.begin_attempt();
        assert_eq!(
            state.next_step(&policy, Duration::from_millis(1), &cancel),
            Step::Exhausted
        );
    }

    #[test]
    fn test_next_step_refuses_wait_past_timeout() {
        let policy = RetryPolicy::new(100, Duration::from_millis(50), Duration::ZERO);
        let mut state = RetryState::start();
        state.begin_attempt();
        assert_eq!(
            state.next_step(&policy, Duration::from_secs(1), &Cancellation::new()),
            Step::Exhausted
        );
    }

    #[test]
    fn test_next_step_with_huge_delay_is_exhausted() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::start();
        state.begin_attempt();
        thread::sleep(Duration::from_millis(2));
        assert_eq!(
            state.next_step(&policy, Duration::from_secs(u64::MAX), &Cancellation::new()),
            Step::Exhausted
        );
    }

    #[test]
    fn test_unbounded_wait_still_wakes_on_cancel() {
        let cancel = Cancellation::new();
        let remote = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        assert!(cancel.wait(Duration::MAX));
        handle.join().unwrap();
    }

    #[test]
    fn test_unbounded_wait_ends_at_deadline() {
        let cancel = Cancellation::with_deadline(Instant::now() + Duration::from_millis(10));
        assert!(cancel.wait(Duration::MAX));
    }

    #[test]
    fn test_next_step_reports_cancellation() {
        let policy = RetryPolicy::default();
        let cancel = Cancellation::new();
        cancel.cancel();
        let mut state = RetryState::start();
        state.begin_attempt();
        assert_eq!(
            state.next_step(&policy, Duration::from_millis(1), &cancel),
            Step::Cancelled
        );
    }

    #[test]
    fn test_cancel_wakes_waiter() {
        let cancel = Cancellation::new();
        let remote = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let started = Instant::now();
        assert!(cancel.wait(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(30));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_without_cancel_times_out() {
        let cancel = Cancellation::new();
        assert!(!cancel.wait(Duration::from_millis(5)));
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_deadline_counts_as_cancelled() {
        let cancel = Cancellation::with_deadline(Instant::now() + Duration::from_millis(5));
        assert!(cancel.wait(Duration::from_secs(30)));
        assert!(cancel.is_cancelled());
    }
}
