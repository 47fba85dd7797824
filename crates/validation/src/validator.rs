//! The validation primitive
//!
//! Every resource kind funnels its checks through [`Validator`], which
//! decides when to observe, how often, and how to fold the observation
//! into a [`TestResult`].

use crate::matcher::{Matcher, StandardMatcher};
use crate::retry::{Cancellation, Last, RetryPolicy, RetryState, Step};
use crate::types::{Expectation, Meta, Outcome, TestResult};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The owning resource of a check, as seen by result records
pub trait Subject {
    /// Display identity, e.g. "pkg1: nginx"
    fn identity(&self) -> String;

    /// Kind name, e.g. "Package"
    fn type_name(&self) -> &'static str;

    fn title(&self) -> &str {
        ""
    }

    fn meta(&self) -> Option<&Meta> {
        None
    }
}

/// Runs checks against live observations
#[derive(Clone)]
pub struct Validator {
    matcher: Arc<dyn Matcher>,
    policy: RetryPolicy,
    cancel: Cancellation,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            matcher: Arc::new(StandardMatcher),
            policy: RetryPolicy::default(),
            cancel: Cancellation::new(),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("policy", &self.policy)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn Matcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// Observe once and judge the observation.
    ///
    /// `observe` is not called when `skip` is set.
    pub fn validate_value<F>(
        &self,
        subject: &dyn Subject,
        property: &str,
        expected: &Expectation,
        observe: F,
        skip: bool,
    ) -> TestResult
    where
        F: FnOnce() -> anyhow::Result<Value>,
    {
        if skip {
            return skipped(subject, property, expected);
        }

        let started = Instant::now();
        let result = match observe() {
            Ok(observed) => self.judge(subject, property, expected, observed),
            Err(e) => TestResult::new(subject, property, expected, Outcome::Error)
                .with_detail(format!("{e:#}")),
        };
        result.with_attempts(1, started.elapsed())
    }

    /// Observe until the expectation holds or the retry budget runs out.
    ///
    /// `retry_delay` is the wait between attempts; zero means the policy's
    /// default. The terminal result carries the last observation and the
    /// number of attempts made.
    pub fn validate_value_with_retry<F>(
        &self,
        subject: &dyn Subject,
        property: &str,
        expected: &Expectation,
        mut observe: F,
        skip: bool,
        retry_delay: Duration,
    ) -> TestResult
    where
        F: FnMut() -> anyhow::Result<Value>,
    {
        if skip {
            return skipped(subject, property, expected);
        }

        let delay = self.policy.delay_for(retry_delay);
        let mut state = RetryState::start();

        loop {
            state.begin_attempt();
            match observe() {
                Ok(observed) => match self.matcher.matches(expected, &observed) {
                    Ok(verdict) if verdict.satisfied => {
                        return TestResult::new(subject, property, expected, Outcome::Success)
                            .with_observed(Some(observed))
                            .with_attempts(state.attempts(), state.elapsed());
                    }
                    Ok(verdict) => state.record(Last::Mismatch {
                        observed,
                        detail: verdict.detail,
                    }),
                    // A malformed expectation will not fix itself
                    Err(e) => {
                        return TestResult::new(subject, property, expected, Outcome::Error)
                            .with_observed(Some(observed))
                            .with_detail(format!("invalid expectation: {e}"))
                            .with_attempts(state.attempts(), state.elapsed());
                    }
                },
                Err(e) => state.record(Last::ProbeError(format!("{e:#}"))),
            }

            match state.next_step(&self.policy, delay, &self.cancel) {
                Step::Wait(wait) => {
                    log::debug!(
                        "{} {}: attempt {}/{} unsatisfied, retrying in {:?}",
                        subject.identity(),
                        property,
                        state.attempts(),
                        self.policy.max_attempts,
                        wait
                    );
                    if self.cancel.wait(wait) {
                        return cancelled(subject, property, expected, &mut state);
                    }
                }
                Step::Exhausted => return exhausted(subject, property, expected, &mut state),
                Step::Cancelled => return cancelled(subject, property, expected, &mut state),
            }
        }
    }

    fn judge(
        &self,
        subject: &dyn Subject,
        property: &str,
        expected: &Expectation,
        observed: Value,
    ) -> TestResult {
        match self.matcher.matches(expected, &observed) {
            Ok(verdict) if verdict.satisfied => {
                TestResult::new(subject, property, expected, Outcome::Success)
                    .with_observed(Some(observed))
            }
            Ok(verdict) => TestResult::new(subject, property, expected, Outcome::Failure)
                .with_observed(Some(observed))
                .with_detail(verdict.detail),
            Err(e) => TestResult::new(subject, property, expected, Outcome::Error)
                .with_observed(Some(observed))
                .with_detail(format!("invalid expectation: {e}")),
        }
    }
}

fn skipped(subject: &dyn Subject, property: &str, expected: &Expectation) -> TestResult {
    TestResult::new(subject, property, expected, Outcome::Skipped)
}

fn exhausted(
    subject: &dyn Subject,
    property: &str,
    expected: &Expectation,
    state: &mut RetryState,
) -> TestResult {
    let attempts = state.attempts();
    log::debug!(
        "{} {}: retry budget exhausted after {} attempts",
        subject.identity(),
        property,
        attempts
    );
    let result = match state.take_last() {
        Some(Last::Mismatch { observed, detail }) => {
            TestResult::new(subject, property, expected, Outcome::Failure)
                .with_observed(Some(observed))
                .with_detail(format!("{detail} (after {attempts} attempts)"))
        }
        Some(Last::ProbeError(error)) => {
            TestResult::new(subject, property, expected, Outcome::Error)
                .with_detail(format!("{error} (after {attempts} attempts)"))
        }
        None => TestResult::new(subject, property, expected, Outcome::Error)
            .with_detail(format!("no observation after {attempts} attempts")),
    };
    result.with_attempts(attempts, state.elapsed())
}

fn cancelled(
    subject: &dyn Subject,
    property: &str,
    expected: &Expectation,
    state: &mut RetryState,
) -> TestResult {
    let attempts = state.attempts();
    log::debug!(
        "{} {}: cancelled after {} attempts",
        subject.identity(),
        property,
        attempts
    );
    let (observed, last) = match state.take_last() {
        Some(Last::Mismatch { observed, detail }) => (Some(observed), detail),
        Some(Last::ProbeError(error)) => (None, error),
        None => (None, String::new()),
    };
    let detail = if last.is_empty() {
        format!("cancelled after {attempts} attempts")
    } else {
        format!("cancelled after {attempts} attempts: {last}")
    };
    TestResult::new(subject, property, expected, Outcome::Error)
        .with_observed(observed)
        .with_detail(detail)
        .with_attempts(attempts, state.elapsed())
}
