//! Core types for validation results

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Free-form metadata attached to a declaration
pub type Meta = BTreeMap<String, Value>;

/// An expected value for one check
///
/// Expectations are opaque to the engine. Only a [`crate::Matcher`]
/// knows how to interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expectation(Value);

impl Expectation {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// The raw expected value
    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Expectation {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<bool> for Expectation {
    fn from(value: bool) -> Self {
        Self(Value::Bool(value))
    }
}

impl From<Vec<String>> for Expectation {
    fn from(value: Vec<String>) -> Self {
        Self(Value::from(value))
    }
}

/// Outcome tag of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Observed value satisfied the expectation
    Success,
    /// Observed value did not satisfy the expectation
    Failure,
    /// Check was not executed
    Skipped,
    /// Live value could not be determined or judged
    Error,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Skipped => "skipped",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Immutable record of one check's outcome
///
/// Only the [`crate::Validator`] creates these. Reporters consume them
/// without any knowledge of the resource kind that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    resource_id: String,
    resource_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<Meta>,
    property: String,
    outcome: Outcome,
    expected: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    observed: Option<Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    detail: String,
    attempts: u32,
    duration_ms: u64,
}

impl TestResult {
    pub(crate) fn new(
        subject: &dyn crate::Subject,
        property: &str,
        expected: &Expectation,
        outcome: Outcome,
    ) -> Self {
        Self {
            resource_id: subject.identity(),
            resource_type: subject.type_name().to_string(),
            title: subject.title().to_string(),
            meta: subject.meta().cloned(),
            property: property.to_string(),
            outcome,
            expected: expected.value().clone(),
            observed: None,
            detail: String::new(),
            attempts: 0,
            duration_ms: 0,
        }
    }

    pub(crate) fn with_observed(mut self, observed: Option<Value>) -> Self {
        self.observed = observed;
        self
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub(crate) fn with_attempts(mut self, attempts: u32, elapsed: Duration) -> Self {
        self.attempts = attempts;
        self.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Display identity of the owning resource
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    /// Check label, e.g. "installed" or "version"
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn expected(&self) -> &Value {
        &self.expected
    }

    /// Observed value, if the probe produced one
    pub fn observed(&self) -> Option<&Value> {
        self.observed.as_ref()
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Number of times the live value was observed
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Summary of a validation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
    pub error: usize,
}

impl Summary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a TestResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.add_result(result);
        }
        summary
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &TestResult) {
        match result.outcome() {
            Outcome::Success => self.success += 1,
            Outcome::Failure => self.failure += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Error => self.error += 1,
        }
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &Summary) {
        self.success += other.success;
        self.failure += other.failure;
        self.skipped += other.skipped;
        self.error += other.error;
    }

    /// Total number of checks recorded
    pub fn total(&self) -> usize {
        self.success + self.failure + self.skipped + self.error
    }

    /// A run passes when nothing failed or errored
    pub fn is_success(&self) -> bool {
        self.failure == 0 && self.error == 0
    }
}
