//! Resource trait and shared check plumbing
//!
//! Every checkable thing in hostcheck is modeled as a Resource with:
//! - Identity (raw id, display identity, effective lookup name)
//! - Type tagging (registry key and display name)
//! - Validate (run each declared check through the validator)
//! - Prototype decode/encode for declaration documents

use serde_json::Value;
use std::fmt;
use std::time::Duration;
use validation::{Expectation, Subject, TestResult, Validator};

use crate::config::Config;
use crate::system::System;

pub mod package;
pub mod service;

pub use package::Package;
pub use service::Service;

/// Context passed to validate operations
pub struct ValidateContext<'a> {
    /// Live-state probe provider
    pub system: &'a dyn System,
    /// Matcher, retry budget and cancellation for this run
    pub validator: &'a Validator,
    pub config: &'a Config,
}

impl<'a> ValidateContext<'a> {
    pub fn new(system: &'a dyn System, validator: &'a Validator, config: &'a Config) -> Self {
        Self {
            system,
            validator,
            config,
        }
    }
}

/// Core trait for all resource kinds
pub trait Resource: Subject + Send + Sync + fmt::Debug {
    /// Raw identifier, as keyed in the declaration document
    fn id(&self) -> &str;

    /// Assign the identifier. Ignored once an identifier is set.
    fn set_id(&mut self, id: &str);

    /// Force every check of this resource to be skipped
    fn set_skip(&mut self);

    /// Registry key, e.g. "package"
    fn type_key(&self) -> &'static str;

    /// Name handed to the probe layer
    fn name(&self) -> String;

    /// Run every declared check, in order
    fn validate(&self, ctx: &ValidateContext) -> Vec<TestResult>;

    /// Build a new instance of this kind from a declaration entry
    ///
    /// Called on registry prototypes. The returned resource has no id yet.
    fn decode(&self, entry: Value) -> serde_json::Result<BoxedResource>;

    /// Serialize this resource as a declaration entry
    fn encode(&self) -> serde_json::Result<Value>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Display identity: `"<id>: <name>"` when a distinct name is set
pub(crate) fn display_identity(id: &str, name: &str) -> String {
    if !name.is_empty() && name != id {
        format!("{id}: {name}")
    } else {
        id.to_string()
    }
}

/// Lookup name: the explicit name if set, else the identifier
pub(crate) fn effective_name(id: &str, name: &str) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}

pub(crate) fn assign_id(slot: &mut String, id: &str) {
    if slot.is_empty() {
        *slot = id.to_string();
    } else if slot != id {
        log::debug!("Ignoring id {id:?}: resource already identified as {slot:?}");
    }
}

/// Retry settings from a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryOptions {
    pub enabled: bool,
    pub delay: Duration,
}

impl RetryOptions {
    pub fn from_declaration(enabled: bool, delay_secs: u64) -> Self {
        Self {
            enabled,
            delay: Duration::from_secs(delay_secs),
        }
    }
}

/// Run one check with or without retry
pub(crate) fn run_check<F>(
    ctx: &ValidateContext,
    subject: &dyn Subject,
    property: &str,
    expected: &Expectation,
    retry: RetryOptions,
    skip: bool,
    observe: F,
) -> TestResult
where
    F: FnMut() -> anyhow::Result<Value>,
{
    if retry.enabled {
        ctx.validator
            .validate_value_with_retry(subject, property, expected, observe, skip, retry.delay)
    } else {
        ctx.validator
            .validate_value(subject, property, expected, observe, skip)
    }
}

/// Whether later checks should be skipped because an earlier one did not succeed
pub(crate) fn should_skip(results: &[TestResult]) -> bool {
    results.iter().any(|r| !r.is_success())
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

pub(crate) fn is_zero(value: &u64) -> bool {
    *value == 0
}
