//! # Validation
//!
//! Kind-agnostic primitives for checking live system state against
//! declared expectations.
//!
//! ## Core Concepts
//!
//! - **Expectation**: an opaque expected value for one check
//! - **Matcher**: judges an observed value against an expectation
//! - **Validator**: observes once, or retries within a bounded budget,
//!   and records a [`TestResult`]
//! - **TestResult**: immutable outcome of one check (success, failure,
//!   skipped, error)
//!
//! ## Example
//!
//! ```ignore
//! use validation::{Expectation, Subject, Validator};
//!
//! struct Pkg;
//!
//! impl Subject for Pkg {
//!     fn identity(&self) -> String { "nginx".into() }
//!     fn type_name(&self) -> &'static str { "Package" }
//! }
//!
//! let validator = Validator::new();
//! let result = validator.validate_value(
//!     &Pkg,
//!     "installed",
//!     &Expectation::from(true),
//!     || Ok(serde_json::Value::Bool(true)),
//!     false,
//! );
//! assert!(result.is_success());
//! ```
//!
//! Probes are plain closures returning `anyhow::Result<serde_json::Value>`,
//! so the crate has no knowledge of how live values are obtained.

pub mod matcher;
pub mod retry;
pub mod types;
pub mod validator;

// Re-export main types at crate root
pub use matcher::{MatchError, MatchOutcome, Matcher, StandardMatcher};
pub use retry::{Cancellation, RetryPolicy};
pub use types::{Expectation, Meta, Outcome, Summary, TestResult};
pub use validator::{Subject, Validator};
