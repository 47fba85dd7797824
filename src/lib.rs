//! # hostcheck
//!
//! Validates declared expectations about a machine (packages installed,
//! versions, services running) against live probes of the system.
//!
//! ## Core Concepts
//!
//! - **Resource**: one declared thing to check, e.g. a [`Package`]
//! - **Registry**: maps declaration type keys to resource kinds
//! - **Document**: `type key -> id -> entry` declarations, TOML or JSON
//! - **System**: host-provided probes for live state
//! - **Validator**: runs each check and records a [`TestResult`]
//!
//! ## Example
//!
//! ```ignore
//! use hostcheck::{Config, Document, Registry, ValidateContext, Validator, registry, runner};
//!
//! let registry = registry::init(Registry::builtin()?)?;
//! let document = Document::from_toml_str(r#"
//! [package.nginx]
//! installed = true
//! "#)?;
//! let resources = registry.parse(&document)?;
//!
//! let config = Config::default();
//! let validator = Validator::new().with_policy(config.retry_policy());
//! let ctx = ValidateContext::new(&my_system, &validator, &config);
//! let report = runner::validate_all(&resources, &ctx, config.jobs)?;
//! ```
//!
//! The reverse direction snapshots live state into declarations with
//! [`Package::build_declaration`] and [`Document::insert`].

pub mod config;
pub mod document;
pub mod error;
pub mod registry;
pub mod resource;
pub mod runner;
pub mod system;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use config::{Config, RetrySettings};
pub use document::Document;
pub use error::{Error, Result};
pub use registry::Registry;
pub use resource::{BoxedResource, Package, Resource, Service, ValidateContext};
pub use runner::{RunReport, validate_all};
pub use system::{PackageProbe, ServiceProbe, System};
pub use validation::{
    Cancellation, Expectation, MatchOutcome, Matcher, Meta, Outcome, RetryPolicy, StandardMatcher,
    Subject, Summary, TestResult, Validator,
};
