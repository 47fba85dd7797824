//! Package resource

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validation::{Expectation, Meta, Subject, TestResult};

use super::{
    BoxedResource, Resource, RetryOptions, ValidateContext, assign_id, display_identity,
    effective_name, is_false, is_zero, run_check, should_skip,
};
use crate::config::Config;
use crate::error::Result;
use crate::system::PackageProbe;

pub const PACKAGE_RESOURCE_KEY: &str = "package";
pub const PACKAGE_RESOURCE_NAME: &str = "Package";

/// Expected state of an installed package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Package {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip)]
    id: String,
    /// Real package name, when it differs from the id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub installed: Expectation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Expectation>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub retry: bool,
    /// Seconds between retries
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retry_delay: u64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

impl Default for Package {
    fn default() -> Self {
        Self {
            title: String::new(),
            meta: None,
            id: String::new(),
            name: String::new(),
            installed: Expectation::from(false),
            versions: None,
            retry: false,
            retry_delay: 0,
            skip: false,
        }
    }
}

impl Package {
    /// A package expected to be installed
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            installed: Expectation::from(true),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_versions(mut self, versions: impl Into<Expectation>) -> Self {
        self.versions = Some(versions.into());
        self
    }

    pub fn with_retry(mut self, delay_secs: u64) -> Self {
        self.retry = true;
        self.retry_delay = delay_secs;
        self
    }

    /// Snapshot a live package as a declaration.
    ///
    /// Probe failures never abort the snapshot: a failed installed probe
    /// leaves `installed` false, a failed versions probe omits `versions`.
    pub fn build_declaration(probe: &dyn PackageProbe, config: &Config) -> Result<Self> {
        let name = probe.name();
        let installed = probe.installed().unwrap_or_else(|e| {
            log::warn!("Could not determine whether {name} is installed: {e:#}");
            false
        });

        let mut package = Self {
            id: name.clone(),
            installed: Expectation::from(installed),
            ..Default::default()
        };

        if !config.ignores("versions") {
            match probe.versions() {
                Ok(versions) => package.versions = Some(Expectation::from(versions)),
                Err(e) => log::warn!("Could not read versions of {name}: {e:#}"),
            }
        }

        Ok(package)
    }
}

impl Subject for Package {
    fn identity(&self) -> String {
        display_identity(&self.id, &self.name)
    }

    fn type_name(&self) -> &'static str {
        PACKAGE_RESOURCE_NAME
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }
}

impl Resource for Package {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: &str) {
        assign_id(&mut self.id, id);
    }

    fn set_skip(&mut self) {
        self.skip = true;
    }

    fn type_key(&self) -> &'static str {
        PACKAGE_RESOURCE_KEY
    }

    fn name(&self) -> String {
        effective_name(&self.id, &self.name)
    }

    fn validate(&self, ctx: &ValidateContext) -> Vec<TestResult> {
        let identity = self.identity();
        let name = self.name();
        let retry = RetryOptions::from_declaration(self.retry, self.retry_delay);
        let mut skip = self.skip;

        let mut results = Vec::with_capacity(2);
        results.push(run_check(
            ctx,
            self,
            "installed",
            &self.installed,
            retry,
            skip,
            || {
                ctx.system
                    .package(&identity, &name, ctx.config)
                    .installed()
                    .map(Value::Bool)
            },
        ));

        if !skip && should_skip(&results) {
            log::debug!("{identity}: not installed as expected, skipping version check");
            skip = true;
        }

        if let Some(versions) = &self.versions {
            results.push(run_check(ctx, self, "version", versions, retry, skip, || {
                ctx.system
                    .package(&identity, &name, ctx.config)
                    .versions()
                    .map(Value::from)
            }));
        }

        results
    }

    fn decode(&self, entry: Value) -> serde_json::Result<BoxedResource> {
        let package: Self = serde_json::from_value(entry)?;
        Ok(Box::new(package))
    }

    fn encode(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
