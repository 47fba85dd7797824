//! Service resource - boot-time enablement and running state

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validation::{Expectation, Meta, Subject, TestResult};

use super::{
    BoxedResource, Resource, RetryOptions, ValidateContext, assign_id, display_identity,
    effective_name, is_false, is_zero, run_check,
};
use crate::config::Config;
use crate::error::Result;
use crate::system::ServiceProbe;

pub const SERVICE_RESOURCE_KEY: &str = "service";
pub const SERVICE_RESOURCE_NAME: &str = "Service";

/// Expected state of a system service
///
/// `enabled` and `running` are checked independently; a service that is
/// not enabled may still be expected to run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip)]
    id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<Expectation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running: Option<Expectation>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub retry: bool,
    /// Seconds between retries
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retry_delay: u64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

impl Service {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(Expectation::from(enabled));
        self
    }

    pub fn with_running(mut self, running: bool) -> Self {
        self.running = Some(Expectation::from(running));
        self
    }

    /// Snapshot a live service as a declaration.
    ///
    /// A failed probe omits the corresponding field, as does listing
    /// "enabled" or "running" in the config's ignore list.
    pub fn build_declaration(probe: &dyn ServiceProbe, config: &Config) -> Result<Self> {
        let name = probe.name();
        let mut service = Self::new(&name);

        if !config.ignores("enabled") {
            match probe.enabled() {
                Ok(enabled) => service.enabled = Some(Expectation::from(enabled)),
                Err(e) => log::warn!("Could not determine whether {name} is enabled: {e:#}"),
            }
        }
        if !config.ignores("running") {
            match probe.running() {
                Ok(running) => service.running = Some(Expectation::from(running)),
                Err(e) => log::warn!("Could not determine whether {name} is running: {e:#}"),
            }
        }

        Ok(service)
    }
}

impl Subject for Service {
    fn identity(&self) -> String {
        display_identity(&self.id, &self.name)
    }

    fn type_name(&self) -> &'static str {
        SERVICE_RESOURCE_NAME
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }
}

impl Resource for Service {
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
        SERVICE_RESOURCE_KEY
    }

    fn name(&self) -> String {
        effective_name(&self.id, &self.name)
    }

    fn validate(&self, ctx: &ValidateContext) -> Vec<TestResult> {
        let identity = self.identity();
        let name = self.name();
        let retry = RetryOptions::from_declaration(self.retry, self.retry_delay);

        let mut results = Vec::with_capacity(2);
        if let Some(enabled) = &self.enabled {
            results.push(run_check(ctx, self, "enabled", enabled, retry, self.skip, || {
                ctx.system
                    .service(&identity, &name, ctx.config)
                    .enabled()
                    .map(Value::Bool)
            }));
        }
        if let Some(running) = &self.running {
            results.push(run_check(ctx, self, "running", running, retry, self.skip, || {
                ctx.system
                    .service(&identity, &name, ctx.config)
                    .running()
                    .map(Value::Bool)
            }));
        }
        results
    }

    fn decode(&self, entry: Value) -> serde_json::Result<BoxedResource> {
        let service: Self = serde_json::from_value(entry)?;
        Ok(Box::new(service))
    }

    fn encode(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
