//! In-memory probe provider for tests

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use validation::{RetryPolicy, Validator};

use crate::config::Config;
use crate::system::{PackageProbe, ServiceProbe, System};

#[derive(Debug, Clone, Default)]
pub struct FakePackage {
    pub installed: bool,
    pub versions: Vec<String>,
    /// Every probe call fails
    pub failing: bool,
    /// Number of `installed` calls that report false before the real value
    pub pending: u32,
}

impl FakePackage {
    pub fn installed(versions: &[&str]) -> Self {
        Self {
            installed: true,
            versions: versions.iter().map(ToString::to_string).collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeService {
    pub enabled: bool,
    pub running: bool,
    pub failing: bool,
}

#[derive(Debug, Default)]
pub struct Calls {
    pub resolved: AtomicUsize,
    pub installed: AtomicUsize,
    pub versions: AtomicUsize,
    pub enabled: AtomicUsize,
    pub running: AtomicUsize,
}

impl Calls {
    /// Total number of live observations made
    pub fn observations(&self) -> usize {
        self.installed.load(Ordering::SeqCst)
            + self.versions.load(Ordering::SeqCst)
            + self.enabled.load(Ordering::SeqCst)
            + self.running.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct State {
    packages: Mutex<HashMap<String, FakePackage>>,
    services: Mutex<HashMap<String, FakeService>>,
    lookups: Mutex<Vec<(String, String)>>,
    calls: Calls,
}

#[derive(Debug, Clone, Default)]
pub struct FakeSystem {
    state: Arc<State>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(self, name: &str, package: FakePackage) -> Self {
        self.state
            .packages
            .lock()
            .unwrap()
            .insert(name.to_string(), package);
        self
    }

    pub fn with_service(self, name: &str, service: FakeService) -> Self {
        self.state
            .services
            .lock()
            .unwrap()
            .insert(name.to_string(), service);
        self
    }

    pub fn calls(&self) -> &Calls {
        &self.state.calls
    }

    /// `(id, name)` pairs of every probe resolution
    pub fn lookups(&self) -> Vec<(String, String)> {
        self.state.lookups.lock().unwrap().clone()
    }

    fn record(&self, id: &str, name: &str) {
        self.state.calls.resolved.fetch_add(1, Ordering::SeqCst);
        self.state
            .lookups
            .lock()
            .unwrap()
            .push((id.to_string(), name.to_string()));
    }
}

impl System for FakeSystem {
    fn package(&self, id: &str, name: &str, _config: &Config) -> Box<dyn PackageProbe> {
        self.record(id, name);
        Box::new(FakePackageProbe {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    fn service(&self, id: &str, name: &str, _config: &Config) -> Box<dyn ServiceProbe> {
        self.record(id, name);
        Box::new(FakeServiceProbe {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}

pub struct FakePackageProbe {
    name: String,
    state: Arc<State>,
}

impl PackageProbe for FakePackageProbe {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn installed(&self) -> Result<bool> {
        self.state.calls.installed.fetch_add(1, Ordering::SeqCst);
        let mut packages = self.state.packages.lock().unwrap();
        let Some(pkg) = packages.get_mut(&self.name) else {
            return Ok(false);
        };
        if pkg.failing {
            return Err(anyhow!("package database locked"));
        }
        if pkg.pending > 0 {
            pkg.pending -= 1;
            return Ok(false);
        }
        Ok(pkg.installed)
    }

    fn versions(&self) -> Result<Vec<String>> {
        self.state.calls.versions.fetch_add(1, Ordering::SeqCst);
        let packages = self.state.packages.lock().unwrap();
        match packages.get(&self.name) {
            Some(pkg) if pkg.failing => Err(anyhow!("package database locked")),
            Some(pkg) if pkg.installed => Ok(pkg.versions.clone()),
            _ => Err(anyhow!("package {} is not installed", self.name)),
        }
    }
}

pub struct FakeServiceProbe {
    name: String,
    state: Arc<State>,
}

impl FakeServiceProbe {
    fn lookup(&self) -> Result<FakeService> {
        let services = self.state.services.lock().unwrap();
        match services.get(&self.name) {
            Some(svc) if svc.failing => Err(anyhow!("init system unreachable")),
            Some(svc) => Ok(svc.clone()),
            None => Ok(FakeService::default()),
        }
    }
}

impl ServiceProbe for FakeServiceProbe {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn enabled(&self) -> Result<bool> {
        self.state.calls.enabled.fetch_add(1, Ordering::SeqCst);
        Ok(self.lookup()?.enabled)
    }

    fn running(&self) -> Result<bool> {
        self.state.calls.running.fetch_add(1, Ordering::SeqCst);
        Ok(self.lookup()?.running)
    }
}

/// Validator whose retries finish within milliseconds
pub fn fast_validator(max_attempts: u32) -> Validator {
    Validator::new().with_policy(RetryPolicy::new(
        max_attempts,
        Duration::from_secs(30),
        Duration::from_millis(1),
    ))
}
