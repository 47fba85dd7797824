//! Live-state probe interfaces
//!
//! These traits allow the engine to be used without depending on any
//! particular package manager or init system. Hosts implement [`System`]
//! and hand it to validation through [`crate::ValidateContext`].

use anyhow::Result;

use crate::config::Config;

/// Live view of one package
pub trait PackageProbe: Send {
    /// Real-world package name this probe was resolved for
    fn name(&self) -> String;

    /// Whether the package is currently installed
    fn installed(&self) -> Result<bool>;

    /// Installed versions, in the order the package manager reports them
    fn versions(&self) -> Result<Vec<String>>;
}

/// Live view of one service
pub trait ServiceProbe: Send {
    fn name(&self) -> String;

    /// Whether the service starts at boot
    fn enabled(&self) -> Result<bool>;

    /// Whether the service is currently running
    fn running(&self) -> Result<bool>;
}

/// Provider of probes for every resource kind
///
/// Each call resolves a fresh probe. `id` is the display identity of the
/// resource asking, for probe-side logging; `name` is what gets looked up.
pub trait System: Send + Sync {
    fn package(&self, id: &str, name: &str, config: &Config) -> Box<dyn PackageProbe>;

    fn service(&self, id: &str, name: &str, config: &Config) -> Box<dyn ServiceProbe>;
}
