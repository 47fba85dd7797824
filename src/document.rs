//! Declaration documents
//!
//! A document maps type keys to entries keyed by identifier:
//!
//! ```toml
//! [package.nginx]
//! installed = true
//! versions = ["1.24.0"]
//!
//! [service.sshd]
//! enabled = true
//! running = true
//! ```
//!
//! Entries stay untyped here; [`crate::Registry::parse`] turns them into
//! resources.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::resource::Resource;

/// `type key -> id -> entry`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    kinds: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Add or replace the entry for `resource`
    pub fn insert(&mut self, resource: &dyn Resource) -> Result<()> {
        let entry = resource.encode()?;
        self.kinds
            .entry(resource.type_key().to_string())
            .or_default()
            .insert(resource.id().to_string(), entry);
        Ok(())
    }

    /// Type keys present in the document
    pub fn type_keys(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// `(type key, id, entry)` for every entry, grouped by type key
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.kinds.iter().flat_map(|(key, entries)| {
            entries
                .iter()
                .map(move |(id, entry)| (key.as_str(), id.as_str(), entry))
        })
    }

    pub fn get(&self, key: &str, id: &str) -> Option<&Value> {
        self.kinds.get(key).and_then(|entries| entries.get(id))
    }

    /// Number of entries across all kinds
    pub fn len(&self) -> usize {
        self.kinds.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::Registry;
    use crate::resource::{Package, Service};
    use crate::system::System;
    use crate::testing::{FakePackage, FakeSystem};
    use serde_json::json;

    const DECLARATIONS: &str = r#"
[package.nginx]
installed = true
versions = ["1.24.0"]

[package.web]
name = "apache2"
installed = true
retry = true
retry_delay = 2

[service.sshd]
running = true
"#;

    #[test]
    fn test_parse_toml_through_registry() {
        let document = Document::from_toml_str(DECLARATIONS).unwrap();
        assert_eq!(document.len(), 3);

        let resources = Registry::builtin().unwrap().parse(&document).unwrap();
        let ids: Vec<_> = resources.iter().map(|r| r.identity()).collect();
        assert_eq!(ids, vec!["nginx", "web: apache2", "sshd"]);
        assert_eq!(resources[1].name(), "apache2");
        assert_eq!(resources[2].type_key(), "service");
    }

    #[test]
    fn test_insert_round_trips_through_json() {
        let mut document = Document::new();
        document
            .insert(&Package::new("pkg1").with_name("nginx"))
            .unwrap();
        document
            .insert(&Service::new("sshd").with_enabled(true))
            .unwrap();

        let json = document.to_json_string_pretty().unwrap();
        let parsed = Document::from_json_str(&json).unwrap();
        assert_eq!(parsed, document);
        assert_eq!(
            parsed.get("package", "pkg1"),
            Some(&json!({ "name": "nginx", "installed": true }))
        );
    }

    #[test]
    fn test_snapshot_to_toml() {
        let system = FakeSystem::new().with_package("curl", FakePackage::installed(&["7.81.0"]));
        let config = Config::default();
        let probe = system.package("curl", "curl", &config);
        let package = Package::build_declaration(probe.as_ref(), &config).unwrap();

        let mut document = Document::new();
        document.insert(&package).unwrap();
        let toml = document.to_toml_string().unwrap();

        let resources = Registry::builtin()
            .unwrap()
            .parse(&Document::from_toml_str(&toml).unwrap())
            .unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].id(), "curl");
        assert_eq!(
            resources[0].encode().unwrap(),
            json!({ "installed": true, "versions": ["7.81.0"] })
        );
    }

    #[test]
    fn test_document_must_be_keyed_by_type() {
        assert!(Document::from_json_str(r#"["nginx"]"#).is_err());
        assert!(Document::from_json_str(r#"{ "package": ["nginx"] }"#).is_err());
    }
}
