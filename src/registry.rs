//! Resource kind registry
//!
//! Maps declaration type keys ("package", "service") to prototype
//! instances used to decode entries. The registry is built once, before
//! any declaration is parsed, and is read-only afterwards.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::resource::{BoxedResource, Package, Service};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Table of known resource kinds
#[derive(Debug, Default)]
pub struct Registry {
    kinds: BTreeMap<&'static str, BoxedResource>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every kind shipped in this crate
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(Package::default()))?;
        registry.register(Box::new(Service::default()))?;
        Ok(registry)
    }

    /// Register a kind by its prototype
    ///
    /// Fails if another kind already claimed the same type key.
    pub fn register(&mut self, prototype: BoxedResource) -> Result<()> {
        let key = prototype.type_key();
        if self.kinds.contains_key(key) {
            return Err(Error::DuplicateKind {
                key: key.to_string(),
            });
        }
        log::debug!("Registered resource kind {key} ({})", prototype.type_name());
        self.kinds.insert(key, prototype);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.kinds.contains_key(key)
    }

    /// Registered type keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.keys().copied()
    }

    /// Decode one declaration entry and assign its identifier
    pub fn instantiate(&self, key: &str, id: &str, entry: Value) -> Result<BoxedResource> {
        let prototype = self.kinds.get(key).ok_or_else(|| Error::UnknownKind {
            key: key.to_string(),
        })?;
        let mut resource = prototype
            .decode(entry)
            .map_err(|source| Error::InvalidDeclaration {
                key: key.to_string(),
                id: id.to_string(),
                source,
            })?;
        resource.set_id(id);
        Ok(resource)
    }

    /// Instantiate every entry of a document
    ///
    /// Unknown type keys are rejected before any entry is decoded.
    pub fn parse(&self, document: &Document) -> Result<Vec<BoxedResource>> {
        if let Some(key) = document.type_keys().find(|key| !self.contains(key)) {
            return Err(Error::UnknownKind {
                key: key.to_string(),
            });
        }

        document
            .entries()
            .map(|(key, id, entry)| self.instantiate(key, id, entry.clone()))
            .collect()
    }
}

/// Install the process-wide registry
///
/// Must be called exactly once, before declarations are parsed.
pub fn init(registry: Registry) -> Result<&'static Registry> {
    GLOBAL
        .set(registry)
        .map_err(|_| Error::RegistryInitialized)?;
    global()
}

/// The process-wide registry installed by [`init`]
pub fn global() -> Result<&'static Registry> {
    GLOBAL.get().ok_or(Error::RegistryUninitialized)
}
