//! Structural errors.
//!
//! Only problems that make the declared configuration untrustworthy are
//! raised as errors. Everything that goes wrong while checking a single
//! resource is recorded in its test results instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hostcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up or parsing declarations.
#[derive(Debug, Error)]
pub enum Error {
    /// Two resource kinds claimed the same type key
    #[error("resource type key registered twice: {key}")]
    DuplicateKind {
        /// The contested type key
        key: String,
    },

    /// A declaration referenced a type key nobody registered
    #[error("unknown resource type: {key}")]
    UnknownKind {
        /// The unrecognized type key
        key: String,
    },

    /// A declaration entry did not match its kind's schema
    #[error("invalid {key} declaration {id:?}: {source}")]
    InvalidDeclaration {
        /// Type key of the entry
        key: String,
        /// Identifier of the entry
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The process-wide registry was installed twice
    #[error("resource registry already initialized")]
    RegistryInitialized,

    /// The process-wide registry was used before installation
    #[error("resource registry not initialized")]
    RegistryUninitialized,

    /// Config file could not be read
    #[error("could not read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config or declaration TOML was malformed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Declaration could not be encoded
    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    /// JSON parsing or encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Worker pool could not be built
    #[error("failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offender() {
        let err = Error::DuplicateKind {
            key: "package".to_string(),
        };
        assert_eq!(err.to_string(), "resource type key registered twice: package");

        let err = Error::UnknownKind {
            key: "gizmo".to_string(),
        };
        assert!(err.to_string().contains("gizmo"));
    }
}
