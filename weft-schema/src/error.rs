//! Error types for schema resolution.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while resolving manifests or building schemas.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A transitive import could not be fetched from the data source.
    #[error("manifest for dependency '{plugin}@{version}' could not be fetched")]
    MissingManifest { plugin: String, version: String },

    /// A schema referenced something that does not exist or cannot be keyed.
    #[error("invalid reference '{reference}' in plugin '{plugin}': {reason}")]
    InvalidReference {
        reference: String,
        plugin: String,
        reason: String,
    },

    /// The requested plugin is not present in the schema map.
    #[error("plugin not found in schema map: {0}")]
    PluginNotFound(String),
}
