//! Plugin manifest model for the weft schema engine.
//!
//! This crate defines the types every engine crate shares:
//! - Manifests, schema nodes, and the store shape plugins declare
//! - Structural manifest validation (key rules, local type cycles)
//! - The async [`DataSource`] seam hosts implement to supply manifests
//!
//! Schema structs are ordered maps, so every traversal over a schema visits
//! keys lexically and every serialized schema is deterministic.

mod data_source;
mod manifest;

pub use data_source::{DataSource, MemoryDataSource};
pub use manifest::{
    is_primitive_type, CollectionValues, Manifest, ManifestNode, OnDelete, SchemaMap, SchemaNode,
    TypeStruct, PRIMITIVE_TYPES, UNRESOLVED_KEY_TYPE,
};

/// Result type alias using the crate's error type.
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Errors reported by manifest validation.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("set at '{0}' must declare exactly one key field")]
    MissingKey(String),

    #[error("collection element at '{0}' declares more than one key field")]
    TooManyKeys(String),

    #[error("array at '{0}' must not declare a key field (element ids are assigned)")]
    KeyedArray(String),

    #[error("key field '{field}' at '{path}' has unkeyable type '{ty}'")]
    UnkeyableType {
        path: String,
        field: String,
        ty: String,
    },

    #[error("named type '{0}' is part of a reference cycle")]
    CyclicType(String),
}
