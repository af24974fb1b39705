//! Flattened application state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One flattened entry of a plugin's key-value store. `key` encodes a
/// schema path, possibly containing keyed-collection segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffElement {
    pub key: String,
    pub value: Value,
}

impl DiffElement {
    #[must_use]
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A plugin pinned to one manifest version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginVersion {
    pub name: String,
    pub version: String,
}

impl PluginVersion {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// The flattened state of a workspace: which plugin versions are enabled
/// and, per plugin, the ordered entry list of its store.
///
/// Entry order matters: parents precede their children and collection rows
/// are grouped contiguously, which the re-indexer and the validator's
/// forward scans rely on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationState {
    pub plugins: Vec<PluginVersion>,
    pub store: BTreeMap<String, Vec<DiffElement>>,
}
