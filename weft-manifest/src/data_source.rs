//! Manifest retrieval seam.
//!
//! The engine never fetches anything itself; hosts hand it a [`DataSource`]
//! and every manifest or binary lookup goes through that trait.

use crate::manifest::Manifest;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

/// Source of plugin manifests and binary existence checks.
///
/// Absence is signalled with `None`/`false`, never an error: a manifest that
/// cannot be produced is an unresolvable dependency, not a crash.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetches the manifest for `name` at `version`. Returns `None` when the
    /// plugin is unknown, or when `disable_downloads` is set and the
    /// manifest is not already available locally.
    async fn get_plugin_manifest(
        &self,
        name: &str,
        version: &str,
        disable_downloads: bool,
    ) -> Option<Manifest>;

    /// Returns whether the binary blob `binary_id` is present.
    async fn check_binary(&self, binary_id: &str) -> bool;
}

/// In-memory [`DataSource`] over pre-fetched manifests and binary ids.
///
/// Hosts that batch-download manifests ahead of time resolve against this;
/// it is also the workhorse of the engine's own tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSource {
    manifests: BTreeMap<String, Manifest>,
    binaries: BTreeSet<String>,
}

impl MemoryDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a manifest under its `(name, version)` identity.
    pub fn insert_manifest(&mut self, manifest: Manifest) {
        self.manifests.insert(manifest.cache_key(), manifest);
    }

    /// Marks a binary id as present.
    pub fn insert_binary(&mut self, binary_id: impl Into<String>) {
        self.binaries.insert(binary_id.into());
    }

    /// Number of registered manifests.
    #[must_use]
    pub fn manifest_count(&self) -> usize {
        self.manifests.len()
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn get_plugin_manifest(
        &self,
        name: &str,
        version: &str,
        _disable_downloads: bool,
    ) -> Option<Manifest> {
        self.manifests.get(&format!("{name}-{version}")).cloned()
    }

    async fn check_binary(&self, binary_id: &str) -> bool {
        self.binaries.contains(binary_id)
    }
}
