//! Dependency resolution over manifest imports.
//!
//! Walks a manifest's import graph through the [`DataSource`], producing
//! transitive closures and a deterministic topological ordering. Import
//! graphs are acyclic by construction; only ref targets may point back at
//! an importer, and those are resolved lazily elsewhere.

use crate::error::{SchemaError, SchemaResult};
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use weft_manifest::{DataSource, Manifest, SchemaMap};

/// Collects `manifests` into a [`SchemaMap`] keyed by plugin name.
#[must_use]
pub fn schema_map_from_manifests(manifests: impl IntoIterator<Item = Manifest>) -> SchemaMap {
    manifests
        .into_iter()
        .map(|manifest| (manifest.name.clone(), manifest))
        .collect()
}

/// Fetches the transitive import closure of `manifest`.
///
/// Depth-first over `imports` in lexical order; the root manifest is always
/// first and each `(name, version)` appears once. Fetches within one call
/// are memoized by `"name-version"` and issued sequentially, so the same
/// identity is never requested twice. A manifest the source cannot produce
/// fails the whole closure with [`SchemaError::MissingManifest`].
pub async fn dependency_closure(
    data_source: &dyn DataSource,
    manifest: &Manifest,
    disable_downloads: bool,
) -> SchemaResult<Vec<Manifest>> {
    let mut memo = HashMap::new();
    closure_step(data_source, manifest.clone(), disable_downloads, &mut memo).await
}

fn closure_step<'a>(
    data_source: &'a dyn DataSource,
    manifest: Manifest,
    disable_downloads: bool,
    memo: &'a mut HashMap<String, Vec<Manifest>>,
) -> BoxFuture<'a, SchemaResult<Vec<Manifest>>> {
    Box::pin(async move {
        let cache_key = manifest.cache_key();
        if let Some(cached) = memo.get(&cache_key) {
            return Ok(cached.clone());
        }
        let imports = manifest.imports.clone();
        let mut seen: HashSet<String> = HashSet::from([cache_key.clone()]);
        let mut closure = vec![manifest];
        for (import_name, import_version) in &imports {
            debug!(plugin = %import_name, version = %import_version, "fetching imported manifest");
            let imported = data_source
                .get_plugin_manifest(import_name, import_version, disable_downloads)
                .await
                .ok_or_else(|| SchemaError::MissingManifest {
                    plugin: import_name.clone(),
                    version: import_version.clone(),
                })?;
            for dep in closure_step(data_source, imported, disable_downloads, &mut *memo).await? {
                if seen.insert(dep.cache_key()) {
                    closure.push(dep);
                }
            }
        }
        memo.insert(cache_key, closure.clone());
        Ok(closure)
    })
}

/// All plugin names transitively imported by `plugin_name`, depth-first
/// over the schema map.
///
/// The output is not deduplicated: a plugin reachable along several import
/// paths appears once per path. Callers that need uniqueness dedupe
/// themselves.
#[must_use]
pub fn upstream_dependency_names(schema_map: &SchemaMap, plugin_name: &str) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(manifest) = schema_map.get(plugin_name) {
        for import_name in manifest.imports.keys() {
            names.push(import_name.clone());
            names.extend(upstream_dependency_names(schema_map, import_name));
        }
    }
    names
}

/// Orders `manifests` so every import precedes its importers.
///
/// Manifests are pre-sorted lexically by name, which makes the relative
/// order of mutually independent plugins deterministic. Each manifest's
/// upstream dependencies are recursively sorted and emitted first; a
/// visited set keeps the output duplicate-free.
#[must_use]
pub fn topological_sort(manifests: Vec<Manifest>) -> Vec<Manifest> {
    let mut ordered = manifests;
    ordered.sort_by(|a, b| a.name.cmp(&b.name));
    let schema_map = schema_map_from_manifests(ordered.clone());
    let mut visited: HashSet<String> = HashSet::new();
    let mut sorted = Vec::new();
    for manifest in ordered {
        if visited.contains(&manifest.name) {
            continue;
        }
        let upstream: Vec<Manifest> = upstream_dependency_names(&schema_map, &manifest.name)
            .into_iter()
            .filter_map(|name| schema_map.get(&name).cloned())
            .collect();
        for dep in topological_sort(upstream) {
            if visited.insert(dep.name.clone()) {
                sorted.push(dep);
            }
        }
        visited.insert(manifest.name.clone());
        sorted.push(manifest);
    }
    sorted
}
