//! Structural state validation.
//!
//! Walks a plugin's flattened entries against its built root schema and
//! reports rows that violate it: required fields holding null or empty
//! strings, file fields whose binary is gone, and non-emptyable
//! collections with no rows. Validation never fails; a plugin whose
//! schema cannot be built is skipped with a warning and simply absent
//! from the report.

use crate::path::{decode_schema_path, PathPart};
use crate::reindex::re_index_schema_arrays;
use crate::state::{ApplicationState, DiffElement};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;
use weft_manifest::{CollectionValues, DataSource, SchemaMap, SchemaNode, TypeStruct};
use weft_schema::{
    dependency_closure, resolve_deferred_ref_keys, root_schema_for_plugin,
    schema_map_from_manifests, RootSchemaMap,
};

/// Invalid paths per plugin name.
pub type InvalidStateReport = BTreeMap<String, Vec<String>>;

/// Validates every enabled plugin's store and reports invalid paths.
///
/// Root-level invalidities come first, then indexed ones rendered through
/// the re-indexer, in entry order. Plugins whose manifests or schemas
/// cannot be resolved are skipped; failures never cross plugin boundaries.
pub async fn invalid_states(
    data_source: &dyn DataSource,
    application_state: &ApplicationState,
) -> InvalidStateReport {
    let mut schema_map = SchemaMap::new();
    let mut resolved: Vec<&str> = Vec::new();
    for plugin in &application_state.plugins {
        let Some(manifest) = data_source
            .get_plugin_manifest(&plugin.name, &plugin.version, false)
            .await
        else {
            warn!(
                plugin = %plugin.name,
                version = %plugin.version,
                "manifest unavailable, skipping validation"
            );
            continue;
        };
        match dependency_closure(data_source, &manifest, false).await {
            Ok(closure) => {
                schema_map.extend(schema_map_from_manifests(closure));
                resolved.push(&plugin.name);
            }
            Err(error) => {
                warn!(plugin = %plugin.name, %error, "import closure failed, skipping validation");
            }
        }
    }

    let mut root_schemas = RootSchemaMap::new();
    for plugin_name in &resolved {
        match root_schema_for_plugin(&schema_map, plugin_name) {
            Ok(root_schema) => {
                root_schemas.insert((*plugin_name).to_string(), root_schema);
            }
            Err(error) => {
                warn!(plugin = %plugin_name, %error, "root schema failed, skipping validation");
            }
        }
    }
    let root_schemas = resolve_deferred_ref_keys(&root_schemas);

    let empty = Vec::new();
    let mut report = InvalidStateReport::new();
    for (plugin_name, root_schema) in &root_schemas {
        let entries = application_state
            .store
            .get(plugin_name)
            .unwrap_or(&empty);
        let mut paths = invalid_root_states(data_source, root_schema, entries).await;
        let re_indexed = re_index_schema_arrays(entries);
        for position in invalid_state_indices(data_source, root_schema, entries).await {
            if let Some(path) = re_indexed.get(position) {
                paths.push(path.clone());
            }
        }
        report.insert(plugin_name.clone(), paths);
    }
    report
}

/// Checks the plugin-root entry (index 0) and returns the full paths of
/// its invalid fields.
pub async fn invalid_root_states(
    data_source: &dyn DataSource,
    root_schema: &TypeStruct,
    entries: &[DiffElement],
) -> Vec<String> {
    let Some((first, rest)) = entries.split_first() else {
        return Vec::new();
    };
    invalid_fields_at(data_source, root_schema, first, rest)
        .await
        .into_iter()
        .map(|field| format!("{}.{field}", first.key))
        .collect()
}

/// Checks every entry after the plugin root and returns the positions of
/// invalid ones. Callers translate positions back through the re-indexed
/// path list.
pub async fn invalid_state_indices(
    data_source: &dyn DataSource,
    root_schema: &TypeStruct,
    entries: &[DiffElement],
) -> Vec<usize> {
    let mut invalid = Vec::new();
    for (position, entry) in entries.iter().enumerate().skip(1) {
        let Some(fields) = schema_at_key(root_schema, &entry.key) else {
            continue;
        };
        let findings =
            invalid_fields_at(data_source, fields, entry, &entries[position + 1..]).await;
        if !findings.is_empty() {
            invalid.push(position);
        }
    }
    invalid
}

/// Names the immediate child fields of `fields` that `entry` violates.
/// `following` is the tail of the entry list after `entry`, scanned
/// forward for collection child rows.
async fn invalid_fields_at(
    data_source: &dyn DataSource,
    fields: &TypeStruct,
    entry: &DiffElement,
    following: &[DiffElement],
) -> Vec<String> {
    let mut invalid = Vec::new();
    for (field, node) in fields {
        let SchemaNode::Node(n) = node else {
            continue;
        };
        if n.is_collection() {
            if !n.emptyable.unwrap_or(true) && !has_child_rows(&entry.key, field, following) {
                invalid.push(field.clone());
            }
            continue;
        }
        if !n.is_primitive() {
            continue;
        }

        let value = entry.value.get(field);
        let required = n.is_key == Some(true) || n.nullable == Some(false);
        let missing = match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty() && (n.ty == "string" || n.ty == "file"),
            Some(_) => false,
        };
        if required && missing {
            invalid.push(field.clone());
            continue;
        }
        if n.ty == "file" {
            if let Some(Value::String(binary_id)) = value {
                if !binary_id.is_empty() && !data_source.check_binary(binary_id).await {
                    invalid.push(field.clone());
                }
            }
        }
    }
    invalid
}

/// Forward scan for rows of collection `field` under the row at
/// `parent_key`. Stops at the first entry that leaves the parent's
/// subtree; entries are grouped, so nothing past that point can belong
/// to this row.
fn has_child_rows(parent_key: &str, field: &str, following: &[DiffElement]) -> bool {
    let subtree = format!("{parent_key}.");
    let child = format!("{parent_key}.{field}.");
    for entry in following {
        if !entry.key.starts_with(&subtree) {
            break;
        }
        if entry.key.starts_with(&child) {
            return true;
        }
    }
    false
}

/// Locates the schema node a state key addresses, skipping the leading
/// plugin segment. Keyed segments select rows and stay within the
/// collection's element schema.
fn schema_at_key<'a>(root_schema: &'a TypeStruct, key: &str) -> Option<&'a TypeStruct> {
    let mut cursor = root_schema;
    for part in decode_schema_path(key).iter().skip(1) {
        match part {
            PathPart::Field(name) => {
                cursor = match cursor.get(name)? {
                    SchemaNode::Struct(nested) => nested,
                    SchemaNode::Node(n) => match &n.values {
                        Some(CollectionValues::Inline(element)) => element,
                        _ => return None,
                    },
                };
            }
            PathPart::KeyValue { .. } | PathPart::Index(_) => {}
        }
    }
    Some(cursor)
}
