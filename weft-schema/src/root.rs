//! Root schema construction.
//!
//! A root schema is the concrete shape of one plugin's store: every named
//! type composed in place, every collection element spliced inline, every
//! `ref<...>` resolved to an explicit node with a key type. Fields are kept
//! in lexically sorted order, which makes the output deterministic and
//! deep-equal across repeated builds.

use crate::error::{SchemaError, SchemaResult};
use crate::expand::{expanded_types_for_plugin, named_entry, qualify_ref_target};
use std::collections::BTreeMap;
use weft_manifest::{
    is_primitive_type, CollectionValues, ManifestNode, SchemaMap, SchemaNode, TypeStruct,
    UNRESOLVED_KEY_TYPE,
};

/// One built root schema per plugin name.
pub type RootSchemaMap = BTreeMap<String, TypeStruct>;

/// Builds the root schema for a single plugin out of `schema_map`.
///
/// Cross-plugin refs come back with `refKeyType` set to the unresolved
/// marker; run [`crate::resolve_deferred_ref_keys`] over the full map to
/// finalize them.
pub fn root_schema_for_plugin(
    schema_map: &SchemaMap,
    plugin_name: &str,
) -> SchemaResult<TypeStruct> {
    let manifest = schema_map
        .get(plugin_name)
        .ok_or_else(|| SchemaError::PluginNotFound(plugin_name.to_string()))?;
    let expanded = expanded_types_for_plugin(schema_map, plugin_name);
    construct_root_schema(&manifest.store, plugin_name, &expanded)
}

/// Builds root schemas for every plugin in the map. Fails on the first
/// plugin whose store cannot be constructed.
pub fn root_schema_map(schema_map: &SchemaMap) -> SchemaResult<RootSchemaMap> {
    let mut out = RootSchemaMap::new();
    for plugin_name in schema_map.keys() {
        out.insert(
            plugin_name.clone(),
            root_schema_for_plugin(schema_map, plugin_name)?,
        );
    }
    Ok(out)
}

/// Recursively concretizes `fields` (a store or type body) against the
/// expanded type table of `plugin_name`.
pub fn construct_root_schema(
    fields: &TypeStruct,
    plugin_name: &str,
    types: &TypeStruct,
) -> SchemaResult<TypeStruct> {
    let mut out = TypeStruct::new();
    for (field, node) in fields {
        let built = match node {
            SchemaNode::Struct(nested) => {
                SchemaNode::Struct(construct_root_schema(nested, plugin_name, types)?)
            }
            SchemaNode::Node(n) if n.is_collection() => {
                build_collection(field, n, plugin_name, types)?
            }
            SchemaNode::Node(n) if n.ref_target().is_some() => {
                build_ref(field, n, plugin_name, types)?
            }
            SchemaNode::Node(n) if n.is_primitive() => SchemaNode::Node(n.clone()),
            SchemaNode::Node(n) => match named_entry(types, &n.ty, plugin_name) {
                Some((_, SchemaNode::Struct(body))) => {
                    SchemaNode::Struct(construct_root_schema(body, plugin_name, types)?)
                }
                Some((qualified, SchemaNode::Node(_))) => {
                    return Err(SchemaError::InvalidReference {
                        reference: qualified,
                        plugin: plugin_name.to_string(),
                        reason: format!("type named by field '{field}' is not an object type"),
                    });
                }
                None => {
                    return Err(SchemaError::InvalidReference {
                        reference: n.ty.clone(),
                        plugin: plugin_name.to_string(),
                        reason: format!("unknown type for field '{field}'"),
                    });
                }
            },
        };
        out.insert(field.clone(), built);
    }
    Ok(out)
}

fn build_collection(
    field: &str,
    n: &ManifestNode,
    plugin_name: &str,
    types: &TypeStruct,
) -> SchemaResult<SchemaNode> {
    if let Some(CollectionValues::TypeName(name)) = &n.values {
        if is_primitive_type(name) {
            return Ok(SchemaNode::Node(collection_node(
                n,
                CollectionValues::TypeName(name.clone()),
            )));
        }
    }

    let mut element = match &n.values {
        Some(CollectionValues::TypeName(name)) => match named_entry(types, name, plugin_name) {
            Some((_, SchemaNode::Struct(body))) => {
                construct_root_schema(body, plugin_name, types)?
            }
            _ => {
                return Err(SchemaError::InvalidReference {
                    reference: name.clone(),
                    plugin: plugin_name.to_string(),
                    reason: format!("unknown element type for collection '{field}'"),
                });
            }
        },
        Some(CollectionValues::Inline(body)) => construct_root_schema(body, plugin_name, types)?,
        None => {
            return Err(SchemaError::InvalidReference {
                reference: field.to_string(),
                plugin: plugin_name.to_string(),
                reason: "collection declares no element type".to_string(),
            });
        }
    };

    // Every list element carries a synthetic identity key; sets are keyed
    // by their own declared key field.
    if n.ty == "array" {
        element.insert(
            "(id)".to_string(),
            SchemaNode::Node(ManifestNode {
                ty: "string".to_string(),
                is_key: Some(true),
                ..Default::default()
            }),
        );
    }

    Ok(SchemaNode::Node(collection_node(
        n,
        CollectionValues::Inline(element),
    )))
}

fn collection_node(n: &ManifestNode, values: CollectionValues) -> ManifestNode {
    let mut out = ManifestNode {
        ty: n.ty.clone(),
        values: Some(values),
        emptyable: Some(n.emptyable.unwrap_or(true)),
        default: n.default.clone(),
        ..Default::default()
    };
    if n.ty == "set" {
        out.bounded = Some(n.bounded.unwrap_or(false));
        out.manual_ordering = Some(n.manual_ordering.unwrap_or(false));
    }
    out
}

fn build_ref(
    field: &str,
    n: &ManifestNode,
    plugin_name: &str,
    types: &TypeStruct,
) -> SchemaResult<SchemaNode> {
    let Some(target) = n.ref_target() else {
        return Ok(SchemaNode::Node(n.clone()));
    };
    let target = qualify_ref_target(target, plugin_name);

    let mut out = ManifestNode {
        ty: "ref".to_string(),
        ref_type: Some(target.clone()),
        is_key: n.is_key,
        nullable: Some(n.nullable.unwrap_or(false)),
        on_delete: Some(n.on_delete.unwrap_or_default()),
        default: n.default.clone(),
        ..Default::default()
    };

    if is_primitive_type(&target) {
        out.ref_key_type = Some(target);
        return Ok(SchemaNode::Node(out));
    }
    if target.starts_with('$') {
        // Points into another plugin's store; the key type is only knowable
        // once that plugin's root schema exists.
        out.ref_key_type = Some(UNRESOLVED_KEY_TYPE.to_string());
        return Ok(SchemaNode::Node(out));
    }

    let Some((qualified, body)) = named_entry(types, &target, plugin_name) else {
        return Err(SchemaError::InvalidReference {
            reference: target,
            plugin: plugin_name.to_string(),
            reason: format!("ref target for field '{field}' is not a known type"),
        });
    };
    let SchemaNode::Struct(body) = body else {
        return Err(SchemaError::InvalidReference {
            reference: qualified,
            plugin: plugin_name.to_string(),
            reason: format!("ref target for field '{field}' is not an object type"),
        });
    };
    let key_type = body.values().find_map(|node| match node {
        SchemaNode::Node(f) if f.is_key == Some(true) => Some(f.ty.clone()),
        _ => None,
    });
    match key_type {
        Some(key_type) => {
            out.ref_type = Some(qualified);
            out.ref_key_type = Some(key_type);
            Ok(SchemaNode::Node(out))
        }
        None => Err(SchemaError::InvalidReference {
            reference: qualified,
            plugin: plugin_name.to_string(),
            reason: format!("ref target for field '{field}' declares no key field"),
        }),
    }
}
