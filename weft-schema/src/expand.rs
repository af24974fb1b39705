//! Named-type expansion.
//!
//! Collects every type visible to a plugin (its own and its upstream
//! imports') into one flat table keyed `"<owner>.<TypeName>"`, then rewrites
//! each entry so collection element names are namespaced, referenced types
//! are spliced in, and ref targets carry explicit plugin heads.

use crate::resolve::upstream_dependency_names;
use std::collections::HashSet;
use weft_manifest::{
    is_primitive_type, CollectionValues, ManifestNode, SchemaMap, SchemaNode, TypeStruct,
};

/// Flat table of the named types visible to `plugin_name`, fully expanded.
///
/// Keys are `"<owner>.<TypeName>"`; declarations already carrying the
/// owner prefix keep it. Plugins missing from the map contribute nothing.
/// Expansion recurses through referenced type bodies, so manifests must be
/// cycle-free (see `Manifest::validate`).
#[must_use]
pub fn expanded_types_for_plugin(schema_map: &SchemaMap, plugin_name: &str) -> TypeStruct {
    let mut owners = vec![plugin_name.to_string()];
    owners.extend(upstream_dependency_names(schema_map, plugin_name));

    // First pass: qualify every declared type under its owner, untouched.
    let mut raw = TypeStruct::new();
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut seen = HashSet::new();
    for owner in owners {
        if !seen.insert(owner.clone()) {
            continue;
        }
        let Some(manifest) = schema_map.get(&owner) else {
            continue;
        };
        for (type_name, body) in &manifest.types {
            let key = if type_name.starts_with(&format!("{owner}.")) {
                type_name.clone()
            } else {
                format!("{owner}.{type_name}")
            };
            entries.push((key.clone(), owner.clone()));
            raw.insert(key, body.clone());
        }
    }

    // Second pass: expand each entry against the raw table, under its owner.
    let mut expanded = TypeStruct::new();
    for (key, owner) in entries {
        let Some(body) = raw.get(&key) else { continue };
        expanded.insert(key.clone(), expand_node(body, &owner, &raw));
    }
    expanded
}

/// Expands every field of `types` under `owning_plugin` against
/// `imported_types`, the flat table of visible type declarations.
#[must_use]
pub fn iterate_schema_types(
    types: &TypeStruct,
    owning_plugin: &str,
    imported_types: &TypeStruct,
) -> TypeStruct {
    types
        .iter()
        .map(|(field, node)| {
            (
                field.clone(),
                expand_node(node, owning_plugin, imported_types),
            )
        })
        .collect()
}

fn expand_node(node: &SchemaNode, owning_plugin: &str, imported_types: &TypeStruct) -> SchemaNode {
    match node {
        SchemaNode::Struct(fields) => {
            SchemaNode::Struct(iterate_schema_types(fields, owning_plugin, imported_types))
        }
        SchemaNode::Node(n) if n.is_collection() => {
            expand_collection(n, owning_plugin, imported_types)
        }
        SchemaNode::Node(n) if n.ref_target().is_some() => {
            SchemaNode::Node(rewrite_ref(n, owning_plugin))
        }
        SchemaNode::Node(n) if n.is_primitive() => SchemaNode::Node(n.clone()),
        SchemaNode::Node(n) => {
            // A field typed as a named type composes that type's body.
            match named_body(imported_types, &n.ty, owning_plugin) {
                Some(SchemaNode::Struct(fields)) => {
                    SchemaNode::Struct(iterate_schema_types(fields, owning_plugin, imported_types))
                }
                _ => SchemaNode::Node(n.clone()),
            }
        }
    }
}

fn expand_collection(
    n: &ManifestNode,
    owning_plugin: &str,
    imported_types: &TypeStruct,
) -> SchemaNode {
    match &n.values {
        // Primitive elements are terminal; pin collection defaults here.
        Some(CollectionValues::TypeName(name)) if is_primitive_type(name) => {
            let mut out = ManifestNode {
                ty: n.ty.clone(),
                values: Some(CollectionValues::TypeName(name.clone())),
                emptyable: Some(n.emptyable.unwrap_or(true)),
                default: n.default.clone(),
                ..Default::default()
            };
            if n.ty == "set" {
                out.bounded = Some(n.bounded.unwrap_or(false));
                out.manual_ordering = Some(n.manual_ordering.unwrap_or(false));
            }
            SchemaNode::Node(out)
        }
        // Unqualified names gain the owner namespace and stay by-name;
        // the root schema builder resolves them.
        Some(CollectionValues::TypeName(name)) if !name.contains('.') => {
            let mut out = n.clone();
            out.values = Some(CollectionValues::TypeName(format!("{owning_plugin}.{name}")));
            SchemaNode::Node(out)
        }
        Some(CollectionValues::TypeName(name)) => {
            match named_body(imported_types, name, owning_plugin) {
                Some(SchemaNode::Struct(fields)) => {
                    let mut out = n.clone();
                    out.values = Some(CollectionValues::Inline(iterate_schema_types(
                        fields,
                        owning_plugin,
                        imported_types,
                    )));
                    SchemaNode::Node(out)
                }
                _ => SchemaNode::Node(n.clone()),
            }
        }
        Some(CollectionValues::Inline(fields)) => {
            let mut out = n.clone();
            out.values = Some(CollectionValues::Inline(iterate_schema_types(
                fields,
                owning_plugin,
                imported_types,
            )));
            SchemaNode::Node(out)
        }
        None => SchemaNode::Node(n.clone()),
    }
}

/// Rewrites the inner target of a `ref<...>` declaration under its owner.
fn rewrite_ref(n: &ManifestNode, owning_plugin: &str) -> ManifestNode {
    let Some(target) = n.ref_target() else {
        return n.clone();
    };
    let rewritten = qualify_ref_target(target, owning_plugin);
    let mut out = n.clone();
    out.ty = format!("ref<{rewritten}>");
    out
}

/// Namespaces a ref target: primitives stay as written, a bare `$` head
/// becomes `$(<owner>)`, an unqualified type name gains the owner prefix,
/// and anything already namespaced is untouched.
pub(crate) fn qualify_ref_target(target: &str, owning_plugin: &str) -> String {
    if is_primitive_type(target) {
        return target.to_string();
    }
    if target == "$" {
        return format!("$({owning_plugin})");
    }
    if let Some(rest) = target.strip_prefix("$.") {
        return format!("$({owning_plugin}).{rest}");
    }
    if target.starts_with('$') {
        return target.to_string();
    }
    if !target.contains('.') {
        return format!("{owning_plugin}.{target}");
    }
    target.to_string()
}

/// Looks up `name` in the flat type table, directly or owner-qualified,
/// returning the canonical key it resolved under.
pub(crate) fn named_entry<'a>(
    types: &'a TypeStruct,
    name: &str,
    owning_plugin: &str,
) -> Option<(String, &'a SchemaNode)> {
    if let Some((key, body)) = types.get_key_value(name) {
        return Some((key.clone(), body));
    }
    types
        .get_key_value(&format!("{owning_plugin}.{name}"))
        .map(|(key, body)| (key.clone(), body))
}

pub(crate) fn named_body<'a>(
    types: &'a TypeStruct,
    name: &str,
    owning_plugin: &str,
) -> Option<&'a SchemaNode> {
    named_entry(types, name, owning_plugin).map(|(_, body)| body)
}
