//! Deferred cross-plugin ref-key resolution.
//!
//! Root schemas are built one plugin at a time, so a ref that points into
//! another plugin's store cannot know its key type until every schema in
//! the batch exists. This pass revisits the built map and fills in the
//! deferred markers. Refs that still cannot be resolved keep the marker;
//! downstream consumers treat that as unknown rather than failing.

use crate::root::RootSchemaMap;
use weft_manifest::{CollectionValues, SchemaNode, TypeStruct, UNRESOLVED_KEY_TYPE};

/// Returns a copy of `root_schemas` with every resolvable deferred
/// `refKeyType` replaced by the key type found in the referenced plugin's
/// schema.
#[must_use]
pub fn resolve_deferred_ref_keys(root_schemas: &RootSchemaMap) -> RootSchemaMap {
    root_schemas
        .iter()
        .map(|(plugin, schema)| (plugin.clone(), resolve_struct(schema, root_schemas)))
        .collect()
}

fn resolve_struct(fields: &TypeStruct, root_schemas: &RootSchemaMap) -> TypeStruct {
    fields
        .iter()
        .map(|(field, node)| (field.clone(), resolve_node(node, root_schemas)))
        .collect()
}

fn resolve_node(node: &SchemaNode, root_schemas: &RootSchemaMap) -> SchemaNode {
    match node {
        SchemaNode::Struct(fields) => SchemaNode::Struct(resolve_struct(fields, root_schemas)),
        SchemaNode::Node(n) => {
            let mut out = n.clone();
            if let Some(CollectionValues::Inline(element)) = &n.values {
                out.values = Some(CollectionValues::Inline(resolve_struct(
                    element,
                    root_schemas,
                )));
            }
            if out.ref_key_type.as_deref() == Some(UNRESOLVED_KEY_TYPE) {
                let resolved = out
                    .ref_type
                    .as_deref()
                    .and_then(|reference| lookup_key_type(reference, root_schemas));
                if let Some(key_type) = resolved {
                    out.ref_key_type = Some(key_type);
                }
            }
            SchemaNode::Node(out)
        }
    }
}

/// Walks `"$(<plugin>)<.path>*"` through the referenced plugin's schema and
/// returns the declared type of the key field found at the end.
fn lookup_key_type(reference: &str, root_schemas: &RootSchemaMap) -> Option<String> {
    let (plugin, segments) = parse_ref_path(reference)?;
    let mut cursor = root_schemas.get(plugin)?;
    for segment in segments {
        cursor = descend(cursor, segment)?;
    }
    cursor.values().find_map(|node| match node {
        SchemaNode::Node(f) if f.is_key == Some(true) => Some(f.ty.clone()),
        _ => None,
    })
}

fn parse_ref_path(reference: &str) -> Option<(&str, Vec<&str>)> {
    let rest = reference.strip_prefix("$(")?;
    let close = rest.find(')')?;
    let plugin = &rest[..close];
    let tail = &rest[close + 1..];
    if tail.is_empty() {
        return Some((plugin, Vec::new()));
    }
    let tail = tail.strip_prefix('.')?;
    Some((plugin, tail.split('.').collect()))
}

/// Steps one path segment down; collections step into their element schema.
fn descend<'a>(fields: &'a TypeStruct, segment: &str) -> Option<&'a TypeStruct> {
    match fields.get(segment)? {
        SchemaNode::Struct(nested) => Some(nested),
        SchemaNode::Node(n) => match &n.values {
            Some(CollectionValues::Inline(element)) => Some(element),
            _ => None,
        },
    }
}
