//! Structural root-schema compatibility.

use weft_manifest::{CollectionValues, ManifestNode, SchemaNode, TypeStruct};

/// True when every field of `from` exists in `into` with a structurally
/// compatible shape, so state written under `from` can be carried into
/// `into` without loss. Purely structural; never touches a data source.
///
/// Nullability may widen from `from` to `into` but never narrow, and a
/// non-emptyable collection in `into` cannot accept an emptyable one from
/// `from`. Ref key types resolved to the unknown marker only match the
/// unknown marker.
#[must_use]
pub fn is_compatible(from: &TypeStruct, into: &TypeStruct) -> bool {
    from.iter().all(|(field, from_node)| {
        into.get(field)
            .is_some_and(|into_node| node_compatible(from_node, into_node))
    })
}

fn node_compatible(from: &SchemaNode, into: &SchemaNode) -> bool {
    match (from, into) {
        (SchemaNode::Struct(from), SchemaNode::Struct(into)) => is_compatible(from, into),
        (SchemaNode::Node(from), SchemaNode::Node(into)) => concrete_compatible(from, into),
        _ => false,
    }
}

fn concrete_compatible(from: &ManifestNode, into: &ManifestNode) -> bool {
    if from.ty != into.ty {
        return false;
    }
    if required(into) && !required(from) {
        return false;
    }
    if from.is_collection() {
        if !into.emptyable.unwrap_or(true) && from.emptyable.unwrap_or(true) {
            return false;
        }
        return values_compatible(from.values.as_ref(), into.values.as_ref());
    }
    if from.ty == "ref" {
        return from.ref_type == into.ref_type && from.ref_key_type == into.ref_key_type;
    }
    true
}

fn required(node: &ManifestNode) -> bool {
    node.is_key == Some(true) || node.nullable == Some(false)
}

fn values_compatible(from: Option<&CollectionValues>, into: Option<&CollectionValues>) -> bool {
    match (from, into) {
        (Some(CollectionValues::TypeName(from)), Some(CollectionValues::TypeName(into))) => {
            from == into
        }
        (Some(CollectionValues::Inline(from)), Some(CollectionValues::Inline(into))) => {
            is_compatible(from, into)
        }
        (None, None) => true,
        _ => false,
    }
}
