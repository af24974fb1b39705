//! Tests for type expansion and root schema construction across plugin
//! boundaries.

use pretty_assertions::assert_eq;
use weft_manifest::{
    CollectionValues, Manifest, SchemaMap, SchemaNode, UNRESOLVED_KEY_TYPE,
};
use weft_schema::{
    expanded_types_for_plugin, resolve_deferred_ref_keys, root_schema_for_plugin,
    root_schema_map,
};

fn manifest(value: serde_json::Value) -> Manifest {
    serde_json::from_value(value).unwrap()
}

fn schema_map(values: Vec<serde_json::Value>) -> SchemaMap {
    let mut map = SchemaMap::new();
    for value in values {
        let manifest = manifest(value);
        map.insert(manifest.name.clone(), manifest);
    }
    map
}

/// notes -> palette -> base, with types declared at every level.
fn layered_map() -> SchemaMap {
    schema_map(vec![
        serde_json::json!({
            "name": "base",
            "version": "0.0.1",
            "displayName": "Base",
            "imports": {},
            "types": {
                "Unit": {
                    "symbol": { "type": "string", "isKey": true }
                }
            },
            "store": {}
        }),
        serde_json::json!({
            "name": "palette",
            "version": "0.0.1",
            "displayName": "Palette",
            "imports": { "base": "0.0.1" },
            "types": {
                "Color": {
                    "id": { "type": "string", "isKey": true },
                    "hex": { "type": "string" }
                }
            },
            "store": {
                "colors": { "type": "set", "values": "Color" }
            }
        }),
        serde_json::json!({
            "name": "notes",
            "version": "0.0.1",
            "displayName": "Notes",
            "imports": { "palette": "0.0.1" },
            "types": {},
            "store": {
                "entries": {
                    "type": "array",
                    "values": {
                        "title": { "type": "string" },
                        "color": { "type": "ref<$(palette).colors>", "nullable": true }
                    }
                }
            }
        }),
    ])
}

// ── expanded_types_for_plugin ───────────────────────────────────

#[test]
fn expansion_reaches_transitive_imports() {
    let map = layered_map();
    let expanded = expanded_types_for_plugin(&map, "notes");

    // notes never imports base directly; its types arrive through palette.
    assert!(expanded.contains_key("palette.Color"));
    assert!(expanded.contains_key("base.Unit"));
}

#[test]
fn expansion_ignores_plugins_outside_the_import_graph() {
    let map = layered_map();
    let expanded = expanded_types_for_plugin(&map, "palette");

    assert!(expanded.contains_key("base.Unit"));
    assert!(!expanded.contains_key("notes.Entry"));
}

// ── root_schema_for_plugin ──────────────────────────────────────

#[test]
fn building_twice_yields_deep_equal_output() {
    let map = layered_map();
    let first = root_schema_for_plugin(&map, "notes").unwrap();
    let second = root_schema_for_plugin(&map, "notes").unwrap();
    assert_eq!(first, second);

    let json_first = serde_json::to_string(&first).unwrap();
    let json_second = serde_json::to_string(&second).unwrap();
    assert_eq!(json_first, json_second);
}

#[test]
fn inline_list_elements_are_concretized() {
    let map = layered_map();
    let root = root_schema_for_plugin(&map, "notes").unwrap();

    let entries = root["entries"].as_node().unwrap();
    let Some(CollectionValues::Inline(element)) = &entries.values else {
        panic!("expected inline element schema");
    };
    assert!(element.contains_key("(id)"));
    let color = element["color"].as_node().unwrap();
    assert_eq!(color.ty, "ref");
    assert_eq!(color.ref_type.as_deref(), Some("$(palette).colors"));
    assert_eq!(color.ref_key_type.as_deref(), Some(UNRESOLVED_KEY_TYPE));
    assert_eq!(color.nullable, Some(true));
}

// ── resolve_deferred_ref_keys ───────────────────────────────────

#[test]
fn deferred_keys_resolve_against_other_schemas() {
    let map = layered_map();
    let roots = root_schema_map(&map).unwrap();
    let resolved = resolve_deferred_ref_keys(&roots);

    let entries = resolved["notes"]["entries"].as_node().unwrap();
    let Some(CollectionValues::Inline(element)) = &entries.values else {
        panic!("expected inline element schema");
    };
    // palette.colors is keyed by Color.id, a string.
    let color = element["color"].as_node().unwrap();
    assert_eq!(color.ref_key_type.as_deref(), Some("string"));
}

#[test]
fn unresolvable_keys_keep_the_marker() {
    let map = schema_map(vec![serde_json::json!({
        "name": "notes",
        "version": "0.0.1",
        "displayName": "Notes",
        "imports": {},
        "types": {},
        "store": {
            "pick": { "type": "ref<$(ghost).rows>" }
        }
    })]);
    let roots = root_schema_map(&map).unwrap();
    let resolved = resolve_deferred_ref_keys(&roots);

    let pick = resolved["notes"]["pick"].as_node().unwrap();
    assert_eq!(pick.ref_key_type.as_deref(), Some(UNRESOLVED_KEY_TYPE));
}

#[test]
fn resolution_leaves_unrelated_nodes_untouched() {
    let map = layered_map();
    let roots = root_schema_map(&map).unwrap();
    let resolved = resolve_deferred_ref_keys(&roots);
    assert_eq!(roots["palette"], resolved["palette"]);
}

// ── cross-plugin element reuse ──────────────────────────────────

#[test]
fn imported_types_back_collections_in_the_store() {
    let map = schema_map(vec![
        serde_json::json!({
            "name": "palette",
            "version": "0.0.1",
            "displayName": "Palette",
            "imports": {},
            "types": {
                "Color": {
                    "id": { "type": "string", "isKey": true },
                    "hex": { "type": "string" }
                }
            },
            "store": {}
        }),
        serde_json::json!({
            "name": "notes",
            "version": "0.0.1",
            "displayName": "Notes",
            "imports": { "palette": "0.0.1" },
            "types": {},
            "store": {
                "swatches": { "type": "array", "values": "palette.Color" }
            }
        }),
    ]);
    let root = root_schema_for_plugin(&map, "notes").unwrap();
    let swatches = root["swatches"].as_node().unwrap();
    let Some(CollectionValues::Inline(element)) = &swatches.values else {
        panic!("expected inline element schema");
    };
    assert_eq!(element["hex"].as_node().unwrap().ty, "string");
    assert!(element.contains_key("(id)"));
    match &element["id"] {
        SchemaNode::Node(id) => assert_eq!(id.is_key, Some(true)),
        other => panic!("unexpected node: {other:?}"),
    }
}

#[test]
fn keyless_imported_set_elements_still_build() {
    // Key cardinality is a manifest-validation concern at the declaring
    // plugin's own usage sites; the builder only requires that the element
    // type exists and is object-shaped.
    let map = schema_map(vec![
        serde_json::json!({
            "name": "palette",
            "version": "0.0.1",
            "displayName": "Palette",
            "imports": {},
            "types": {
                "Swatch": {
                    "hex": { "type": "string" }
                }
            },
            "store": {}
        }),
        serde_json::json!({
            "name": "notes",
            "version": "0.0.1",
            "displayName": "Notes",
            "imports": { "palette": "0.0.1" },
            "types": {},
            "store": {
                "swatches": { "type": "set", "values": "palette.Swatch" }
            }
        }),
    ]);
    let root = root_schema_for_plugin(&map, "notes").unwrap();
    let swatches = root["swatches"].as_node().unwrap();
    let Some(CollectionValues::Inline(element)) = &swatches.values else {
        panic!("expected inline element schema");
    };
    assert!(!element.contains_key("(id)"));
    assert_eq!(element["hex"].as_node().unwrap().ty, "string");
}
