//! Tests for state validation — required fields, binary checks,
//! non-emptyable collections, and the per-plugin report.

use pretty_assertions::assert_eq;
use serde_json::json;
use weft_manifest::{Manifest, MemoryDataSource, TypeStruct};
use weft_schema::{root_schema_for_plugin, schema_map_from_manifests};
use weft_state::{
    invalid_root_states, invalid_state_indices, invalid_states, ApplicationState, DiffElement,
    PluginVersion,
};

fn journal_manifest() -> Manifest {
    serde_json::from_value(json!({
        "name": "journal",
        "version": "1.0.0",
        "displayName": "Journal",
        "imports": {},
        "types": {
            "Tag": {
                "label": { "type": "string", "isKey": true }
            }
        },
        "store": {
            "attachment": { "type": "file", "nullable": true },
            "count": { "type": "int", "nullable": false },
            "entries": {
                "type": "array",
                "values": {
                    "name": { "type": "string", "isKey": true },
                    "tags": { "type": "set", "values": "Tag", "emptyable": false }
                }
            }
        }
    }))
    .unwrap()
}

fn journal_root_schema() -> TypeStruct {
    let schema_map = schema_map_from_manifests([journal_manifest()]);
    root_schema_for_plugin(&schema_map, "journal").unwrap()
}

fn entry(key: &str, value: serde_json::Value) -> DiffElement {
    DiffElement::new(key, value)
}

// ── invalid_root_states ─────────────────────────────────────────

#[tokio::test]
async fn null_required_primitive_is_invalid() {
    let source = MemoryDataSource::new();
    let root_schema = journal_root_schema();
    let entries = vec![entry("$(journal)", json!({ "count": null }))];

    let paths = invalid_root_states(&source, &root_schema, &entries).await;
    assert_eq!(paths, vec!["$(journal).count"]);
}

#[tokio::test]
async fn zero_is_a_valid_required_int() {
    let source = MemoryDataSource::new();
    let root_schema = journal_root_schema();
    let entries = vec![entry("$(journal)", json!({ "count": 0 }))];

    let paths = invalid_root_states(&source, &root_schema, &entries).await;
    assert!(paths.is_empty());
}

#[tokio::test]
async fn missing_member_counts_as_null() {
    let source = MemoryDataSource::new();
    let root_schema = journal_root_schema();
    let entries = vec![entry("$(journal)", json!({}))];

    let paths = invalid_root_states(&source, &root_schema, &entries).await;
    assert_eq!(paths, vec!["$(journal).count"]);
}

#[tokio::test]
async fn unregistered_binary_is_invalid() {
    let mut source = MemoryDataSource::new();
    let root_schema = journal_root_schema();
    let entries = vec![entry(
        "$(journal)",
        json!({ "attachment": "sha256:doc", "count": 1 }),
    )];

    let paths = invalid_root_states(&source, &root_schema, &entries).await;
    assert_eq!(paths, vec!["$(journal).attachment"]);

    source.insert_binary("sha256:doc");
    let paths = invalid_root_states(&source, &root_schema, &entries).await;
    assert!(paths.is_empty());
}

#[tokio::test]
async fn nullable_file_may_stay_null() {
    let source = MemoryDataSource::new();
    let root_schema = journal_root_schema();
    let entries = vec![entry(
        "$(journal)",
        json!({ "attachment": null, "count": 1 }),
    )];

    let paths = invalid_root_states(&source, &root_schema, &entries).await;
    assert!(paths.is_empty());
}

// ── invalid_state_indices ───────────────────────────────────────

#[tokio::test]
async fn rows_with_children_for_required_collections_are_valid() {
    let source = MemoryDataSource::new();
    let root_schema = journal_root_schema();
    let entries = vec![
        entry("$(journal)", json!({ "count": 1 })),
        entry(
            "$(journal).entries.(id)<x>",
            json!({ "(id)": "x", "name": "first" }),
        ),
        entry(
            "$(journal).entries.(id)<x>.tags.label<urgent>",
            json!({ "label": "urgent" }),
        ),
    ];

    let positions = invalid_state_indices(&source, &root_schema, &entries).await;
    assert!(positions.is_empty());
}

#[tokio::test]
async fn empty_non_emptyable_collection_flags_the_row() {
    let source = MemoryDataSource::new();
    let root_schema = journal_root_schema();
    let entries = vec![
        entry("$(journal)", json!({ "count": 1 })),
        entry(
            "$(journal).entries.(id)<x>",
            json!({ "(id)": "x", "name": "first" }),
        ),
    ];

    let positions = invalid_state_indices(&source, &root_schema, &entries).await;
    assert_eq!(positions, vec![1]);
}

#[tokio::test]
async fn sibling_rows_do_not_satisfy_the_scan() {
    let source = MemoryDataSource::new();
    let root_schema = journal_root_schema();
    // x has no tags rows; the scan must stop at y rather than borrow its tag.
    let entries = vec![
        entry("$(journal)", json!({ "count": 1 })),
        entry(
            "$(journal).entries.(id)<x>",
            json!({ "(id)": "x", "name": "first" }),
        ),
        entry(
            "$(journal).entries.(id)<y>",
            json!({ "(id)": "y", "name": "second" }),
        ),
        entry(
            "$(journal).entries.(id)<y>.tags.label<urgent>",
            json!({ "label": "urgent" }),
        ),
    ];

    let positions = invalid_state_indices(&source, &root_schema, &entries).await;
    assert_eq!(positions, vec![1]);
}

#[tokio::test]
async fn empty_required_key_string_flags_the_row() {
    let source = MemoryDataSource::new();
    let root_schema = journal_root_schema();
    let entries = vec![
        entry("$(journal)", json!({ "count": 1 })),
        entry(
            "$(journal).entries.(id)<x>",
            json!({ "(id)": "x", "name": "" }),
        ),
        entry(
            "$(journal).entries.(id)<x>.tags.label<urgent>",
            json!({ "label": "urgent" }),
        ),
    ];

    let positions = invalid_state_indices(&source, &root_schema, &entries).await;
    assert_eq!(positions, vec![1]);
}

// ── invalid_states ──────────────────────────────────────────────

#[tokio::test]
async fn report_lists_root_paths_before_reindexed_rows() {
    let mut source = MemoryDataSource::new();
    source.insert_manifest(journal_manifest());

    let mut state = ApplicationState::default();
    state.plugins.push(PluginVersion::new("journal", "1.0.0"));
    state.store.insert(
        "journal".to_string(),
        vec![
            entry("$(journal)", json!({ "count": null })),
            entry(
                "$(journal).entries.(id)<x>",
                json!({ "(id)": "x", "name": "first" }),
            ),
        ],
    );

    let report = invalid_states(&source, &state).await;
    assert_eq!(
        report["journal"],
        vec!["$(journal).count", "$(journal).entries.[0]"]
    );
}

#[tokio::test]
async fn positions_translate_through_reindexed_paths() {
    let mut source = MemoryDataSource::new();
    source.insert_manifest(journal_manifest());

    let mut state = ApplicationState::default();
    state.plugins.push(PluginVersion::new("journal", "1.0.0"));
    state.store.insert(
        "journal".to_string(),
        vec![
            entry("$(journal)", json!({ "count": 1 })),
            entry(
                "$(journal).entries.(id)<x>",
                json!({ "(id)": "x", "name": "first" }),
            ),
            entry(
                "$(journal).entries.(id)<x>.tags.label<urgent>",
                json!({ "label": "urgent" }),
            ),
            entry(
                "$(journal).entries.(id)<y>",
                json!({ "(id)": "y", "name": "second" }),
            ),
        ],
    );

    let report = invalid_states(&source, &state).await;
    assert_eq!(report["journal"], vec!["$(journal).entries.[1]"]);
}

#[tokio::test]
async fn unresolvable_plugins_are_skipped_not_fatal() {
    let mut source = MemoryDataSource::new();
    source.insert_manifest(journal_manifest());

    let mut state = ApplicationState::default();
    state.plugins.push(PluginVersion::new("ghost", "0.0.1"));
    state.plugins.push(PluginVersion::new("journal", "1.0.0"));
    state.store.insert(
        "journal".to_string(),
        vec![entry("$(journal)", json!({ "count": 0 }))],
    );

    let report = invalid_states(&source, &state).await;
    assert!(!report.contains_key("ghost"));
    assert_eq!(report["journal"], Vec::<String>::new());
}

#[tokio::test]
async fn plugins_without_entries_validate_clean() {
    let mut source = MemoryDataSource::new();
    source.insert_manifest(journal_manifest());

    let mut state = ApplicationState::default();
    state.plugins.push(PluginVersion::new("journal", "1.0.0"));

    let report = invalid_states(&source, &state).await;
    assert_eq!(report["journal"], Vec::<String>::new());
}
