//! Keyed-to-positional list path conversion.

use crate::path::{decode_schema_path, write_path_string, write_path_string_with_arrays, PathPart};
use crate::state::DiffElement;

/// Rewrites keyed list-membership paths into positional ones.
///
/// Entries whose last segment is the synthetic `(id)` key get that segment
/// replaced by the running index of their list context; everything else
/// passes through unchanged. A stack of open list contexts tracks nesting,
/// so a sibling list starting right after another begins again at `[0]`.
///
/// Precondition: entries must be grouped contiguously by list membership,
/// parents before children, as the flattened-state format produces them.
/// The output of re-ordered input is unspecified.
#[must_use]
pub fn re_index_schema_arrays(entries: &[DiffElement]) -> Vec<String> {
    let mut out = Vec::with_capacity(entries.len());
    let mut list_stack: Vec<String> = Vec::new();
    let mut index_stack: Vec<usize> = Vec::new();

    for entry in entries {
        let mut parts = decode_schema_path(&entry.key);
        let is_list_row =
            matches!(parts.last(), Some(PathPart::KeyValue { key, .. }) if key == "(id)");
        if !is_list_row {
            out.push(entry.key.clone());
            continue;
        }

        parts.pop();
        let parent = write_path_string(&parts);

        if list_stack.last() == Some(&parent) {
            if let Some(top) = index_stack.last_mut() {
                *top += 1;
            }
        } else {
            let opens_nested = match list_stack.last() {
                Some(top) => entry.key.starts_with(top.as_str()),
                None => true,
            };
            if opens_nested {
                list_stack.push(parent.clone());
                index_stack.push(0);
            } else {
                while list_stack
                    .last()
                    .is_some_and(|top| !entry.key.starts_with(top.as_str()))
                {
                    list_stack.pop();
                    index_stack.pop();
                }
                if let Some(top) = index_stack.last_mut() {
                    *top += 1;
                } else {
                    list_stack.push(parent.clone());
                    index_stack.push(0);
                }
            }
        }

        let index = index_stack.last().copied().unwrap_or(0);
        parts.push(PathPart::Index(index));
        out.push(write_path_string_with_arrays(&parts));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entry(key: &str) -> DiffElement {
        DiffElement::new(key, json!({}))
    }

    #[test]
    fn contiguous_rows_count_up_from_zero() {
        let entries = vec![
            entry("$(notes).list.(id)<x>"),
            entry("$(notes).list.(id)<y>"),
            entry("$(notes).list.(id)<z>"),
        ];
        assert_eq!(
            re_index_schema_arrays(&entries),
            vec![
                "$(notes).list.[0]",
                "$(notes).list.[1]",
                "$(notes).list.[2]",
            ]
        );
    }

    #[test]
    fn sibling_list_restarts_at_zero() {
        let entries = vec![
            entry("$(notes).first.(id)<x>"),
            entry("$(notes).first.(id)<y>"),
            entry("$(notes).second.(id)<a>"),
        ];
        assert_eq!(
            re_index_schema_arrays(&entries),
            vec![
                "$(notes).first.[0]",
                "$(notes).first.[1]",
                "$(notes).second.[0]",
            ]
        );
    }

    #[test]
    fn nested_lists_pop_back_to_their_parent_context() {
        let entries = vec![
            entry("$(notes).list.(id)<x>"),
            entry("$(notes).list.(id)<x>.sub.(id)<s1>"),
            entry("$(notes).list.(id)<x>.sub.(id)<s2>"),
            entry("$(notes).list.(id)<y>"),
            entry("$(notes).list.(id)<y>.sub.(id)<s3>"),
        ];
        assert_eq!(
            re_index_schema_arrays(&entries),
            vec![
                "$(notes).list.[0]",
                "$(notes).list.(id)<x>.sub.[0]",
                "$(notes).list.(id)<x>.sub.[1]",
                "$(notes).list.[1]",
                "$(notes).list.(id)<y>.sub.[0]",
            ]
        );
    }

    #[test]
    fn non_list_rows_pass_through() {
        let entries = vec![
            entry("$(notes)"),
            entry("$(notes).tags.name<urgent>"),
            entry("$(notes).list.(id)<x>"),
        ];
        assert_eq!(
            re_index_schema_arrays(&entries),
            vec![
                "$(notes)",
                "$(notes).tags.name<urgent>",
                "$(notes).list.[0]",
            ]
        );
    }
}
