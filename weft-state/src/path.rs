//! Schema path encoding.
//!
//! State entry keys are dotted paths whose segments are either plain field
//! names or keyed-collection references rendered `name<value>`. Values may
//! themselves contain dots and nested `<...>` spans (a set keyed by a ref
//! carries a whole path as its value), so splitting tracks angle-bracket
//! depth across the string instead of splitting blindly on `.`.

/// One decoded segment of a schema path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPart {
    /// Plain field name.
    Field(String),
    /// Keyed-collection reference, rendered `key<value>`.
    KeyValue { key: String, value: String },
    /// Positional array index, produced by re-indexing.
    Index(usize),
}

impl PathPart {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Splits `path` into decoded segments.
///
/// Round-trip contract: for any path this module writes,
/// `decode_schema_path(write_path_string(decode_schema_path(p)))` equals
/// `decode_schema_path(p)`.
#[must_use]
pub fn decode_schema_path(path: &str) -> Vec<PathPart> {
    split_path(path)
        .into_iter()
        .map(|segment| match parse_key_value(&segment) {
            Some((key, value)) => PathPart::KeyValue { key, value },
            None => PathPart::Field(segment),
        })
        .collect()
}

/// Renders decoded parts back into a dotted path. Indices are rendered as
/// bare digits; use [`write_path_string_with_arrays`] for the `[n]` form.
#[must_use]
pub fn write_path_string(parts: &[PathPart]) -> String {
    parts
        .iter()
        .map(|part| match part {
            PathPart::Field(name) => name.clone(),
            PathPart::KeyValue { key, value } => format!("{key}<{value}>"),
            PathPart::Index(index) => index.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Like [`write_path_string`] but renders indices as `[n]`, the form used
/// for re-indexed list paths.
#[must_use]
pub fn write_path_string_with_arrays(parts: &[PathPart]) -> String {
    parts
        .iter()
        .map(|part| match part {
            PathPart::Field(name) => name.clone(),
            PathPart::KeyValue { key, value } => format!("{key}<{value}>"),
            PathPart::Index(index) => format!("[{index}]"),
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    for ch in path.chars() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth -= 1;
                current.push(ch);
            }
            '.' if depth == 0 => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);
    segments
}

/// A segment is keyed when a non-empty key precedes `<`, the segment ends
/// with `>`, its overall bracket balance is zero, and the enclosed value is
/// non-empty. Everything else stays a plain field name.
fn parse_key_value(segment: &str) -> Option<(String, String)> {
    if !segment.ends_with('>') {
        return None;
    }
    let open = segment.find('<')?;
    if open == 0 {
        return None;
    }
    let balance = segment.chars().fold(0i32, |depth, ch| match ch {
        '<' => depth + 1,
        '>' => depth - 1,
        _ => depth,
    });
    if balance != 0 {
        return None;
    }
    let value = &segment[open + 1..segment.len() - 1];
    if value.is_empty() {
        return None;
    }
    Some((segment[..open].to_string(), value.to_string()))
}
