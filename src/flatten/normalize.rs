// src/flatten/normalize.rs

use super::records::Record;

/// Downstream column names are capped at 63 characters.
pub const MAX_FIELD_LEN: usize = 63;

/// Normalize one field name: lowercase, spaces to underscores, parentheses
/// deleted, then truncated to the first [`MAX_FIELD_LEN`] characters.
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .take(MAX_FIELD_LEN)
        .collect()
}

/// Rewrite every key of `record` through [`normalize_key`]; values pass
/// through unchanged. Distinct keys may collide after normalization; the
/// collision is not detected and the last write wins. Accepted limitation.
pub fn normalize_record(record: Record) -> Record {
    let mut out = Record::new();
    for (key, value) in record {
        out.insert(normalize_key(&key), value);
    }
    out
}
