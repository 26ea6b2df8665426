//! Path addressing within documents.
//!
//! Paths are dot-separated mapping keys with `key[N]` for zero-based
//! sequence indices, composed hierarchically: `vars.tags.environment`,
//! `items[0].name`. The write-back helpers only descend through mappings —
//! deferred values are recorded at map paths, never inside sequences.

use crate::error::MergeError;
use crate::value::{Document, Value};

/// Join a mapping key onto a base path.
pub fn join_key(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

/// Join a zero-based sequence index onto a base path.
pub fn join_index(base: &str, index: usize) -> String {
    format!("{base}[{index}]")
}

/// Dot-join path segments.
pub fn join_segments(segments: &[String]) -> String {
    segments.join(".")
}

/// Look up a value at a path of map keys. Returns `None` when any segment is
/// missing or descends through a non-mapping. An explicit `Null` at the final
/// segment is found, not `None`.
pub fn get_value_at_path<'a>(doc: &'a Document, segments: &[String]) -> Option<&'a Value> {
    let (last, intermediate) = segments.split_last()?;

    let mut current = doc;
    for segment in intermediate {
        current = current.get(segment)?.as_map()?;
    }
    current.get(last)
}

/// Write a value at a path of map keys, creating intermediate maps as
/// needed.
///
/// Errors on an empty path and on descending through an existing
/// non-mapping value.
pub fn set_value_at_path(
    doc: &mut Document,
    segments: &[String],
    value: Value,
) -> Result<(), MergeError> {
    let Some((last, intermediate)) = segments.split_last() else {
        return Err(MergeError::EmptyPath);
    };

    let mut current = doc;
    for (i, segment) in intermediate.iter().enumerate() {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Map(Document::new()));
        match entry {
            Value::Map(next) => current = next,
            _ => {
                return Err(MergeError::PathNotNavigable {
                    path: join_segments(segments),
                    segment: join_segments(&segments[..=i]),
                })
            }
        }
    }

    current.insert(last.clone(), value);
    Ok(())
}
