//! Path positions recovered from rendered YAML.
//!
//! Hosts usually re-render a section of a merged document before processing
//! it further; the rendered text is then the only place line/column
//! information for merged values exists. [`positions_from_rendered_yaml`]
//! scans block-style YAML with an indentation stack and maps each mapping
//! key (and `- ` sequence item, as `key[N]`) to its 1-based position. This
//! is a display aid, not a parser: flow-style collections and multi-line
//! scalars yield positions only for the lines that look like keys.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entry::ProvenanceEntry;
use crate::store::ProvenanceStore;
use strata_merge::{join_index, join_key};

/// A 1-based line/column position; 0/0 means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Path → position within one rendered file.
pub type PositionMap = IndexMap<String, Position>;

/// Scan block-style YAML text into a [`PositionMap`].
pub fn positions_from_rendered_yaml(text: &str) -> PositionMap {
    let mut positions = PositionMap::new();
    // Open scopes: (key indent, full path of the key opening the scope).
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut seq_counters: IndexMap<String, usize> = IndexMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = (idx + 1) as u32;
        let trimmed = raw.trim_end();
        let indent = trimmed.len() - trimmed.trim_start().len();
        let content = &trimmed[indent..];
        if content.is_empty() || content.starts_with('#') {
            continue;
        }

        if content == "-" || content.starts_with("- ") {
            // Same-indent items stay inside their key's scope.
            while stack.last().is_some_and(|(i, _)| *i > indent) {
                stack.pop();
            }
            let Some((_, parent)) = stack.last() else {
                continue;
            };
            let index = seq_counters.entry(parent.clone()).or_insert(0);
            let item_path = join_index(parent, *index);
            *index += 1;
            positions.insert(
                item_path.clone(),
                Position {
                    line,
                    column: indent as u32 + 1,
                },
            );

            // An inline `- key: value` also positions the nested key.
            let rest = content[1..].trim_start();
            if let Some(key) = leading_key(rest) {
                positions.insert(
                    join_key(&item_path, &key),
                    Position {
                        line,
                        column: (content.len() - rest.len() + indent) as u32 + 1,
                    },
                );
            }
            // Keys indented past the dash belong to the item's mapping.
            stack.push((indent + 1, item_path));
            continue;
        }

        let Some(key) = leading_key(content) else {
            continue;
        };
        while stack.last().is_some_and(|(i, _)| *i >= indent) {
            stack.pop();
        }
        let base = stack.last().map(|(_, p)| p.as_str()).unwrap_or("");
        let path = join_key(base, &key);
        positions.insert(
            path.clone(),
            Position {
                line,
                column: indent as u32 + 1,
            },
        );
        stack.push((indent, path));
    }
    positions
}

/// Extract the mapping key that opens `content`, if any.
fn leading_key(content: &str) -> Option<String> {
    let colon = content.find(':')?;
    // A colon inside a flow value ("url: http://x") must not re-split; only
    // the first colon followed by space or end-of-line is a key separator.
    let after = &content[colon + 1..];
    if !(after.is_empty() || after.starts_with(' ')) {
        return None;
    }
    let key = content[..colon].trim();
    if key.is_empty() {
        return None;
    }
    Some(key.trim_matches(|c| c == '"' || c == '\'').to_string())
}

/// Filter a store down to valid entries under `prefix`, with the prefix
/// stripped from the returned paths. An empty prefix returns everything.
pub fn display_entries(
    store: &ProvenanceStore,
    prefix: &str,
) -> Vec<(String, Vec<ProvenanceEntry>)> {
    let mut out = Vec::new();
    for path in store.paths() {
        let remapped = if prefix.is_empty() {
            Some(path.as_str())
        } else if path == prefix {
            Some("")
        } else {
            path.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('.'))
        };
        let Some(remapped) = remapped.filter(|p| !p.is_empty()) else {
            continue;
        };

        let chain: Vec<ProvenanceEntry> = store
            .get(&path)
            .into_iter()
            .filter(ProvenanceEntry::is_valid)
            .collect();
        if !chain.is_empty() {
            out.push((remapped.to_string(), chain));
        }
    }
    out
}
