//! Provenance entries: where a merged value came from.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strata_merge::Value;

/// How a value arrived at its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvenanceKind {
    /// Brought in through an imported file.
    Import,
    /// Defined directly in the file being processed.
    Inline,
    /// Replaced an earlier layer's value.
    Override,
    /// Produced by the system rather than written by a user.
    Computed,
    /// A built-in default.
    Default,
}

impl ProvenanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvenanceKind::Import => "import",
            ProvenanceKind::Inline => "inline",
            ProvenanceKind::Override => "override",
            ProvenanceKind::Computed => "computed",
            ProvenanceKind::Default => "default",
        }
    }
}

impl std::fmt::Display for ProvenanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step in a value's history: the file and position it came from, how it
/// got there, and a content hash for change detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Source file, relative to the host's base path.
    pub file: String,
    /// 1-based line; 0 when position data is unavailable.
    pub line: u32,
    /// 1-based column; 0 when position data is unavailable.
    pub column: u32,
    pub kind: ProvenanceKind,
    /// Content hash of the value as recorded, from [`hash_value`].
    pub value_hash: String,
    /// Import depth: 0 for the root file, rising per import hop.
    pub depth: u32,
}

impl ProvenanceEntry {
    /// An entry is valid when it points at a real location. Zero-line
    /// entries occur when position data was missing and are kept in the
    /// store but filtered from display.
    pub fn is_valid(&self) -> bool {
        !self.file.is_empty() && self.line > 0
    }
}

/// Content hash of a value: the first 8 bytes of the SHA-256 of a canonical
/// encoding, hex-encoded (16 characters).
///
/// The encoding is type-tagged and sorts map keys, so two structurally equal
/// values hash identically regardless of key insertion order.
pub fn hash_value(value: &Value) -> String {
    let mut buf = Vec::new();
    canonical_encode(value, &mut buf);
    let digest = Sha256::digest(&buf);
    hex::encode(&digest[..8])
}

fn canonical_encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(b'n'),
        Value::Bool(b) => {
            out.push(b'b');
            out.push(u8::from(*b));
        }
        Value::Int(n) => {
            out.push(b'i');
            out.extend_from_slice(&n.to_be_bytes());
        }
        Value::Float(f) => {
            out.push(b'f');
            out.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        Value::String(s) => {
            out.push(b's');
            out.extend_from_slice(&(s.len() as u64).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        Value::Array(items) => {
            out.push(b'a');
            out.extend_from_slice(&(items.len() as u64).to_be_bytes());
            for item in items {
                canonical_encode(item, out);
            }
        }
        Value::Map(entries) => {
            out.push(b'm');
            out.extend_from_slice(&(entries.len() as u64).to_be_bytes());
            let mut keys: Vec<&String> = entries.keys().collect();
            keys.sort_unstable();
            for key in keys {
                out.extend_from_slice(&(key.len() as u64).to_be_bytes());
                out.extend_from_slice(key.as_bytes());
                canonical_encode(&entries[key.as_str()], out);
            }
        }
    }
}
