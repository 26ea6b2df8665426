//! The canonical document value model.
//!
//! Every configuration layer handled by this crate is an untyped tree of
//! [`Value`]s: scalars, arrays, and string-keyed maps. Layers arrive from
//! YAML/JSON loaders (see [`crate::normalize`]) already flattened into this
//! shape, so the merge engine never has to reason about foreign types.
//!
//! # Ownership
//!
//! Documents are immutable inputs to the engine: merging, deferral walks,
//! and provenance recording all return new structures. [`deep_copy_value`]
//! is the single place that manufactures independent copies, and it
//! allocates containers with exact capacity so repeated copies of the same
//! layer do not over-allocate.

use indexmap::IndexMap;

/// A configuration document: a string-keyed mapping at the top level.
pub type Document = IndexMap<String, Value>;

/// An untyped configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null, also used as the type-neutral placeholder for deferred
    /// expressions (merges cleanly against any concrete value).
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Nested mapping (insertion order preserved).
    Map(Document),
}

/// The kind of a [`Value`], used in type-mismatch diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Map,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
        };
        f.write_str(name)
    }
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Scalars are everything that is neither an array nor a map.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Map(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Get as a string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as array items if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get as map entries if this is a map.
    pub fn as_map(&self) -> Option<&Document> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Structurally copy a value so that mutating either side never affects the
/// other.
///
/// Containers are rebuilt with exact capacity. Scalar types are preserved
/// as-is: an integer stays an integer, a float stays a float — there is no
/// serialization round-trip anywhere in this path.
pub fn deep_copy_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut copy = Vec::with_capacity(items.len());
            for item in items {
                copy.push(deep_copy_value(item));
            }
            Value::Array(copy)
        }
        Value::Map(entries) => Value::Map(deep_copy_document(entries)),
        // Scalars carry no shared structure.
        scalar => scalar.clone(),
    }
}

/// Structurally copy a document. See [`deep_copy_value`].
pub fn deep_copy_document(doc: &Document) -> Document {
    let mut copy = Document::with_capacity(doc.len());
    for (key, value) in doc {
        copy.insert(key.clone(), deep_copy_value(value));
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut nested = Document::new();
        nested.insert("deep".into(), Value::String("nested value".into()));
        nested.insert(
            "array".into(),
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        );

        let mut doc = Document::new();
        doc.insert("string".into(), Value::String("value".into()));
        doc.insert("number".into(), Value::Int(42));
        doc.insert("nested".into(), Value::Map(nested));
        doc.insert(
            "slice".into(),
            Value::Array(vec!["x".into(), "y".into(), "z".into()]),
        );
        doc
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Value::Null.kind(), ValueKind::Null);
        assert_eq!(Value::Int(1).kind(), ValueKind::Int);
        assert_eq!(Value::Float(1.5).kind(), ValueKind::Float);
        assert_eq!(Value::Array(vec![]).kind(), ValueKind::Array);
        assert_eq!(Value::Map(Document::new()).kind(), ValueKind::Map);
        assert!(Value::Null.is_scalar());
        assert!(!Value::Array(vec![]).is_scalar());
    }

    #[test]
    fn test_deep_copy_is_equal() {
        let doc = sample();
        let copy = deep_copy_document(&doc);
        assert_eq!(doc, copy);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let doc = sample();
        let mut copy = deep_copy_document(&doc);

        // Mutate the copy at every level.
        copy.insert("string".into(), Value::String("modified".into()));
        if let Some(Value::Map(nested)) = copy.get_mut("nested") {
            if let Some(Value::Array(arr)) = nested.get_mut("array") {
                arr.push(Value::Int(99));
            }
        }

        // The original is untouched.
        assert_eq!(doc.get("string"), Some(&Value::String("value".into())));
        let nested = doc.get("nested").unwrap().as_map().unwrap();
        assert_eq!(nested.get("array").unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_deep_copy_idempotent() {
        let doc = sample();
        let once = deep_copy_document(&doc);
        let twice = deep_copy_document(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_scalar_types_preserved() {
        let copy = deep_copy_value(&Value::Int(7));
        assert_eq!(copy.kind(), ValueKind::Int);
        let copy = deep_copy_value(&Value::Float(7.0));
        assert_eq!(copy.kind(), ValueKind::Float);
    }
}
