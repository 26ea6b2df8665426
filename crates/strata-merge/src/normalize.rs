//! Conversion from loader types to the canonical value model.
//!
//! Layers arrive as `yaml_rust2::Yaml` trees or `serde_json::Value`s
//! depending on which loader the host used; both are flattened here into
//! [`Value`] so the engine only ever sees one shape. Conversion is total —
//! anything a loader can produce maps to some `Value`, with unrepresentable
//! oddities (aliases, bad values) collapsing to `Null` and non-string map
//! keys stringified.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use yaml_rust2::{Yaml, YamlLoader};

use crate::error::MergeError;
use crate::value::{Document, Value};

/// Conversion of typed Rust collections into the canonical value model.
///
/// Hosts hold settings in typed structs and maps; this is the bridge that
/// turns them into mergeable documents without a serialization round-trip.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue> IntoValue for IndexMap<String, T> {
    fn into_value(self) -> Value {
        let mut map = Document::with_capacity(self.len());
        for (key, value) in self {
            map.insert(key, value.into_value());
        }
        Value::Map(map)
    }
}

impl<T: IntoValue> IntoValue for BTreeMap<String, T> {
    fn into_value(self) -> Value {
        let mut map = Document::with_capacity(self.len());
        for (key, value) in self {
            map.insert(key, value.into_value());
        }
        Value::Map(map)
    }
}

impl<T: IntoValue> IntoValue for HashMap<String, T> {
    fn into_value(self) -> Value {
        // Hash iteration order is arbitrary; sort for a deterministic
        // document.
        let mut entries: Vec<(String, T)> = self.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        let mut map = Document::with_capacity(entries.len());
        for (key, value) in entries {
            map.insert(key, value.into_value());
        }
        Value::Map(map)
    }
}

/// Convert a parsed YAML node to a [`Value`].
///
/// YAML `Real` scalars keep their source text when it does not parse as a
/// float (yaml-rust2 classifies some exotic literals as reals); everything
/// else converts losslessly.
pub fn value_from_yaml(yaml: &Yaml) -> Value {
    match yaml {
        Yaml::Null | Yaml::BadValue | Yaml::Alias(_) => Value::Null,
        Yaml::Boolean(b) => Value::Bool(*b),
        Yaml::Integer(n) => Value::Int(*n),
        Yaml::Real(raw) => match raw.parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::String(raw.clone()),
        },
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Array(items) => Value::Array(items.iter().map(value_from_yaml).collect()),
        Yaml::Hash(entries) => {
            let mut map = Document::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(yaml_key_to_string(key), value_from_yaml(value));
            }
            Value::Map(map)
        }
    }
}

/// Render a YAML mapping key as a string. Non-string keys are legal YAML;
/// they join the document under their scalar rendering.
fn yaml_key_to_string(key: &Yaml) -> String {
    match key {
        Yaml::String(s) => s.clone(),
        Yaml::Integer(n) => n.to_string(),
        Yaml::Boolean(b) => b.to_string(),
        Yaml::Real(raw) => raw.clone(),
        Yaml::Null => "null".to_string(),
        other => format!("{other:?}"),
    }
}

/// Parse a YAML source string into documents, one [`Document`] per YAML
/// document in the stream.
///
/// Empty documents become empty [`Document`]s; a non-mapping top level is an
/// error.
pub fn documents_from_yaml_str(source: &str) -> Result<Vec<Document>, MergeError> {
    let parsed = YamlLoader::load_from_str(source)?;
    let mut documents = Vec::with_capacity(parsed.len());
    for yaml in &parsed {
        documents.push(document_from_value(value_from_yaml(yaml))?);
    }
    Ok(documents)
}

/// Convert a JSON value to a [`Value`].
///
/// Numbers prefer `i64`; anything else representable becomes a float.
pub fn value_from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Array(items.iter().map(value_from_json).collect())
        }
        serde_json::Value::Object(entries) => {
            let mut map = Document::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key.clone(), value_from_json(value));
            }
            Value::Map(map)
        }
    }
}

/// Convert a top-level JSON value to a [`Document`].
pub fn document_from_json(json: &serde_json::Value) -> Result<Document, MergeError> {
    document_from_value(value_from_json(json))
}

fn document_from_value(value: Value) -> Result<Document, MergeError> {
    match value {
        Value::Map(map) => Ok(map),
        Value::Null => Ok(Document::new()),
        other => Err(MergeError::TopLevelNotMap(other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    #[test]
    fn test_yaml_scalars() {
        let docs = documents_from_yaml_str(
            "string: hello\nint: 42\nfloat: 1.5\nbool: true\nnothing: null\n",
        )
        .unwrap();
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.get("string"), Some(&Value::String("hello".into())));
        assert_eq!(doc.get("int"), Some(&Value::Int(42)));
        assert_eq!(doc.get("float"), Some(&Value::Float(1.5)));
        assert_eq!(doc.get("bool"), Some(&Value::Bool(true)));
        assert_eq!(doc.get("nothing"), Some(&Value::Null));
    }

    #[test]
    fn test_yaml_nested_structures() {
        let docs = documents_from_yaml_str(
            "vars:\n  region: us-east-1\n  tags:\n    - one\n    - two\n",
        )
        .unwrap();
        let vars = docs[0].get("vars").unwrap().as_map().unwrap();
        assert_eq!(vars.get("region").unwrap().as_str(), Some("us-east-1"));
        assert_eq!(
            vars.get("tags").unwrap(),
            &Value::Array(vec!["one".into(), "two".into()])
        );
    }

    #[test]
    fn test_yaml_preserves_key_order() {
        let docs = documents_from_yaml_str("b: 1\na: 2\nc: 3\n").unwrap();
        let keys: Vec<&str> = docs[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_yaml_non_string_keys_stringified() {
        let docs = documents_from_yaml_str("1: one\ntrue: yes\n").unwrap();
        assert_eq!(docs[0].get("1").unwrap().as_str(), Some("one"));
        assert_eq!(docs[0].get("true").unwrap().as_str(), Some("yes"));
    }

    #[test]
    fn test_yaml_empty_document() {
        let docs = documents_from_yaml_str("").unwrap();
        assert!(docs.is_empty() || docs[0].is_empty());
    }

    #[test]
    fn test_yaml_top_level_sequence_rejected() {
        let err = documents_from_yaml_str("- a\n- b\n").unwrap_err();
        assert!(matches!(err, MergeError::TopLevelNotMap(ValueKind::Array)));
    }

    #[test]
    fn test_json_conversion() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{"name": "app", "replicas": 3, "ratio": 0.5, "tags": ["a", "b"], "meta": null}"#,
        )
        .unwrap();
        let doc = document_from_json(&json).unwrap();
        assert_eq!(doc.get("name").unwrap().as_str(), Some("app"));
        assert_eq!(doc.get("replicas"), Some(&Value::Int(3)));
        assert_eq!(doc.get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(
            doc.get("tags").unwrap(),
            &Value::Array(vec!["a".into(), "b".into()])
        );
        assert_eq!(doc.get("meta"), Some(&Value::Null));
    }

    #[test]
    fn test_into_value_collections() {
        let mut nested = IndexMap::new();
        nested.insert("port".to_string(), 8080_i64);

        assert_eq!(
            vec!["a", "b"].into_value(),
            Value::Array(vec!["a".into(), "b".into()])
        );
        assert_eq!(Option::<i64>::None.into_value(), Value::Null);
        assert_eq!(Some(1.5_f64).into_value(), Value::Float(1.5));

        let value = nested.into_value();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("port"), Some(&Value::Int(8080)));
    }

    #[test]
    fn test_into_value_hash_map_is_sorted() {
        let mut unordered = HashMap::new();
        unordered.insert("z".to_string(), 1_i64);
        unordered.insert("a".to_string(), 2_i64);
        unordered.insert("m".to_string(), 3_i64);

        let value = unordered.into_value();
        let keys: Vec<&str> = value.as_map().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_json_top_level_scalar_rejected() {
        let json = serde_json::Value::Bool(true);
        assert!(matches!(
            document_from_json(&json),
            Err(MergeError::TopLevelNotMap(ValueKind::Bool))
        ));
    }
}
