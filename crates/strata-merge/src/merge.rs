//! The deep-merge engine.
//!
//! Merges an ordered list of documents into one: later documents take
//! precedence for scalar and mapping keys, and sequences are reconciled by
//! the configured [`ListMergeStrategy`]. Inputs are never mutated — every
//! input is deep-copied before it is folded into the accumulator, so callers
//! may keep reading their original documents concurrently.
//!
//! # Type checking
//!
//! Two non-null values of different kinds at the same path are an error, not
//! a silent override. The one exception is `Null`: a null source never
//! overrides a concrete destination, which is what lets deferred-expression
//! placeholders (see [`crate::deferred`]) merge cleanly against anything.
//!
//! # Per-value force append
//!
//! A mapping key with a `+` suffix (`tags+:`) marks its sequence value for
//! concatenation regardless of the global strategy; the suffix is stripped
//! from the merged result.

use crate::error::MergeError;
use crate::path::{join_index, join_key};
use crate::strategy::{ListMergeStrategy, MergeSettings};
use crate::value::{deep_copy_document, Document, Value};

/// Deep-merge `documents` in order under the settings' list strategy.
///
/// Absent settings are an error ("configuration is nil"), as is an
/// unrecognized strategy name. A failed merge returns the error alone —
/// there are no partial results.
pub fn merge(
    settings: Option<&MergeSettings>,
    documents: &[Document],
) -> Result<Document, MergeError> {
    let settings = settings.ok_or(MergeError::MissingSettings)?;
    let strategy = settings.strategy()?;
    merge_with_strategy(strategy, documents)
}

/// Deep-merge with an already-validated strategy.
pub fn merge_with_strategy(
    strategy: ListMergeStrategy,
    documents: &[Document],
) -> Result<Document, MergeError> {
    let mut result = Document::new();
    for doc in documents {
        if doc.is_empty() {
            continue;
        }
        // Fold a private copy; the accumulator must never alias an input.
        let copy = deep_copy_document(doc);
        merge_into(&mut result, copy, strategy, "")?;
    }
    Ok(result)
}

/// Fold the entries of `src` (already an independent copy) into `acc`.
fn merge_into(
    acc: &mut Document,
    src: Document,
    strategy: ListMergeStrategy,
    base: &str,
) -> Result<(), MergeError> {
    for (key, src_value) in src {
        let force_append = key.len() > 1 && key.ends_with('+');
        let target = if force_append {
            key[..key.len() - 1].to_string()
        } else {
            key
        };
        let effective = if force_append && src_value.is_array() {
            ListMergeStrategy::Append
        } else {
            strategy
        };
        let path = join_key(base, &target);
        let merged = merge_entry(acc.get(&target), src_value, effective, &path)?;
        acc.insert(target, merged);
    }
    Ok(())
}

/// Merge one source value against whatever the accumulator holds at the same
/// path.
fn merge_entry(
    dest: Option<&Value>,
    src: Value,
    strategy: ListMergeStrategy,
    path: &str,
) -> Result<Value, MergeError> {
    let Some(dest) = dest.filter(|d| !d.is_null()) else {
        return Ok(src);
    };

    if src.is_null() {
        // A null source is a type-neutral placeholder; the concrete
        // destination survives.
        return Ok(dest.clone());
    }

    match (dest, src) {
        (Value::Map(a), Value::Map(b)) => {
            let mut merged = deep_copy_document(a);
            merge_into(&mut merged, b, strategy, path)?;
            Ok(Value::Map(merged))
        }
        (Value::Array(a), Value::Array(b)) => merge_arrays(a, b, strategy, path),
        (d, s) if d.kind() == s.kind() => Ok(s),
        (d, s) => Err(MergeError::IncompatibleTypes {
            path: path.to_string(),
            dest: d.kind(),
            src: s.kind(),
        }),
    }
}

pub(crate) fn merge_arrays(
    dest: &[Value],
    src: Vec<Value>,
    strategy: ListMergeStrategy,
    path: &str,
) -> Result<Value, MergeError> {
    match strategy {
        ListMergeStrategy::Replace => Ok(Value::Array(src)),
        ListMergeStrategy::Append => {
            let mut out = Vec::with_capacity(dest.len() + src.len());
            out.extend(dest.iter().cloned());
            out.extend(src);
            Ok(Value::Array(out))
        }
        ListMergeStrategy::Merge => Ok(Value::Array(positional_merge(dest, src, path)?)),
    }
}

/// Positionally reconcile two sequences: map pairs deep-merge, any other
/// pair takes the later element, and the longer tail is kept. Scalar lists
/// therefore behave like per-index replacement — the observed upstream
/// behavior, preserved as-is.
pub(crate) fn positional_merge(
    dest: &[Value],
    src: Vec<Value>,
    path: &str,
) -> Result<Vec<Value>, MergeError> {
    let src_len = src.len();
    let mut out = Vec::with_capacity(dest.len().max(src_len));

    for (i, s) in src.into_iter().enumerate() {
        let item_path = join_index(path, i);
        let merged = match (dest.get(i), s) {
            (Some(d @ Value::Map(_)), s @ Value::Map(_)) => {
                merge_entry(Some(d), s, ListMergeStrategy::Merge, &item_path)?
            }
            (_, s) => s,
        };
        out.push(merged);
    }

    if dest.len() > src_len {
        out.extend(dest[src_len..].iter().cloned());
    }
    Ok(out)
}
