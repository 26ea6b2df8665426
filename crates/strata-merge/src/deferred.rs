//! Deferred expression handling.
//!
//! Some string values are not data but function calls into the host
//! environment (`!template`, `!terraform.output`, `!env`, ...). Their results
//! depend on context that does not exist at merge time, so merging their raw
//! text would be wrong: a later layer's expression must win over an earlier
//! layer's *result*, not be clobbered by it.
//!
//! The pipeline here runs in three phases:
//!
//! 1. [`walk_and_defer`] swaps each matching string out of a layer for a
//!    `Null` placeholder and records the expression with the layer's
//!    precedence in a [`DeferredMergeContext`].
//! 2. The ordinary engine merges the scrubbed layers; `Null` placeholders
//!    never override concrete values, so the merged tree is correct for
//!    everything that is not deferred.
//! 3. [`apply_deferred_merges`] resolves each recorded expression through a
//!    host-supplied [`ExpressionResolver`], re-merges the results in
//!    precedence order, and writes them back at their paths.
//!
//! A concrete value that won a path outright (a later layer overrode the
//! expression with plain data) participates in phase 3 with a precedence
//! above every deferred entry, so plain data still beats earlier
//! expressions.

use indexmap::IndexMap;

use crate::error::{BoxError, MergeError};
use crate::merge::{merge_arrays, merge_with_strategy};
use crate::path::{get_value_at_path, join_segments, set_value_at_path};
use crate::strategy::{ListMergeStrategy, MergeSettings};
use crate::value::{deep_copy_document, Document, Value};

/// Resolves a deferred expression (marker included, e.g.
/// `!terraform.output vpc vpc_id`) to a concrete value.
///
/// Implemented by the host; also implemented for plain closures so tests and
/// simple hosts can pass a function.
pub trait ExpressionResolver {
    fn resolve(&self, expression: &str) -> Result<Value, BoxError>;
}

impl<F> ExpressionResolver for F
where
    F: Fn(&str) -> Result<Value, BoxError>,
{
    fn resolve(&self, expression: &str) -> Result<Value, BoxError> {
        self(expression)
    }
}

/// The set of markers that make a string value a deferred expression.
///
/// A value matches when it equals a marker exactly or starts with the marker
/// followed by a space, so `!templates` never matches `!template`.
#[derive(Debug, Clone)]
pub struct MarkerSet {
    markers: Vec<String>,
}

impl Default for MarkerSet {
    fn default() -> Self {
        // `!include` is intentionally absent: includes are expanded while
        // layers are loaded, long before merging.
        Self::new([
            "!template",
            "!terraform.output",
            "!terraform.state",
            "!store.get",
            "!store",
            "!exec",
            "!env",
        ])
    }
}

impl MarkerSet {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    /// Does this string value denote a deferred expression?
    pub fn matches(&self, value: &str) -> bool {
        self.markers.iter().any(|marker| {
            value == marker
                || (value.starts_with(marker.as_str())
                    && value[marker.len()..].starts_with(' '))
        })
    }
}

/// One deferred entry: either an unresolved expression (`is_function`) or a
/// concrete value that joined the reconciliation at its precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredValue {
    /// Map path segments, e.g. `["vars", "config"]`.
    pub path: Vec<String>,
    /// The expression string (marker included) when `is_function`, otherwise
    /// an already-concrete value.
    pub value: Value,
    /// Layer precedence: 0 for the first input, rising with layer order.
    pub precedence: usize,
    pub is_function: bool,
}

/// Accumulates deferred entries across the layers of one merge.
#[derive(Debug, Clone, Default)]
pub struct DeferredMergeContext {
    values: IndexMap<String, Vec<DeferredValue>>,
    precedence: usize,
}

impl DeferredMergeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry at `path` under the current layer precedence. String
    /// values matching `markers` elsewhere arrive here with
    /// `is_function = true`; anything may be added as a concrete entry.
    pub fn add_deferred(&mut self, path: &[String], value: Value, is_function: bool) {
        self.values
            .entry(join_segments(path))
            .or_default()
            .push(DeferredValue {
                path: path.to_vec(),
                value,
                precedence: self.precedence,
                is_function,
            });
    }

    /// Advance to the next layer.
    pub fn increment_precedence(&mut self) {
        self.precedence += 1;
    }

    pub fn has_deferred_values(&self) -> bool {
        !self.values.is_empty()
    }

    /// All recorded dot-joined paths, sorted for deterministic write-back
    /// order.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.values.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// The entries recorded at a dot-joined `path`, in recording order.
    pub fn deferred_at(&self, path: &str) -> &[DeferredValue] {
        self.values.get(path).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Scrub one layer: every string value matching `markers` is replaced with a
/// `Null` placeholder and recorded in `ctx` under `base` (usually empty).
///
/// Only mappings are walked. Expressions inside sequences stay put — there
/// is no stable path for a sequence element across a merge, so they are left
/// for the host to resolve in place.
pub fn walk_and_defer(
    ctx: &mut DeferredMergeContext,
    doc: &mut Document,
    markers: &MarkerSet,
    base: &[String],
) {
    let mut segments = base.to_vec();
    defer_in_map(ctx, doc, markers, &mut segments);
}

/// Merge layers with deferred-expression handling.
///
/// Each layer is copied, scrubbed of deferred expressions, and folded by the
/// ordinary engine. The returned context holds everything
/// [`apply_deferred_merges`] needs to finish the job once a resolver is
/// available.
pub fn merge_with_deferred(
    settings: Option<&MergeSettings>,
    documents: &[Document],
    markers: &MarkerSet,
) -> Result<(Document, DeferredMergeContext), MergeError> {
    let settings = settings.ok_or(MergeError::MissingSettings)?;
    let strategy = settings.strategy()?;

    let mut ctx = DeferredMergeContext::new();
    let mut scrubbed = Vec::with_capacity(documents.len());
    for doc in documents {
        let mut copy = deep_copy_document(doc);
        defer_in_map(&mut ctx, &mut copy, markers, &mut Vec::new());
        scrubbed.push(copy);
        ctx.increment_precedence();
    }

    let merged = merge_with_strategy(strategy, &scrubbed)?;
    Ok((merged, ctx))
}

fn defer_in_map(
    ctx: &mut DeferredMergeContext,
    doc: &mut Document,
    markers: &MarkerSet,
    segments: &mut Vec<String>,
) {
    for (key, value) in doc.iter_mut() {
        segments.push(key.clone());
        match value {
            Value::String(s) if markers.matches(s) => {
                ctx.add_deferred(segments, Value::String(s.clone()), true);
                *value = Value::Null;
            }
            Value::Map(nested) => defer_in_map(ctx, nested, markers, segments),
            _ => {}
        }
        segments.pop();
    }
}

/// Resolve every deferred expression and write the reconciled results back
/// into `result`.
///
/// Entries at each path are resolved through `resolver` (without one,
/// expression entries keep their raw text), joined by any concrete value
/// already present at the path (which ranks above all of them), stably
/// sorted by precedence, and reduced: mappings deep-merge in order,
/// sequences reconcile via [`merge_slices`] under the settings' strategy,
/// and for anything else the highest precedence wins. A missing or empty
/// context is a no-op.
pub fn apply_deferred_merges(
    result: &mut Document,
    ctx: Option<&DeferredMergeContext>,
    settings: Option<&MergeSettings>,
    resolver: Option<&dyn ExpressionResolver>,
) -> Result<(), MergeError> {
    let Some(ctx) = ctx.filter(|c| c.has_deferred_values()) else {
        return Ok(());
    };
    let settings = settings.ok_or(MergeError::MissingSettings)?;
    let strategy = settings.strategy()?;

    for path in ctx.paths() {
        let entries = ctx.deferred_at(path);
        let segments = &entries[0].path;

        let mut resolved: Vec<(usize, Value)> = Vec::with_capacity(entries.len() + 1);
        for entry in entries {
            let value = match (&entry.value, entry.is_function, resolver) {
                (Value::String(expression), true, Some(resolver)) => {
                    resolver.resolve(expression).map_err(|source| {
                        MergeError::DeferredResolution {
                            path: path.to_string(),
                            source,
                        }
                    })?
                }
                (value, _, _) => value.clone(),
            };
            resolved.push((entry.precedence, value));
        }

        // A concrete value that already won the path outranks every
        // deferred entry.
        if let Some(existing) = get_value_at_path(result, segments) {
            if !existing.is_null() {
                let top = resolved.iter().map(|(p, _)| *p).max().unwrap_or(0);
                resolved.push((top + 1, existing.clone()));
            }
        }

        resolved.sort_by_key(|(precedence, _)| *precedence);
        let reduced = reduce_resolved(resolved, strategy)?;
        set_value_at_path(result, segments, reduced)?;
    }
    Ok(())
}

/// Collapse resolved entries (sorted by precedence) to one value. The kind
/// of the highest-precedence entry decides how: maps fold together, arrays
/// go through [`merge_slices`], and any other kind simply wins.
fn reduce_resolved(
    mut resolved: Vec<(usize, Value)>,
    strategy: ListMergeStrategy,
) -> Result<Value, MergeError> {
    let Some((_, last)) = resolved.pop() else {
        return Ok(Value::Null);
    };
    match last {
        Value::Map(map) => {
            let mut layers: Vec<Document> = resolved
                .into_iter()
                .filter_map(|(_, value)| match value {
                    Value::Map(map) => Some(map),
                    _ => None,
                })
                .collect();
            layers.push(map);
            Ok(Value::Map(merge_with_strategy(strategy, &layers)?))
        }
        Value::Array(items) => {
            let mut values: Vec<Value> = resolved.into_iter().map(|(_, v)| v).collect();
            values.push(Value::Array(items));
            merge_slices(&values, strategy)
        }
        other => Ok(other),
    }
}

/// Reconcile a precedence-ordered run of values into one sequence. Values
/// that are not sequences are skipped; sequence pairs follow the strategy
/// (replace: last wins; append: concatenate in order; merge: positional).
pub fn merge_slices(values: &[Value], strategy: ListMergeStrategy) -> Result<Value, MergeError> {
    let mut acc: Vec<Value> = Vec::new();
    for value in values {
        if let Value::Array(items) = value {
            match merge_arrays(&acc, items.clone(), strategy, "")? {
                Value::Array(merged) => acc = merged,
                other => return Ok(other),
            }
        }
    }
    Ok(Value::Array(acc))
}
