//! Deep-merging for layered configuration documents.
//!
//! This crate folds an ordered stack of configuration layers into a single
//! document: later layers win for scalars and mapping keys, sequences are
//! reconciled by a configurable strategy, and string values that are really
//! host-environment function calls (`!template`, `!terraform.output`, ...)
//! are deferred out of the merge and resolved afterwards with correct
//! precedence.
//!
//! # Key Features
//!
//! - **Pure merging**: inputs are deep-copied, never mutated; a failed merge
//!   returns an error and no partial result
//! - **List strategies**: `replace`, `append`, or positional `merge`, chosen
//!   globally with a per-key `key+` append escape hatch
//! - **Type safety**: two values of different kinds at the same path are a
//!   reported error, not a silent override
//! - **Deferred expressions**: expression strings merge as type-neutral
//!   placeholders and are resolved after the merge settles
//!
//! # Example
//!
//! ```rust
//! use strata_merge::{merge, MergeSettings, Value};
//!
//! let base = strata_merge::documents_from_yaml_str("vars:\n  region: us-east-1\n")?;
//! let over = strata_merge::documents_from_yaml_str("vars:\n  region: us-west-2\n")?;
//!
//! let mut layers = base;
//! layers.extend(over);
//! let merged = merge(Some(&MergeSettings::default()), &layers)?;
//!
//! let vars = merged.get("vars").and_then(Value::as_map).unwrap();
//! assert_eq!(vars.get("region").and_then(Value::as_str), Some("us-west-2"));
//! # Ok::<(), strata_merge::MergeError>(())
//! ```

mod value;
mod error;
mod strategy;
mod path;
mod normalize;
mod merge;
mod deferred;

pub use value::{
    deep_copy_document,
    deep_copy_value,
    Document,
    Value,
    ValueKind,
};

pub use error::{BoxError, MergeError};

pub use strategy::{
    ListMergeStrategy,
    MergeSettings,
    LIST_MERGE_STRATEGY_APPEND,
    LIST_MERGE_STRATEGY_MERGE,
    LIST_MERGE_STRATEGY_REPLACE,
};

pub use path::{
    get_value_at_path,
    join_index,
    join_key,
    join_segments,
    set_value_at_path,
};

pub use normalize::{
    document_from_json,
    documents_from_yaml_str,
    value_from_json,
    value_from_yaml,
    IntoValue,
};

pub use merge::{merge, merge_with_strategy};

pub use deferred::{
    apply_deferred_merges,
    merge_slices,
    merge_with_deferred,
    walk_and_defer,
    DeferredMergeContext,
    DeferredValue,
    ExpressionResolver,
    MarkerSet,
};
