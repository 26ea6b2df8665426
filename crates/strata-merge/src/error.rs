//! Merge error taxonomy.
//!
//! Every failure in this crate is a [`MergeError`]; callers test "did the
//! merge fail" by matching on the enum and read the human detail from the
//! `Display` output. Nothing in this crate prints or logs — all failure
//! information flows through return values.

use crate::value::ValueKind;
use thiserror::Error;

/// Boxed error returned by injected expression resolvers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the merge engine and the deferred-value machinery.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The settings object was absent. Mirrors the upstream contract where a
    /// nil configuration is an error, never a crash.
    #[error("merge failed: configuration is nil")]
    MissingSettings,

    /// The configured list merge strategy is not one of the legal names.
    #[error(
        "invalid list merge strategy `{0}`. Valid strategies are: replace, append, merge"
    )]
    InvalidListMergeStrategy(String),

    /// Two non-null values of different kinds met at the same path.
    #[error("cannot override two values of different type at `{path}`: {dest} vs {src}")]
    IncompatibleTypes {
        path: String,
        dest: ValueKind,
        src: ValueKind,
    },

    /// The injected resolver failed for a deferred expression.
    #[error("failed to process deferred expression at `{path}`")]
    DeferredResolution {
        path: String,
        #[source]
        source: BoxError,
    },

    /// A write-back tried to descend through a value that is not a mapping.
    #[error("cannot navigate path `{path}`: segment `{segment}` is not a map")]
    PathNotNavigable { path: String, segment: String },

    /// A write-back was attempted with an empty path.
    #[error("cannot set value at empty path")]
    EmptyPath,

    /// A YAML layer failed to scan.
    #[error("failed to parse YAML document")]
    YamlParse(#[from] yaml_rust2::ScanError),

    /// A parsed layer was not a mapping at the top level.
    #[error("top-level value is not a mapping: {0}")]
    TopLevelNotMap(ValueKind),
}
