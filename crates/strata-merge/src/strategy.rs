//! List-merge strategies and engine settings.
//!
//! The strategy governs how sequence values at the same path are reconciled
//! across layers. It arrives as a string in [`MergeSettings`] (the settings
//! object the host application deserializes from its own configuration) and
//! is parsed once per merge call; an unrecognized name is a configuration
//! error, not a silent default.

use crate::error::MergeError;
use serde::{Deserialize, Serialize};

/// How sequences at the same path are reconciled across layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMergeStrategy {
    /// The later layer's list wins entirely.
    #[default]
    Replace,
    /// Lists are concatenated in layer order.
    Append,
    /// Lists are deep-merged positionally: element *i* of each successive
    /// list merges into element *i* of the accumulated result; map pairs
    /// merge recursively, non-map pairs take the later element, and elements
    /// beyond the shorter list are kept.
    Merge,
}

pub const LIST_MERGE_STRATEGY_REPLACE: &str = "replace";
pub const LIST_MERGE_STRATEGY_APPEND: &str = "append";
pub const LIST_MERGE_STRATEGY_MERGE: &str = "merge";

impl ListMergeStrategy {
    /// Parse a strategy name. Case-sensitive; the empty string selects the
    /// default (`Replace`).
    pub fn parse(name: &str) -> Result<Self, MergeError> {
        match name {
            "" | LIST_MERGE_STRATEGY_REPLACE => Ok(ListMergeStrategy::Replace),
            LIST_MERGE_STRATEGY_APPEND => Ok(ListMergeStrategy::Append),
            LIST_MERGE_STRATEGY_MERGE => Ok(ListMergeStrategy::Merge),
            other => Err(MergeError::InvalidListMergeStrategy(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ListMergeStrategy::Replace => LIST_MERGE_STRATEGY_REPLACE,
            ListMergeStrategy::Append => LIST_MERGE_STRATEGY_APPEND,
            ListMergeStrategy::Merge => LIST_MERGE_STRATEGY_MERGE,
        }
    }
}

impl std::fmt::Display for ListMergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine settings supplied by the host application.
///
/// The strategy is kept as the raw string so the settings struct can be
/// deserialized directly from host configuration; validation happens at
/// merge time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSettings {
    /// One of `replace` / `append` / `merge`; empty defaults to `replace`.
    #[serde(default)]
    pub list_merge_strategy: String,

    /// Gates provenance recording. When false, no provenance work happens
    /// at all.
    #[serde(default)]
    pub track_provenance: bool,
}

impl MergeSettings {
    /// Settings with an explicit strategy.
    pub fn with_strategy(strategy: ListMergeStrategy) -> Self {
        Self {
            list_merge_strategy: strategy.name().to_string(),
            track_provenance: false,
        }
    }

    /// Parse the configured strategy string.
    pub fn strategy(&self) -> Result<ListMergeStrategy, MergeError> {
        ListMergeStrategy::parse(&self.list_merge_strategy)
    }
}
