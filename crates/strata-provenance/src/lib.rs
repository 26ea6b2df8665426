//! Provenance tracking for layered configuration merges.
//!
//! This crate answers "where did this value come from?" for documents merged
//! by `strata-merge`. Every merged path can carry a chain of
//! [`ProvenanceEntry`]s — file, line/column, kind, content hash, import
//! depth — ordered base layer first, so the last entry is the winner.
//!
//! # Architecture
//!
//! - [`ProvenanceStore`]: the synchronized path → entry-chain map, shared by
//!   every context of one merge
//! - [`MergeContext`]: per-file state (import chain, parent link, file-local
//!   positions) derived with [`MergeContext::with_file`] as imports are
//!   entered
//! - [`merge_with_provenance`]: merge and record in one step
//! - [`positions_from_rendered_yaml`]: recover line/column information from
//!   rendered YAML text
//!
//! Tracking is opt-in twice over: the context must be enabled and the merge
//! settings must ask for it. Disabled, everything here degrades to the plain
//! merge with no allocation or locking.

mod entry;
mod store;
mod context;
mod record;
mod positions;

pub use entry::{hash_value, ProvenanceEntry, ProvenanceKind};

pub use store::ProvenanceStore;

pub use context::{merge_with_context, ContextError, MergeContext};

pub use record::{merge_with_provenance, record_document};

pub use positions::{display_entries, positions_from_rendered_yaml, Position, PositionMap};
