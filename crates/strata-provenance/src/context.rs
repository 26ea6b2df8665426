//! Per-file merge context.
//!
//! A context travels with each file as the host walks a tree of imports.
//! Contexts live in `Arc` once the root is configured;
//! [`MergeContext::with_file`] derives a child for every file entered: the
//! child carries the grown import chain and a parent link (for depth
//! computation) while sharing the provenance store, so entries recorded deep
//! in the import tree land in the root's store. Worker threads resolving
//! imports in parallel each get their own child context; the store is the
//! only shared state and synchronizes internally.
//!
//! Provenance is off by default. A context without a store records nothing
//! and costs nothing.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::entry::{ProvenanceEntry, ProvenanceKind};
use crate::positions::{Position, PositionMap};
use crate::store::ProvenanceStore;
use strata_merge::{merge, Document, MergeError, MergeSettings};

/// A merge error decorated with file and import-chain information.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ContextError {
    message: String,
    #[source]
    source: MergeError,
}

impl ContextError {
    fn bare(source: MergeError) -> Self {
        Self {
            message: source.to_string(),
            source,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Context for one file's participation in a merge.
#[derive(Debug, Clone, Default)]
pub struct MergeContext {
    current_file: Option<String>,
    /// Root-first chain of files leading to `current_file`, inclusive.
    import_chain: Vec<String>,
    parent: Option<Arc<MergeContext>>,
    store: Option<Arc<ProvenanceStore>>,
    /// Positions within `current_file`'s rendered text.
    positions: PositionMap,
}

impl MergeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the provenance store. Idempotent; an already-enabled
    /// context keeps its store and all recorded entries.
    pub fn enable_provenance(&mut self) {
        if self.store.is_none() {
            debug!("provenance tracking enabled");
            self.store = Some(Arc::new(ProvenanceStore::new()));
        }
    }

    pub fn is_provenance_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Derive the context for entering `file`: the import chain grows, the
    /// store stays shared, and file-local positions reset. The parent link is
    /// a refcount bump, so deriving stays cheap however deep the chain gets.
    pub fn with_file(self: &Arc<Self>, file: &str) -> Arc<Self> {
        self.with_file_positions(file, PositionMap::new())
    }

    pub fn current_file(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    pub fn import_chain(&self) -> &[String] {
        &self.import_chain
    }

    /// Derive a child like [`MergeContext::with_file`] with positions scanned
    /// from the file's rendered text attached in the same step.
    pub fn with_file_positions(
        self: &Arc<Self>,
        file: &str,
        positions: PositionMap,
    ) -> Arc<Self> {
        let mut import_chain = self.import_chain.clone();
        import_chain.push(file.to_string());
        Arc::new(Self {
            current_file: Some(file.to_string()),
            import_chain,
            parent: Some(Arc::clone(self)),
            store: self.store.clone(),
            positions,
        })
    }

    /// The recorded position of `path` in this file, if known.
    pub fn position_of(&self, path: &str) -> Option<Position> {
        self.positions.get(path).copied()
    }

    /// How many files were entered above the current one. The first file is
    /// depth 0; values it imports are processed at depth 1, and so on.
    pub fn import_depth(&self) -> u32 {
        let mut depth = 0;
        let mut node = self.parent.as_deref();
        while let Some(ctx) = node {
            if ctx.current_file.is_some() {
                depth += 1;
            }
            node = ctx.parent.as_deref();
        }
        depth
    }

    /// The kind entries recorded through this context carry.
    pub fn provenance_kind(&self) -> ProvenanceKind {
        if self.import_depth() > 0 {
            ProvenanceKind::Import
        } else {
            ProvenanceKind::Inline
        }
    }

    /// Record an entry at `path`. A no-op when provenance is disabled.
    pub fn record_provenance(&self, path: &str, entry: ProvenanceEntry) {
        if let Some(store) = &self.store {
            trace!(path, file = %entry.file, line = entry.line, "recording provenance");
            store.record(path, entry);
        }
    }

    pub fn get_provenance(&self, path: &str) -> Vec<ProvenanceEntry> {
        self.store
            .as_ref()
            .map(|store| store.get(path))
            .unwrap_or_default()
    }

    pub fn has_provenance(&self, path: &str) -> bool {
        self.store.as_ref().is_some_and(|store| store.has(path))
    }

    pub fn provenance_paths(&self) -> Vec<String> {
        self.store
            .as_ref()
            .map(|store| store.paths())
            .unwrap_or_default()
    }

    /// An independent copy whose store no longer feeds the original's. Used
    /// when a subtree of imports must be merged speculatively.
    pub fn deep_clone(&self) -> Self {
        let mut copy = self.clone();
        copy.store = self
            .store
            .as_ref()
            .map(|store| Arc::new(store.deep_clone()));
        copy
    }

    /// Decorate a merge error with this context's file, import chain, and
    /// any extra diagnostic lines.
    pub fn format_error(&self, source: MergeError, extra_lines: &[String]) -> ContextError {
        let mut message = source.to_string();

        if let Some(file) = &self.current_file {
            message.push_str(&format!("\n  in file: {file}"));
        }
        if !self.import_chain.is_empty() {
            message.push_str("\n  import chain:");
            for (i, file) in self.import_chain.iter().enumerate() {
                message.push_str("\n    ");
                message.push_str(&"  ".repeat(i));
                if i > 0 {
                    message.push_str("-> ");
                }
                message.push_str(file);
            }
        }
        for line in extra_lines {
            message.push_str(&format!("\n  {line}"));
        }
        if matches!(source, MergeError::IncompatibleTypes { .. }) {
            message.push_str(
                "\n  hint: a key is typed inconsistently across the merged files \
                 (for example a list in one file and a scalar in another)",
            );
        }

        ContextError { message, source }
    }
}

/// Merge with error decoration: failures are annotated with the context's
/// file and import chain.
pub fn merge_with_context(
    settings: Option<&MergeSettings>,
    documents: &[Document],
    ctx: Option<&MergeContext>,
) -> Result<Document, ContextError> {
    merge(settings, documents).map_err(|err| match ctx {
        Some(ctx) => ctx.format_error(err, &[]),
        None => ContextError::bare(err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::hash_value;
    use strata_merge::Value;

    fn entry_for(ctx: &MergeContext, line: u32) -> ProvenanceEntry {
        ProvenanceEntry {
            file: ctx.current_file().unwrap_or("").to_string(),
            line,
            column: 1,
            kind: ctx.provenance_kind(),
            value_hash: hash_value(&Value::Null),
            depth: ctx.import_depth(),
        }
    }

    #[test]
    fn test_disabled_context_records_nothing() {
        let ctx = Arc::new(MergeContext::new()).with_file("stacks/base.yaml");
        ctx.record_provenance("vars.region", entry_for(&ctx, 3));

        assert!(!ctx.is_provenance_enabled());
        assert!(!ctx.has_provenance("vars.region"));
        assert!(ctx.provenance_paths().is_empty());
    }

    #[test]
    fn test_enable_is_idempotent() {
        let mut ctx = MergeContext::new();
        ctx.enable_provenance();
        ctx.record_provenance("key", entry_for(&ctx, 1));

        ctx.enable_provenance();
        assert!(ctx.has_provenance("key"));
    }

    #[test]
    fn test_children_share_the_store() {
        let mut root = MergeContext::new();
        root.enable_provenance();
        let root = Arc::new(root);

        let top = root.with_file("stacks/prod.yaml");
        let import = top.with_file("mixins/region.yaml");
        import.record_provenance("vars.region", entry_for(&import, 2));

        assert!(root.has_provenance("vars.region"));
        assert_eq!(root.get_provenance("vars.region")[0].file, "mixins/region.yaml");
    }

    #[test]
    fn test_import_depth_and_kind() {
        let mut root = MergeContext::new();
        root.enable_provenance();
        let root = Arc::new(root);
        assert_eq!(root.import_depth(), 0);

        let top = root.with_file("stacks/prod.yaml");
        assert_eq!(top.import_depth(), 0);
        assert_eq!(top.provenance_kind(), ProvenanceKind::Inline);

        let import = top.with_file("mixins/region.yaml");
        assert_eq!(import.import_depth(), 1);
        assert_eq!(import.provenance_kind(), ProvenanceKind::Import);

        let nested = import.with_file("mixins/base.yaml");
        assert_eq!(nested.import_depth(), 2);
        assert_eq!(
            nested.import_chain(),
            &[
                "stacks/prod.yaml".to_string(),
                "mixins/region.yaml".to_string(),
                "mixins/base.yaml".to_string()
            ]
        );
    }

    #[test]
    fn test_deep_clone_detaches_the_store() {
        let mut root = MergeContext::new();
        root.enable_provenance();
        let root = Arc::new(root);
        let ctx = root.with_file("a.yaml");
        ctx.record_provenance("x", entry_for(&ctx, 1));

        let detached = ctx.deep_clone();
        detached.record_provenance("y", entry_for(&detached, 2));

        assert!(!root.has_provenance("y"));
        assert!(detached.has_provenance("x"));
        assert!(detached.has_provenance("y"));
    }

    #[test]
    fn test_positions_attach_at_derivation() {
        let mut positions = PositionMap::new();
        positions.insert(
            "vars.region".to_string(),
            Position { line: 2, column: 3 },
        );

        let ctx = Arc::new(MergeContext::new()).with_file_positions("base.yaml", positions);
        assert_eq!(
            ctx.position_of("vars.region"),
            Some(Position { line: 2, column: 3 })
        );
        assert_eq!(ctx.position_of("vars.missing"), None);

        // Positions are file-local; a further derivation starts clean.
        let child = ctx.with_file("mixins/region.yaml");
        assert_eq!(child.position_of("vars.region"), None);
    }

    #[test]
    fn test_format_error_includes_chain_and_hint() {
        let ctx = Arc::new(MergeContext::new())
            .with_file("stacks/prod.yaml")
            .with_file("mixins/region.yaml");

        let err = ctx.format_error(
            MergeError::IncompatibleTypes {
                path: "vars.list".into(),
                dest: strata_merge::ValueKind::Array,
                src: strata_merge::ValueKind::String,
            },
            &["while processing component `vpc`".to_string()],
        );

        let msg = err.message();
        assert!(msg.contains("vars.list"));
        assert!(msg.contains("in file: mixins/region.yaml"));
        assert!(msg.contains("import chain:"));
        assert!(msg.contains("stacks/prod.yaml"));
        assert!(msg.contains("-> mixins/region.yaml"));
        assert!(msg.contains("while processing component `vpc`"));
        assert!(msg.contains("typed inconsistently"));
    }

    #[test]
    fn test_merge_with_context_decorates_failures() {
        let ctx = Arc::new(MergeContext::new()).with_file("stacks/prod.yaml");
        let err = merge_with_context(None, &[], Some(ctx.as_ref())).unwrap_err();
        assert!(err.message().contains("configuration is nil"));
        assert!(err.message().contains("stacks/prod.yaml"));
    }
}
