//! Recording provenance for a merged document.

use crate::context::MergeContext;
use crate::entry::{hash_value, ProvenanceEntry};
use crate::positions::PositionMap;
use strata_merge::{join_index, join_key, merge, Document, MergeError, MergeSettings, Value};

/// Merge `documents` and record provenance for every path of the result.
///
/// With `track_provenance` off (or a context that was never enabled) this is
/// exactly [`strata_merge::merge`]. Otherwise the merged tree is walked
/// deterministically — map keys sorted, sequence elements by index — and one
/// entry is recorded per path: containers record their own path and recurse,
/// scalars record their own path. File, kind, and depth come from the
/// context; line/column from `positions`, tolerating 0/0 when the path was
/// not in the rendered text.
pub fn merge_with_provenance(
    settings: Option<&MergeSettings>,
    documents: &[Document],
    ctx: &MergeContext,
    positions: &PositionMap,
) -> Result<Document, MergeError> {
    let track = settings.is_some_and(|s| s.track_provenance);
    let merged = merge(settings, documents)?;
    if track && ctx.is_provenance_enabled() {
        record_document(ctx, &merged, positions);
    }
    Ok(merged)
}

/// Record one document's tree into the context's store.
pub fn record_document(ctx: &MergeContext, doc: &Document, positions: &PositionMap) {
    record_map(ctx, doc, positions, "");
}

fn record_map(ctx: &MergeContext, map: &Document, positions: &PositionMap, base: &str) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_unstable();
    for key in keys {
        record_value(ctx, &join_key(base, key), &map[key.as_str()], positions);
    }
}

fn record_value(ctx: &MergeContext, path: &str, value: &Value, positions: &PositionMap) {
    let position = positions.get(path).copied().unwrap_or_default();
    ctx.record_provenance(
        path,
        ProvenanceEntry {
            file: ctx.current_file().unwrap_or("").to_string(),
            line: position.line,
            column: position.column,
            kind: ctx.provenance_kind(),
            value_hash: hash_value(value),
            depth: ctx.import_depth(),
        },
    );

    match value {
        Value::Map(nested) => record_map(ctx, nested, positions, path),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                record_value(ctx, &join_index(path, i), item, positions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::positions::positions_from_rendered_yaml;
    use strata_merge::documents_from_yaml_str;

    fn load(source: &str) -> Document {
        documents_from_yaml_str(source).unwrap().remove(0)
    }

    fn tracking_settings() -> MergeSettings {
        MergeSettings {
            list_merge_strategy: String::new(),
            track_provenance: true,
        }
    }

    #[test]
    fn test_disabled_tracking_records_nothing() {
        let mut ctx = MergeContext::new();
        ctx.enable_provenance();
        let ctx = Arc::new(ctx).with_file("base.yaml");

        let merged = merge_with_provenance(
            Some(&MergeSettings::default()),
            &[load("vars:\n  region: us-east-1\n")],
            &ctx,
            &PositionMap::new(),
        )
        .unwrap();

        assert_eq!(merged.len(), 1);
        assert!(ctx.provenance_paths().is_empty());
    }

    #[test]
    fn test_records_every_path_with_positions() {
        let text = "vars:\n  region: us-east-1\n  tags:\n    - core\n";
        let mut root = MergeContext::new();
        root.enable_provenance();
        let root = Arc::new(root);
        let ctx = root.with_file("stacks/base.yaml");
        let positions = positions_from_rendered_yaml(text);

        merge_with_provenance(Some(&tracking_settings()), &[load(text)], &ctx, &positions)
            .unwrap();

        assert_eq!(
            ctx.provenance_paths(),
            vec!["vars", "vars.region", "vars.tags", "vars.tags[0]"]
        );

        let region = ctx.get_provenance("vars.region");
        assert_eq!(region.len(), 1);
        assert_eq!(region[0].file, "stacks/base.yaml");
        assert_eq!(region[0].line, 2);
        assert_eq!(region[0].column, 3);
        assert!(region[0].is_valid());

        // The sequence item was positioned too.
        assert_eq!(ctx.get_provenance("vars.tags[0]")[0].line, 4);
    }

    #[test]
    fn test_missing_positions_are_tolerated() {
        let mut root = MergeContext::new();
        root.enable_provenance();
        let ctx = Arc::new(root).with_file("base.yaml");

        merge_with_provenance(
            Some(&tracking_settings()),
            &[load("key: value\n")],
            &ctx,
            &PositionMap::new(),
        )
        .unwrap();

        let chain = ctx.get_provenance("key");
        assert_eq!(chain[0].line, 0);
        assert_eq!(chain[0].column, 0);
        assert!(!chain[0].is_valid());
    }

    #[test]
    fn test_recording_is_deterministic() {
        let text = "b: 1\na:\n  z: 2\n  m: [x, y]\n";
        let doc = load(text);
        let positions = positions_from_rendered_yaml(text);

        let run = || {
            let mut root = MergeContext::new();
            root.enable_provenance();
            let ctx = Arc::new(root).with_file("base.yaml");
            record_document(&ctx, &doc, &positions);
            let paths = ctx.provenance_paths();
            let entries: Vec<Vec<ProvenanceEntry>> =
                paths.iter().map(|p| ctx.get_provenance(p)).collect();
            (paths, entries)
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_overriding_layers_chain_entries() {
        let mut root = MergeContext::new();
        root.enable_provenance();
        let root = Arc::new(root);
        let positions = PositionMap::new();

        let base_ctx = root.with_file("base.yaml");
        record_document(&base_ctx, &load("region: us-east-1\n"), &positions);
        let prod_ctx = root.with_file("prod.yaml");
        record_document(&prod_ctx, &load("region: us-west-2\n"), &positions);

        let chain = root.get_provenance("region");
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].file, "base.yaml");
        assert_eq!(chain[1].file, "prod.yaml");
        assert_ne!(chain[0].value_hash, chain[1].value_hash);
    }
}
