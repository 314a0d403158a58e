//! Sentinel-wrapped Schema/Batch embedding in the change body (spec.md §6.3),
//! grounded on `original_source/autotransform/change/github.py`'s
//! `_body_data` scan and `repo/github.py`'s `_get_encoded_json_lines`.

use at_core::Batch;
use serde_json::Value;

use crate::error::{RepoError, RepoReason};

const BEGIN_SCHEMA: &str = "<<<<BEGIN SCHEMA>>>>";
const END_SCHEMA: &str = "<<<<END SCHEMA>>>>";
const BEGIN_BATCH: &str = "<<<<BEGIN BATCH>>>>";
const END_BATCH: &str = "<<<<END BATCH>>>>";

/// Appends the sentinel-wrapped Schema and Batch bundles to a human-authored
/// body, in the `<details>`-collapsed form the source uses so review UIs
/// don't show a wall of JSON by default.
pub fn embed(body: &str, schema_bundle: &Value, batch: &Batch) -> String {
    let batch_json = serde_json::json!({
        "title": batch.title,
        "items": batch.items,
        "metadata": batch.metadata,
    });
    format!(
        "{body}\n\n\
         <details><summary>Schema JSON</summary>\n\n```\n{BEGIN_SCHEMA}\n{}\n{END_SCHEMA}\n```\n\n</details>\n\
         <details><summary>Batch JSON</summary>\n\n```\n{BEGIN_BATCH}\n{}\n{END_BATCH}\n```\n\n</details>\n",
        serde_json::to_string_pretty(schema_bundle).unwrap_or_default(),
        serde_json::to_string_pretty(&batch_json).unwrap_or_default(),
    )
}

/// Recovers the Schema bundle and Batch from a body produced by [`embed`].
/// Tolerates absent markers by returning a clear [`RepoReason::Body`] error
/// (spec.md §9: the lazily-computed cache "MUST tolerate absent markers by
/// raising a clear error").
pub fn extract(body: &str) -> Result<(Value, Batch), RepoError> {
    let schema_text = section(body, BEGIN_SCHEMA, END_SCHEMA)
        .ok_or_else(|| RepoError::from(RepoReason::Body("missing SCHEMA sentinel section".into())))?;
    let batch_text = section(body, BEGIN_BATCH, END_BATCH)
        .ok_or_else(|| RepoError::from(RepoReason::Body("missing BATCH sentinel section".into())))?;

    let schema: Value = serde_json::from_str(&schema_text)
        .map_err(|e| RepoError::from(RepoReason::Body(format!("decoding schema JSON: {e}"))))?;
    let batch: Batch = serde_json::from_str(&batch_text)
        .map_err(|e| RepoError::from(RepoReason::Body(format!("decoding batch JSON: {e}"))))?;
    Ok((schema, batch))
}

fn section(body: &str, begin: &str, end: &str) -> Option<String> {
    let start = body.find(begin)? + begin.len();
    let rest = &body[start..];
    let stop = rest.find(end)?;
    Some(rest[..stop].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use at_core::BatchMetadata;

    #[test]
    fn round_trips_through_embed_and_extract() {
        let schema_bundle = serde_json::json!({"config": {"schema_name": "s"}});
        let batch = Batch {
            title: "t".into(),
            items: vec![at_core::Item::new("a")],
            metadata: BatchMetadata::default(),
        };
        let body = embed("hand-written summary", &schema_bundle, &batch);
        let (schema, recovered) = extract(&body).unwrap();
        assert_eq!(schema["config"]["schema_name"], "s");
        assert_eq!(recovered.title, "t");
        assert_eq!(recovered.items, batch.items);
    }

    #[test]
    fn missing_markers_is_a_clear_error() {
        let err = extract("no markers here").unwrap_err();
        assert!(format!("{err}").contains("SCHEMA sentinel"));
    }
}
