//! Shared sentinel substitution for script-based components (spec.md §6.5),
//! grounded on `original_source/autotransform/command/script.py`'s
//! `_run_batch`/`_run_single`: three temp files (key, extra_data, metadata)
//! are always materialized, and any arg matching a sentinel token — or an
//! entry from `AUTO_TRANSFORM_SCRIPT_REPLACEMENTS` — is substituted before
//! the subprocess runs.

use std::collections::HashMap;
use std::io::Write;
use std::process::{Command as ProcessCommand, Output};

use at_core::{Batch, Item};
use serde_json::{json, Map, Value};
use tempfile::NamedTempFile;

/// Extra substitutions supplied by the environment (§6.6), layered under
/// the standard sentinel tokens so a declared `<<KEY>>` etc. always wins.
fn env_replacements() -> HashMap<String, String> {
    std::env::var("AUTO_TRANSFORM_SCRIPT_REPLACEMENTS")
        .ok()
        .and_then(|raw| serde_json::from_str::<HashMap<String, String>>(&raw).ok())
        .unwrap_or_default()
}

fn write_temp(contents: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// The `<<METADATA>>` value shared by batch and per-item script invocations:
/// the Batch's metadata plus its `title` (and `body`, if present).
pub fn batch_metadata_json(batch: &Batch) -> Value {
    let mut metadata = batch.metadata.extra.clone();
    metadata.insert("title".into(), json!(batch.title));
    if let Some(body) = &batch.metadata.body {
        metadata.insert("body".into(), json!(body));
    }
    Value::Object(metadata)
}

/// Runs `script` with `args`, substituting `<<KEY>>`/`<<EXTRA_DATA>>`/
/// `<<METADATA>>` (and their `_FILE` variants) for the whole Batch.
pub fn run_batch_script(script: &str, args: &[String], batch: &Batch) -> anyhow::Result<Output> {
    let keys: Vec<&str> = batch.items.iter().map(|i| i.key.as_str()).collect();
    let mut extra_data = Map::new();
    for item in &batch.items {
        if let Some(data) = &item.extra_data {
            extra_data.insert(item.key.clone(), Value::Object(data.clone()));
        }
    }
    let metadata = batch_metadata_json(batch);

    run_script(
        script,
        args,
        serde_json::to_string(&keys)?,
        serde_json::to_string(&extra_data)?,
        serde_json::to_string(&metadata)?,
    )
}

/// Runs `script` with `args` for a single Item (the `per_item` mode of
/// `ScriptCommand`/`ScriptValidator`, spec.md §6.5: "the single key
/// (per-item mode)").
pub fn run_item_script(
    script: &str,
    args: &[String],
    item: &Item,
    metadata: &Value,
) -> anyhow::Result<Output> {
    let extra_data = item
        .extra_data
        .as_ref()
        .map(|m| Value::Object(m.clone()))
        .unwrap_or_else(|| Value::Object(Map::new()));

    run_script(
        script,
        args,
        json!(item.key).to_string(),
        serde_json::to_string(&extra_data)?,
        serde_json::to_string(metadata)?,
    )
}

fn run_script(
    script: &str,
    args: &[String],
    key_json: String,
    extra_data_json: String,
    metadata_json: String,
) -> anyhow::Result<Output> {
    let key_file = write_temp(&key_json)?;
    let extra_file = write_temp(&extra_data_json)?;
    let metadata_file = write_temp(&metadata_json)?;

    let mut replacements = env_replacements();
    replacements.insert("<<KEY>>".into(), key_json);
    replacements.insert("<<EXTRA_DATA>>".into(), extra_data_json);
    replacements.insert("<<METADATA>>".into(), metadata_json);
    replacements.insert(
        "<<KEY_FILE>>".into(),
        key_file.path().display().to_string(),
    );
    replacements.insert(
        "<<EXTRA_DATA_FILE>>".into(),
        extra_file.path().display().to_string(),
    );
    replacements.insert(
        "<<METADATA_FILE>>".into(),
        metadata_file.path().display().to_string(),
    );

    let resolved: Vec<String> = args
        .iter()
        .map(|arg| replacements.get(arg).cloned().unwrap_or_else(|| arg.clone()))
        .collect();

    tracing::debug!(script, args = ?resolved, "running script command");
    let output = ProcessCommand::new(script).args(&resolved).output()?;
    // key_file/extra_file/metadata_file are dropped (and thus deleted) here,
    // after the subprocess has exited — matching the `with TmpFile(...)`
    // scope in the source.
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use at_core::BatchMetadata;

    #[test]
    fn batch_script_substitutes_key_and_metadata_file() {
        let batch = Batch {
            title: "t".into(),
            items: vec![Item::new("a"), Item::new("b")],
            metadata: BatchMetadata::default(),
        };
        let args = vec!["--keys".to_string(), "<<KEY>>".to_string(), "--meta".to_string(), "<<METADATA_FILE>>".to_string()];
        let output = run_batch_script("/bin/echo", &args, &batch).unwrap();
        assert!(output.status.success());
    }
}
