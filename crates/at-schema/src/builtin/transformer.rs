use at_core::{Batch, FileItem};
use regex::Regex;
use serde_json::{json, Value};
use std::path::PathBuf;

use super::script::run_batch_script;
use crate::traits::{PipelineContext, Transformer};

/// Replaces every match of `pattern` with `replacement` in each file Item of
/// the Batch (spec.md §8 scenario 1). `root` is the working-tree root the
/// Item keys are relative to.
pub struct RegexTransformer {
    root: PathBuf,
    pattern: Regex,
    replacement: String,
}

impl Transformer for RegexTransformer {
    fn transform(&self, batch: &Batch, _ctx: &dyn PipelineContext) -> anyhow::Result<Value> {
        let mut changed = Vec::new();
        for item in &batch.items {
            let file = FileItem::new(&self.root, item.key.clone());
            if !file.exists() {
                continue;
            }
            let content = file.get_content()?;
            let replaced = self.pattern.replace_all(&content, self.replacement.as_str());
            if replaced != content {
                file.write_content(&replaced)?;
                changed.push(item.key.clone());
            }
        }
        Ok(json!({ "changed_files": changed }))
    }
}

pub fn regex(params: &Value) -> anyhow::Result<Box<dyn Transformer>> {
    let pattern = params
        .get("pattern")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("regex transformer requires a 'pattern'"))?;
    let replacement = params
        .get("replacement")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("regex transformer requires a 'replacement'"))?
        .to_string();
    let root = params.get("root").and_then(Value::as_str).unwrap_or(".");
    Ok(Box::new(RegexTransformer {
        root: PathBuf::from(root),
        pattern: Regex::new(pattern)?,
        replacement,
    }))
}

/// Runs an external script against the whole Batch, with the sentinel
/// substitutions of spec.md §6.5. A non-zero exit propagates as an error
/// (per spec.md §6.5: "from a transformer or command, it propagates as an
/// exception"), matching
/// `original_source/autotransform/transformer/script.py`.
pub struct ScriptTransformer {
    script: String,
    args: Vec<String>,
}

impl Transformer for ScriptTransformer {
    fn transform(&self, batch: &Batch, _ctx: &dyn PipelineContext) -> anyhow::Result<Value> {
        let output = run_batch_script(&self.script, &self.args, batch)?;
        if !output.status.success() {
            anyhow::bail!(
                "script transformer '{}' exited with {}: {}",
                self.script,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if stdout.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&stdout).unwrap_or(Value::String(stdout))
        })
    }
}

pub fn script(params: &Value) -> anyhow::Result<Box<dyn Transformer>> {
    let (script, args) = super::command::parse_script_params(params)?;
    Ok(Box::new(ScriptTransformer { script, args }))
}
