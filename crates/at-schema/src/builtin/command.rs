use at_core::Batch;
use serde_json::Value;

use super::script::{batch_metadata_json, run_batch_script, run_item_script};
use crate::traits::{Command, PipelineContext};

pub(super) fn parse_script_params(params: &Value) -> anyhow::Result<(String, Vec<String>)> {
    let script = params
        .get("script")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("script component requires a 'script'"))?
        .to_string();
    let args = params
        .get("args")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("script component requires 'args'"))?
        .iter()
        .map(|v| v.as_str().map(str::to_owned))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| anyhow::anyhow!("'args' must be an array of strings"))?;
    Ok((script, args))
}

/// Runs an external script either once against the whole Batch, or once per
/// Item when `per_item` is set (spec.md §6.5: "the single key (per-item
/// mode)"), either pre- or post-validation depending on `run_pre_validation`
/// (spec.md §4.1 steps 4 and 6), with the sentinel substitutions of §6.5.
/// Matches `original_source/autotransform/command/script.py`'s
/// `ScriptCommand`.
pub struct ScriptCommand {
    script: String,
    args: Vec<String>,
    run_pre_validation: bool,
    per_item: bool,
}

impl Command for ScriptCommand {
    fn run(&self, batch: &Batch, _transform_data: &Value, _ctx: &dyn PipelineContext) -> anyhow::Result<()> {
        if self.per_item {
            let metadata = batch_metadata_json(batch);
            for item in &batch.items {
                let output = run_item_script(&self.script, &self.args, item, &metadata)?;
                if !output.status.success() {
                    anyhow::bail!(
                        "script command '{}' exited with {} for item '{}': {}",
                        self.script,
                        output.status,
                        item.key,
                        String::from_utf8_lossy(&output.stderr)
                    );
                }
            }
            return Ok(());
        }

        let output = run_batch_script(&self.script, &self.args, batch)?;
        if !output.status.success() {
            anyhow::bail!(
                "script command '{}' exited with {}: {}",
                self.script,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    fn run_pre_validation(&self) -> bool {
        self.run_pre_validation
    }
}

pub fn script(params: &Value) -> anyhow::Result<Box<dyn Command>> {
    let (script, args) = parse_script_params(params)?;
    let run_pre_validation = params
        .get("run_pre_validation")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let per_item = params.get("per_item").and_then(Value::as_bool).unwrap_or(false);
    Ok(Box::new(ScriptCommand {
        script,
        args,
        run_pre_validation,
        per_item,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use at_core::{BatchMetadata, Item};

    #[test]
    fn per_item_mode_runs_the_script_once_per_item() {
        let command = ScriptCommand {
            script: "/bin/echo".into(),
            args: vec!["<<KEY>>".to_string()],
            run_pre_validation: false,
            per_item: true,
        };
        let batch = Batch {
            title: "t".into(),
            items: vec![Item::new("a"), Item::new("b")],
            metadata: BatchMetadata::default(),
        };
        command.run(&batch, &Value::Null, &crate::traits::NullContext).unwrap();
    }
}
