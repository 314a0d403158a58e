use at_core::{Batch, ValidationLevel, ValidationResult};
use serde_json::Value;

use super::script::{batch_metadata_json, run_batch_script, run_item_script};
use crate::traits::{PipelineContext, Validator};

/// Runs an external script — once against the whole Batch, or once per Item
/// when `per_item` is set (spec.md §6.5) — and maps a non-zero exit to the
/// validator's declared `failure_level` (spec.md §6.5: "A non-zero exit code
/// from a validator maps to the component's declared `failure_level`"),
/// matching `original_source/autotransform/validator/script.py`.
pub struct ScriptValidator {
    name: String,
    script: String,
    args: Vec<String>,
    failure_level: ValidationLevel,
    per_item: bool,
}

impl ScriptValidator {
    fn result_for(&self, output: &std::process::Output) -> ValidationResult {
        if output.status.success() {
            return ValidationResult::new(&self.name, ValidationLevel::None);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let mut result = ValidationResult::new(&self.name, self.failure_level);
        if !stderr.is_empty() {
            result = result.with_message(stderr);
        }
        result
    }
}

impl Validator for ScriptValidator {
    fn validate(
        &self,
        batch: &Batch,
        _transform_data: &Value,
        _ctx: &dyn PipelineContext,
    ) -> anyhow::Result<ValidationResult> {
        if self.per_item {
            let metadata = batch_metadata_json(batch);
            for item in &batch.items {
                let output = run_item_script(&self.script, &self.args, item, &metadata)?;
                let result = self.result_for(&output);
                if result.level > ValidationLevel::None {
                    return Ok(result);
                }
            }
            return Ok(ValidationResult::new(&self.name, ValidationLevel::None));
        }

        let output = run_batch_script(&self.script, &self.args, batch)?;
        Ok(self.result_for(&output))
    }
}

pub fn script(params: &Value) -> anyhow::Result<Box<dyn Validator>> {
    let (script, args) = super::command::parse_script_params(params)?;
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("script_validator")
        .to_string();
    let failure_level = match params.get("failure_level").and_then(Value::as_str) {
        Some("WARNING") => ValidationLevel::Warning,
        _ => ValidationLevel::Error,
    };
    let per_item = params.get("per_item").and_then(Value::as_bool).unwrap_or(false);
    Ok(Box::new(ScriptValidator {
        name,
        script,
        args,
        failure_level,
        per_item,
    }))
}
