//! The Schema Execution Pipeline (spec.md §4.1), grounded on the stage
//! sequencing of `wf-runtime::lifecycle::FusionEngine::start` (construct →
//! wire stages → run) generalized from a streaming engine's startup
//! sequence to a batch-oriented one.

use at_core::Batch;
use at_schema::{ChangeTarget, Schema};
use tracing::{info, instrument, warn};

use crate::error::{RuntimeError, RuntimeReason, RuntimeResult};

/// `schema.input.get_items()` → filter → batch (spec.md §4.1 steps 1-4).
#[instrument(skip_all, fields(schema = schema.config.schema_name.as_str()))]
pub fn get_batches(schema: &Schema) -> RuntimeResult<Vec<Batch>> {
    let items = schema
        .input
        .get_items()
        .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;

    let mut survivors = Vec::with_capacity(items.len());
    'items: for item in items {
        for entry in &schema.filters {
            let valid = entry
                .is_valid(&item)
                .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
            if !valid {
                continue 'items;
            }
        }
        survivors.push(item);
    }

    let batches = schema
        .batcher
        .batch(survivors)
        .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
    info!(batch_count = batches.len(), "schema produced batches");
    Ok(batches)
}

/// One full batch execution: clean → transform → pre-validation commands →
/// validators → post-validation commands → submit/rewind or abandon (spec.md
/// §4.1 steps 2-8). Returns whether a submission happened, so [`run`] can
/// enforce `max_submissions` (spec.md §4.1, "after each successful submit").
#[instrument(skip_all, fields(schema = schema.config.schema_name.as_str(), batch = batch.title.as_str()))]
pub fn execute_batch(schema: &Schema, batch: &Batch, change: Option<&dyn ChangeTarget>) -> RuntimeResult<bool> {
    let ctx = schema.pipeline_context();

    if let Some(repo) = schema.repo.as_deref() {
        repo.clean(batch)
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
    }

    let transform_data = schema
        .transformer
        .transform(batch, &ctx)
        .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;

    for command in schema.commands.iter().filter(|c| c.run_pre_validation()) {
        command
            .run(batch, &transform_data, &ctx)
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
    }

    for validator in &schema.validators {
        let result = validator
            .validate(batch, &transform_data, &ctx)
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
        if result.exceeds(schema.config.allowed_validation_level) {
            warn!(validator = result.validator.as_str(), level = ?result.level, "validator exceeded allowed level");
            return Err(RuntimeError::from(RuntimeReason::validation(result)));
        }
    }

    for command in schema.commands.iter().filter(|c| !c.run_pre_validation()) {
        command
            .run(batch, &transform_data, &ctx)
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
    }

    if let Some(repo) = schema.repo.as_deref() {
        let has_changes = repo
            .has_changes(batch)
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
        if has_changes {
            repo.submit(batch, &transform_data, change)
                .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
            repo.rewind(batch)
                .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
            return Ok(true);
        } else if let Some(change) = change {
            change
                .abandon()
                .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
        }
    }

    Ok(false)
}

/// `run(schema)` (spec.md §4.1 contract): every batch through
/// [`execute_batch`], stopping once `config.max_submissions` submissions
/// have happened. A submission is any batch whose `execute_batch` call made
/// it to the repo step with changes present (the abandon-only path does not
/// count).
#[instrument(skip_all, fields(schema = schema.config.schema_name.as_str()))]
pub fn run(schema: &Schema) -> RuntimeResult<()> {
    let batches = get_batches(schema)?;
    let mut submissions = 0u32;
    for batch in &batches {
        let submitted = execute_batch(schema, batch, None)?;
        if submitted {
            submissions += 1;
        }
        if let Some(max) = schema.config.max_submissions
            && submissions >= max
        {
            info!(max_submissions = max, "reached submission cap, stopping run");
            break;
        }
    }
    Ok(())
}
