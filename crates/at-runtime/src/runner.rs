//! Runner strategies (spec.md §2 component G, §4.2 `Update` action): execute
//! a Schema either in-process ([`LocalRunner`]) or by dispatching a remote
//! workflow ([`RemoteRunner`]), grounded on
//! `original_source/autotransform/runner/local.py` and `runner/github.py`.

use at_schema::{ChangeTarget, Schema};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::{RuntimeError, RuntimeReason, RuntimeResult};
use crate::pipeline;

/// Resolves a Change's embedded Schema bundle back into a live [`Schema`],
/// shared by both Runners' `update` path.
fn resolve_change_schema(change: &dyn ChangeTarget) -> RuntimeResult<Schema> {
    let bundle = change
        .schema_bundle()
        .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
    Schema::from_bundle(bundle.into_value()).map_err(|e| RuntimeError::from(RuntimeReason::Config(format!("{e}"))))
}

/// Triggers a full run of a Schema, or refreshes one outstanding Change
/// (spec.md §4.2 "Update" action; §2 component G).
pub trait Runner: Send + Sync {
    fn run(&self, schema: &Schema) -> RuntimeResult<()>;
    fn update(&self, change: &dyn ChangeTarget) -> RuntimeResult<bool>;
}

/// Runs the Schema or re-executes the Change's batch in-process, matching
/// `original_source/autotransform/runner/local.py`.
pub struct LocalRunner;

impl Runner for LocalRunner {
    #[instrument(skip_all, fields(schema = schema.config.schema_name.as_str()))]
    fn run(&self, schema: &Schema) -> RuntimeResult<()> {
        pipeline::run(schema)
    }

    fn update(&self, change: &dyn ChangeTarget) -> RuntimeResult<bool> {
        let schema = resolve_change_schema(change)?;
        let batch = change
            .batch()
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
        pipeline::execute_batch(&schema, &batch, Some(change))
    }
}

/// Dispatches a GitHub Actions `workflow_dispatch` event carrying the
/// serialized Schema (for `run`) or Change (for `update`), matching
/// `original_source/autotransform/runner/github.py`'s `GithubRunner`. The
/// actual pipeline execution happens in the remote workflow; this Runner
/// only triggers it.
pub struct RemoteRunner {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
    full_repo_name: String,
    base_branch: String,
    run_workflow: String,
    update_workflow: String,
}

impl RemoteRunner {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        full_repo_name: impl Into<String>,
        base_branch: impl Into<String>,
        run_workflow: impl Into<String>,
        update_workflow: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            full_repo_name: full_repo_name.into(),
            base_branch: base_branch.into(),
            run_workflow: run_workflow.into(),
            update_workflow: update_workflow.into(),
        }
    }

    fn dispatch(&self, workflow: &str, inputs: Value) -> RuntimeResult<()> {
        let url = format!(
            "{}/repos/{}/actions/workflows/{workflow}/dispatches",
            self.base_url, self.full_repo_name
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header("User-Agent", "autotransform-engine")
            .header("Accept", "application/vnd.github+json")
            .json(&json!({ "ref": self.base_branch, "inputs": inputs }))
            .send()
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e.into())))?;
        if !response.status().is_success() {
            return Err(RuntimeError::from(RuntimeReason::Component(format!(
                "dispatching workflow '{workflow}' failed: {}",
                response.status()
            ))));
        }
        debug!(workflow, "dispatched workflow run");
        Ok(())
    }
}

impl Runner for RemoteRunner {
    #[instrument(skip_all, fields(schema = schema.config.schema_name.as_str()))]
    fn run(&self, schema: &Schema) -> RuntimeResult<()> {
        self.dispatch(&self.run_workflow, json!({ "schema": schema.bundle().to_string() }))
    }

    fn update(&self, change: &dyn ChangeTarget) -> RuntimeResult<bool> {
        let schema_bundle = change
            .schema_bundle()
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
        let batch = change
            .batch()
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
        let change_bundle = json!({ "schema": schema_bundle.into_value(), "batch": batch });
        self.dispatch(&self.update_workflow, json!({ "change": change_bundle.to_string() }))?;
        Ok(true)
    }
}
