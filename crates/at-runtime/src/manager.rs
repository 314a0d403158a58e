//! The Change Management Loop (spec.md §4.2, §2 component J), grounded on
//! `original_source/autotransform/schema/schema.py`'s `Schema.manage` driver
//! loop generalized to operate over an injected `Repo`/`Runner` pair instead
//! of module-level singletons.

use at_core::emit_warning;
use at_schema::{ChangeTarget, Repo};
use tracing::{info, instrument};

use crate::error::{RuntimeError, RuntimeReason, RuntimeResult};
use crate::runner::Runner;
use crate::step::Step;

/// Drives every outstanding Change authored by the configured bot identity
/// through the configured [`Step`]s (spec.md §4.2).
pub struct Manager {
    pub repo: Box<dyn Repo>,
    pub steps: Vec<Step>,
    pub local_runner: Box<dyn Runner>,
    pub remote_runner: Box<dyn Runner>,
}

impl Manager {
    pub fn new(
        repo: Box<dyn Repo>,
        steps: Vec<Step>,
        local_runner: Box<dyn Runner>,
        remote_runner: Box<dyn Runner>,
    ) -> Self {
        Self { repo, steps, local_runner, remote_runner }
    }

    /// `manager.run(local)` (spec.md §4.2 contract): one pass over every
    /// outstanding Change, applying `self.steps` in order and stopping at
    /// the first step whose actions fired with `continue_if_passed = false`.
    /// Action failures are caught per-action, logged as a warning via the
    /// event sink, and do not abort the step or the pass (§4.2 step 3b, §7
    /// `ChangeActionError`).
    #[instrument(skip_all, fields(local))]
    pub fn run(&self, local: bool, now: i64) -> RuntimeResult<()> {
        let runner: &dyn Runner = if local { self.local_runner.as_ref() } else { self.remote_runner.as_ref() };

        let changes = self
            .repo
            .get_outstanding_changes()
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e)))?;
        info!(change_count = changes.len(), "fetched outstanding changes");

        for change in &changes {
            self.run_steps_for_change(change.as_ref(), runner, now);
        }
        Ok(())
    }

    fn run_steps_for_change(&self, change: &dyn ChangeTarget, runner: &dyn Runner, now: i64) {
        for step in &self.steps {
            let actions = step.get_actions(change, now);
            if actions.is_empty() {
                continue;
            }
            for action in actions {
                if let Err(e) = action.run(change, runner) {
                    emit_warning("manager", format!("change action failed: {e}"));
                }
            }
            if !step.continue_if_passed() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::condition::{Comparison, Condition, ReviewStateCondition};
    use at_core::{Batch, Bundle, ChangeState, ReviewState, TestState};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubChange {
        review_state: ReviewState,
        merge_calls: Arc<AtomicUsize>,
    }

    impl ChangeTarget for StubChange {
        fn schema_name(&self) -> &str {
            "s"
        }
        fn state(&self) -> ChangeState {
            ChangeState::Open
        }
        fn review_state(&self) -> ReviewState {
            self.review_state
        }
        fn test_state(&self) -> TestState {
            TestState::Pending
        }
        fn labels(&self) -> &[String] {
            &[]
        }
        fn reviewers(&self) -> &[String] {
            &[]
        }
        fn team_reviewers(&self) -> &[String] {
            &[]
        }
        fn created_at(&self) -> i64 {
            0
        }
        fn updated_at(&self) -> i64 {
            0
        }
        fn batch(&self) -> anyhow::Result<Batch> {
            anyhow::bail!("unused")
        }
        fn schema_bundle(&self) -> anyhow::Result<Bundle> {
            anyhow::bail!("unused")
        }
        fn abandon(&self) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn merge(&self) -> anyhow::Result<bool> {
            self.merge_calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
        fn add_labels(&self, _l: &[String]) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn remove_label(&self, _l: &str) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn add_reviewers(&self, _r: &[String], _t: &[String]) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn comment(&self, _b: &str) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    struct NoopRunner;
    impl Runner for NoopRunner {
        fn run(&self, _schema: &at_schema::Schema) -> RuntimeResult<()> {
            Ok(())
        }
        fn update(&self, _change: &dyn ChangeTarget) -> RuntimeResult<bool> {
            Ok(true)
        }
    }

    struct StubRepo;
    impl Repo for StubRepo {
        fn get_changed_files(&self, _batch: &Batch) -> anyhow::Result<Vec<String>> {
            Ok(vec![])
        }
        fn submit(&self, _b: &Batch, _t: &serde_json::Value, _c: Option<&dyn ChangeTarget>) -> anyhow::Result<()> {
            Ok(())
        }
        fn clean(&self, _b: &Batch) -> anyhow::Result<()> {
            Ok(())
        }
        fn rewind(&self, _b: &Batch) -> anyhow::Result<()> {
            Ok(())
        }
        fn get_outstanding_changes(&self) -> anyhow::Result<Vec<Box<dyn ChangeTarget>>> {
            // Only reachable through `run_steps_for_change` in this test, which
            // takes `&dyn ChangeTarget` directly — a thin adapter lets the
            // stub satisfy the trait's owned-box return type.
            unimplemented!("covered by `merge_on_approval_stops_subsequent_steps` directly")
        }
    }

    #[test]
    fn merge_on_approval_stops_subsequent_steps() {
        // spec.md §8 scenario 4 / P7: a step whose condition passes with
        // `continue_if_passed = false` stops the loop before later steps run.
        let merge_calls = Arc::new(AtomicUsize::new(0));
        let change = StubChange { review_state: ReviewState::Approved, merge_calls: merge_calls.clone() };

        let merge_step = crate::step::Step::Conditional {
            condition: Condition::ReviewState(
                ReviewStateCondition::new(Comparison::Equal, vec![ReviewState::Approved]).unwrap(),
            ),
            actions: vec![Action::Merge],
            continue_if_passed: false,
        };
        let abandon_step = crate::step::Step::Conditional {
            condition: Condition::ReviewState(
                ReviewStateCondition::new(Comparison::Equal, vec![ReviewState::Approved]).unwrap(),
            ),
            actions: vec![Action::Abandon],
            continue_if_passed: false,
        };

        let manager = Manager::new(
            Box::new(StubRepo),
            vec![merge_step, abandon_step],
            Box::new(NoopRunner),
            Box::new(NoopRunner),
        );
        manager.run_steps_for_change(&change, manager.local_runner.as_ref(), 0);

        assert_eq!(merge_calls.load(Ordering::SeqCst), 1);
    }
}
