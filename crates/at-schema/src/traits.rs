//! Component trait seams (spec.md §4.1, §6.2) plus the `Repo`/`ChangeTarget`
//! pair. `Repo` lives in this crate rather than in `at-repo` precisely to
//! break the Change ⇄ Schema ⇄ Repo cycle noted in spec.md §9: `Schema`
//! (here) holds an `Option<Box<dyn Repo>>`, and `Repo::submit`/
//! `get_outstanding_changes` only ever need the `ChangeTarget` seam, never a
//! concrete `Change`. `at-repo`'s `Change` type implements `ChangeTarget`
//! without `at-schema` needing to know about it.

use at_core::{Batch, Bundle, ChangeState, Item, ReviewState, TestState, ValidationResult};
use serde_json::Value;

/// What a component can see of the schema currently executing, threaded
/// explicitly through pipeline calls instead of a process-wide global
/// (spec.md §9 — "current schema" MUST NOT be a true global in a
/// reimplementation that supports concurrent pipelines).
pub trait PipelineContext {
    fn schema_name(&self) -> &str;
    fn repo(&self) -> Option<&dyn Repo>;
}

/// Discovers candidate work items (component A's producer side).
pub trait Input: Send + Sync {
    fn get_items(&self) -> anyhow::Result<Vec<Item>>;
}

/// A single predicate over an Item. `FilterEntry` wraps one with the
/// `inverted` flag spec.md §4.1 step 3 describes, so the pipeline never has
/// to special-case inversion per concrete Filter.
pub trait Filter: Send + Sync {
    fn is_valid(&self, item: &Item) -> anyhow::Result<bool>;
}

pub struct FilterEntry {
    pub filter: Box<dyn Filter>,
    pub inverted: bool,
}

impl FilterEntry {
    pub fn new(filter: Box<dyn Filter>) -> Self {
        Self {
            filter,
            inverted: false,
        }
    }

    pub fn inverted(filter: Box<dyn Filter>) -> Self {
        Self {
            filter,
            inverted: true,
        }
    }

    pub fn is_valid(&self, item: &Item) -> anyhow::Result<bool> {
        let verdict = self.filter.is_valid(item)?;
        Ok(if self.inverted { !verdict } else { verdict })
    }
}

/// Groups filtered items into zero or more Batches, preserving order.
pub trait Batcher: Send + Sync {
    fn batch(&self, items: Vec<Item>) -> anyhow::Result<Vec<Batch>>;
}

/// Mutates the working tree for one Batch (via `FileItem::write_content` or
/// similar side effects) and returns opaque data later stages consume. `ctx`
/// exposes the current schema's Repo (spec.md §3: "components (transformers,
/// validators reading changed files) can reach the Repo"), the same seam
/// `Command::run` already gets.
pub trait Transformer: Send + Sync {
    fn transform(&self, batch: &Batch, ctx: &dyn PipelineContext) -> anyhow::Result<Value>;
}

/// Checks one property of a transformed Batch, returning the severity level
/// observed (spec.md §4.1 step 5). `ctx` lets a validator read the Repo's
/// changed files the way `Command::run` can.
pub trait Validator: Send + Sync {
    fn validate(
        &self,
        batch: &Batch,
        transform_data: &Value,
        ctx: &dyn PipelineContext,
    ) -> anyhow::Result<ValidationResult>;
}

/// A side-effecting step that runs either before validation (gating nothing)
/// or after (gated on validator success) — see spec.md §4.1 steps 4 and 6.
pub trait Command: Send + Sync {
    fn run(&self, batch: &Batch, transform_data: &Value, ctx: &dyn PipelineContext)
        -> anyhow::Result<()>;

    fn run_pre_validation(&self) -> bool {
        false
    }
}

/// The read/act surface of one outstanding Change (spec.md §3, §4.2). Kept
/// minimal enough that `Repo` (defined alongside it, for the reason above)
/// never needs a concrete `Change` type, but rich enough that the Change
/// Management Loop and its Conditions/Actions need nothing else.
pub trait ChangeTarget: Send + Sync {
    fn schema_name(&self) -> &str;
    fn state(&self) -> ChangeState;
    fn review_state(&self) -> ReviewState;
    fn test_state(&self) -> TestState;
    fn labels(&self) -> &[String];
    fn reviewers(&self) -> &[String];
    fn team_reviewers(&self) -> &[String];
    fn created_at(&self) -> i64;
    fn updated_at(&self) -> i64;

    /// Recovers the embedded Batch from the change body (§6.3). Lazily
    /// computed and cached at most once per Change value (§9) — the
    /// concrete implementation, not this trait, owns that caching.
    fn batch(&self) -> anyhow::Result<Batch>;
    /// Recovers the embedded Schema bundle, for schemas that need to
    /// re-resolve the owning Schema (e.g. to re-run `execute_batch`).
    fn schema_bundle(&self) -> anyhow::Result<Bundle>;

    fn abandon(&self) -> anyhow::Result<bool>;
    fn merge(&self) -> anyhow::Result<bool>;
    fn add_labels(&self, labels: &[String]) -> anyhow::Result<bool>;
    fn remove_label(&self, label: &str) -> anyhow::Result<bool>;
    fn add_reviewers(&self, reviewers: &[String], team_reviewers: &[String])
        -> anyhow::Result<bool>;
    fn comment(&self, body: &str) -> anyhow::Result<bool>;
}

/// A [`PipelineContext`] exposing no Repo, for builtin-component unit tests
/// that don't need one.
#[cfg(test)]
pub(crate) struct NullContext;

#[cfg(test)]
impl PipelineContext for NullContext {
    fn schema_name(&self) -> &str {
        "test"
    }

    fn repo(&self) -> Option<&dyn Repo> {
        None
    }
}

/// Adapter to the underlying VCS/review system (spec.md §6.2).
pub trait Repo: Send + Sync {
    fn get_changed_files(&self, batch: &Batch) -> anyhow::Result<Vec<String>>;

    fn has_changes(&self, batch: &Batch) -> anyhow::Result<bool> {
        Ok(!self.get_changed_files(batch)?.is_empty())
    }

    fn submit(
        &self,
        batch: &Batch,
        transform_data: &Value,
        change: Option<&dyn ChangeTarget>,
    ) -> anyhow::Result<()>;

    fn clean(&self, batch: &Batch) -> anyhow::Result<()>;
    fn rewind(&self, batch: &Batch) -> anyhow::Result<()>;
    fn get_outstanding_changes(&self) -> anyhow::Result<Vec<Box<dyn ChangeTarget>>>;

    fn has_outstanding_change(&self, batch: &Batch) -> anyhow::Result<bool> {
        Ok(self
            .get_outstanding_changes()?
            .iter()
            .any(|c| c.batch().map(|b| b.title == batch.title).unwrap_or(false)))
    }
}
