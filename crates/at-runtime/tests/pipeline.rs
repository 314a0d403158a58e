//! Integration tests for the Schema Execution Pipeline (spec.md §4.1, §8):
//! filter/batch ordering (P1), the no-op-transform abandon path (P2), the
//! validator gate (P3), and the submit and validation-failure end-to-end
//! scenarios. Every fake below stands in for a Factory-registered component
//! but is built directly through [`Schema::from_parts`], since the
//! process-wide Factory can only hold plain `fn` constructors and these
//! tests need components with shared, mutable call counters.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use at_core::{Batch, Bundle, ChangeState, Item, ReviewState, TestState, ValidationLevel, ValidationResult};
use at_schema::{Batcher, ChangeTarget, Command, Filter, FilterEntry, Input, PipelineContext, Repo, Schema, SchemaConfig, Transformer, Validator};
use serde_json::Value;

struct FixedInput(Vec<Item>);

impl Input for FixedInput {
    fn get_items(&self) -> anyhow::Result<Vec<Item>> {
        Ok(self.0.clone())
    }
}

/// Rejects the named key; wrap in [`FilterEntry::inverted`] to flip that.
struct RejectKeyFilter(&'static str);

impl Filter for RejectKeyFilter {
    fn is_valid(&self, item: &Item) -> anyhow::Result<bool> {
        Ok(item.key != self.0)
    }
}

/// Puts every surviving Item into its own Batch, named after the key, so a
/// single run can exercise more than one batch.
struct OneBatchPerItem;

impl Batcher for OneBatchPerItem {
    fn batch(&self, items: Vec<Item>) -> anyhow::Result<Vec<Batch>> {
        Ok(items
            .into_iter()
            .map(|item| Batch::new(item.key.clone(), vec![item]))
            .collect())
    }
}

/// Groups every surviving Item into a single Batch, preserving order.
struct SingleBatch;

impl Batcher for SingleBatch {
    fn batch(&self, items: Vec<Item>) -> anyhow::Result<Vec<Batch>> {
        Ok(vec![Batch::new("batch", items)])
    }
}

/// A Transformer that never touches the working tree — the `has_changes`
/// decision is driven entirely by the paired [`FakeRepo`].
struct NoopTransformer;

impl Transformer for NoopTransformer {
    fn transform(&self, _batch: &Batch, _ctx: &dyn PipelineContext) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }
}

struct FixedLevelValidator(ValidationLevel);

impl Validator for FixedLevelValidator {
    fn validate(&self, _batch: &Batch, _transform_data: &Value, _ctx: &dyn PipelineContext) -> anyhow::Result<ValidationResult> {
        Ok(ValidationResult::new("fixed", self.0))
    }
}

/// Records its own label into a shared log every time it runs, so call
/// order (pre- vs post-validation) can be asserted.
struct LoggingCommand {
    label: &'static str,
    pre_validation: bool,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Command for LoggingCommand {
    fn run(&self, _batch: &Batch, _transform_data: &Value, _ctx: &dyn PipelineContext) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(self.label);
        Ok(())
    }

    fn run_pre_validation(&self) -> bool {
        self.pre_validation
    }
}

#[derive(Default)]
struct FakeRepo {
    has_changes: AtomicBool,
    clean_count: AtomicUsize,
    submit_count: AtomicUsize,
    rewind_count: AtomicUsize,
}

impl Repo for FakeRepo {
    fn get_changed_files(&self, _batch: &Batch) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn has_changes(&self, _batch: &Batch) -> anyhow::Result<bool> {
        Ok(self.has_changes.load(Ordering::SeqCst))
    }

    fn submit(&self, _batch: &Batch, _transform_data: &Value, _change: Option<&dyn ChangeTarget>) -> anyhow::Result<()> {
        self.submit_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clean(&self, _batch: &Batch) -> anyhow::Result<()> {
        self.clean_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rewind(&self, _batch: &Batch) -> anyhow::Result<()> {
        self.rewind_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_outstanding_changes(&self) -> anyhow::Result<Vec<Box<dyn ChangeTarget>>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct FakeChange {
    abandon_count: AtomicUsize,
}

impl ChangeTarget for FakeChange {
    fn schema_name(&self) -> &str {
        "s"
    }

    fn state(&self) -> ChangeState {
        ChangeState::Open
    }

    fn review_state(&self) -> ReviewState {
        ReviewState::NeedsReview
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
        Ok(Batch::new("batch", Vec::new()))
    }

    fn schema_bundle(&self) -> anyhow::Result<Bundle> {
        Ok(Bundle::new("test", Value::Null))
    }

    fn abandon(&self) -> anyhow::Result<bool> {
        self.abandon_count.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn merge(&self) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn add_labels(&self, _labels: &[String]) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn remove_label(&self, _label: &str) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn add_reviewers(&self, _reviewers: &[String], _team_reviewers: &[String]) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn comment(&self, _body: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

fn items(keys: &[&str]) -> Vec<Item> {
    keys.iter().map(|k| Item::new(*k)).collect()
}

/// P1: filters run in order and only drop the items they reject; survivors
/// keep their original relative order.
#[test]
fn filters_preserve_order_and_drop_only_the_rejected_item() {
    let schema = Schema::from_parts(
        SchemaConfig::new("s"),
        Box::new(FixedInput(items(&["a", "b", "c", "d", "e"]))),
        vec![FilterEntry::new(Box::new(RejectKeyFilter("c")))],
        Box::new(SingleBatch),
        Box::new(NoopTransformer),
        Vec::new(),
        Vec::new(),
        None,
    );

    let batches = at_runtime::pipeline::get_batches(&schema).unwrap();
    assert_eq!(batches.len(), 1);
    let keys: Vec<&str> = batches[0].items.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b", "d", "e"]);
}

/// The `inverted` flag (spec.md §4.1 step 3) flips a Filter's verdict.
#[test]
fn inverted_filter_flips_the_verdict() {
    let schema = Schema::from_parts(
        SchemaConfig::new("s"),
        Box::new(FixedInput(items(&["a", "b"]))),
        vec![FilterEntry::inverted(Box::new(RejectKeyFilter("a")))],
        Box::new(SingleBatch),
        Box::new(NoopTransformer),
        Vec::new(),
        Vec::new(),
        None,
    );

    let batches = at_runtime::pipeline::get_batches(&schema).unwrap();
    assert_eq!(batches.len(), 1);
    let keys: Vec<&str> = batches[0].items.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["a"]);
}

/// P2: when the Repo reports no changes, a passed-in Change is abandoned and
/// `submit` is never called.
#[test]
fn no_repo_changes_abandons_the_change_without_submitting() {
    let repo = Arc::new(FakeRepo::default());
    let change = FakeChange::default();
    let schema = Schema::from_parts(
        SchemaConfig::new("s"),
        Box::new(FixedInput(Vec::new())),
        Vec::new(),
        Box::new(SingleBatch),
        Box::new(NoopTransformer),
        Vec::new(),
        Vec::new(),
        Some(Box::new(repo.clone())),
    );
    let batch = Batch::new("b", Vec::new());

    let submitted = at_runtime::pipeline::execute_batch(&schema, &batch, Some(&change)).unwrap();

    assert!(!submitted);
    assert_eq!(repo.submit_count.load(Ordering::SeqCst), 0);
    assert_eq!(change.abandon_count.load(Ordering::SeqCst), 1);
}

/// End-to-end scenario 1: a real change submits and rewinds, and no
/// abandon happens.
#[test]
fn repo_changes_submit_and_rewind() {
    let repo = Arc::new(FakeRepo::default());
    repo.has_changes.store(true, Ordering::SeqCst);
    let change = FakeChange::default();
    let schema = Schema::from_parts(
        SchemaConfig::new("s"),
        Box::new(FixedInput(Vec::new())),
        Vec::new(),
        Box::new(SingleBatch),
        Box::new(NoopTransformer),
        Vec::new(),
        Vec::new(),
        Some(Box::new(repo.clone())),
    );
    let batch = Batch::new("b", Vec::new());

    let submitted = at_runtime::pipeline::execute_batch(&schema, &batch, Some(&change)).unwrap();

    assert!(submitted);
    assert_eq!(repo.submit_count.load(Ordering::SeqCst), 1);
    assert_eq!(repo.rewind_count.load(Ordering::SeqCst), 1);
    assert_eq!(change.abandon_count.load(Ordering::SeqCst), 0);
}

/// P3 / end-to-end scenario 3: a validator that exceeds the allowed level
/// aborts the batch before post-validation commands run, but the
/// pre-validation command has already fired.
#[test]
fn validator_exceeding_allowed_level_skips_post_validation_commands() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = Schema::from_parts(
        SchemaConfig::new("s").with_allowed_validation_level(ValidationLevel::Warning),
        Box::new(FixedInput(Vec::new())),
        Vec::new(),
        Box::new(SingleBatch),
        Box::new(NoopTransformer),
        vec![Box::new(FixedLevelValidator(ValidationLevel::Error))],
        vec![
            Box::new(LoggingCommand {
                label: "pre",
                pre_validation: true,
                log: log.clone(),
            }),
            Box::new(LoggingCommand {
                label: "post",
                pre_validation: false,
                log: log.clone(),
            }),
        ],
        None,
    );
    let batch = Batch::new("b", Vec::new());

    let err = at_runtime::pipeline::execute_batch(&schema, &batch, None).unwrap_err();

    assert!(format!("{err}").contains("validation error"));
    assert_eq!(*log.lock().unwrap(), vec!["pre"]);
}

/// `run` stops issuing further batches once `max_submissions` is reached.
#[test]
fn run_stops_after_reaching_max_submissions() {
    let repo = Arc::new(FakeRepo::default());
    repo.has_changes.store(true, Ordering::SeqCst);
    let mut config = SchemaConfig::new("s");
    config.max_submissions = Some(1);
    let schema = Schema::from_parts(
        config,
        Box::new(FixedInput(items(&["a", "b", "c"]))),
        Vec::new(),
        Box::new(OneBatchPerItem),
        Box::new(NoopTransformer),
        Vec::new(),
        Vec::new(),
        Some(Box::new(repo.clone())),
    );

    at_runtime::pipeline::run(&schema).unwrap();

    assert_eq!(repo.submit_count.load(Ordering::SeqCst), 1);
}

/// `Repo` is owned by the Schema as a `Box<dyn Repo>`, but these tests share
/// one `FakeRepo` across setup and assertions — implementing the trait for
/// `Arc<FakeRepo>` lets the Schema hold a `Box::new(repo.clone())` while the
/// test keeps its own `Arc` handle to read the counters back.
impl Repo for Arc<FakeRepo> {
    fn get_changed_files(&self, batch: &Batch) -> anyhow::Result<Vec<String>> {
        (**self).get_changed_files(batch)
    }

    fn has_changes(&self, batch: &Batch) -> anyhow::Result<bool> {
        (**self).has_changes(batch)
    }

    fn submit(&self, batch: &Batch, transform_data: &Value, change: Option<&dyn ChangeTarget>) -> anyhow::Result<()> {
        (**self).submit(batch, transform_data, change)
    }

    fn clean(&self, batch: &Batch) -> anyhow::Result<()> {
        (**self).clean(batch)
    }

    fn rewind(&self, batch: &Batch) -> anyhow::Result<()> {
        (**self).rewind(batch)
    }

    fn get_outstanding_changes(&self) -> anyhow::Result<Vec<Box<dyn ChangeTarget>>> {
        (**self).get_outstanding_changes()
    }
}
