use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::item::Item;

/// Extra, schema-defined batch attributes (`summary`, `tests`, tracking
/// issue, etc.) plus the PR/MR body, carried as an open map the way
/// `original_source/autotransform/repo/github.py` reads
/// `metadata.get("summary", "")` / `metadata.get("tests", "")` off of an
/// untyped dict.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BatchMetadata {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.extra.get(field)
    }
}

/// A titled group of [`Item`]s processed as a unit. `title` is the
/// human-facing label and the source of the branch name (§6.2).
/// `metadata.body` MUST be present by the time a [`Repo`](crate) submits to
/// a code-review system; the engine does not enforce that at construction
/// since many Batches never reach a Repo (no-repo schemas).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub title: String,
    pub items: Vec<Item>,
    #[serde(default)]
    pub metadata: BatchMetadata,
}

impl Batch {
    pub fn new(title: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            title: title.into(),
            items,
            metadata: BatchMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: BatchMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
