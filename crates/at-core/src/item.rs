use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque unit of work. `key` is the stable identity; `extra_data` is
/// component-defined payload carried alongside it (e.g. a match span, a
/// pre-computed diff). Items are immutable values — components that need to
/// "change" an item produce a new one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<Map<String, Value>>,
}

impl Item {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            extra_data: None,
        }
    }

    pub fn with_extra_data(key: impl Into<String>, extra_data: Map<String, Value>) -> Self {
        Self {
            key: key.into(),
            extra_data: Some(extra_data),
        }
    }

    pub fn extra(&self, field: &str) -> Option<&Value> {
        self.extra_data.as_ref().and_then(|m| m.get(field))
    }
}

/// A file-backed [`Item`] — the key is the repo-relative file path. Content
/// access goes through a small read cache so that a Transformer which reads
/// a file multiple times in one batch does not repeat the filesystem hit,
/// matching the teacher's `CachedFile` lineage in
/// `original_source/autotransform/item/file.py`.
#[derive(Clone, Debug, PartialEq)]
pub struct FileItem {
    item: Item,
    root: PathBuf,
}

impl FileItem {
    pub fn new(root: impl Into<PathBuf>, path: impl Into<String>) -> Self {
        Self {
            item: Item::new(path),
            root: root.into(),
        }
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn path(&self) -> &str {
        &self.item.key
    }

    pub fn abs_path(&self) -> PathBuf {
        self.root.join(self.path())
    }

    pub fn get_content(&self) -> std::io::Result<String> {
        fs::read_to_string(self.abs_path())
    }

    pub fn write_content(&self, content: &str) -> std::io::Result<()> {
        let abs = self.abs_path();
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(abs, content)
    }

    pub fn exists(&self) -> bool {
        self.abs_path().exists()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
