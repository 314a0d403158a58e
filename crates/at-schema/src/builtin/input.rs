use at_core::Item;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::traits::Input;

/// Walks a directory tree and emits one Item per file found, keyed by its
/// path relative to `path`. Grounded on spec.md's FileItem/`CachedFile`
/// lineage — `original_source` ships no `input/directory.py` in this pack,
/// so this mirrors the `DirectoryInput` the rest of the source's input
/// components (`input/*`) are named after, in `at-core::item`'s idiom.
pub struct DirectoryInput {
    path: PathBuf,
    #[allow(dead_code)]
    recursive: bool,
}

impl Input for DirectoryInput {
    fn get_items(&self) -> anyhow::Result<Vec<Item>> {
        let mut keys = Vec::new();
        walk(&self.path, &self.path, self.recursive, &mut keys)?;
        keys.sort();
        Ok(keys.into_iter().map(Item::new).collect())
    }
}

fn walk(root: &Path, dir: &Path, recursive: bool, out: &mut Vec<String>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if recursive {
                walk(root, &entry.path(), recursive, out)?;
            }
            continue;
        }
        let rel = entry.path().strip_prefix(root)?.to_string_lossy().into_owned();
        out.push(rel);
    }
    Ok(())
}

pub fn directory(params: &Value) -> anyhow::Result<Box<dyn Input>> {
    let path = params
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("directory input requires a 'path'"))?;
    let recursive = params.get("recursive").and_then(Value::as_bool).unwrap_or(true);
    Ok(Box::new(DirectoryInput {
        path: PathBuf::from(path),
        recursive,
    }))
}
