use std::collections::HashMap;
use std::path::{Path, PathBuf};

use at_core::{AtReason, AtResult};
use orion_error::StructError;
use serde::Deserialize;
use serde_json::Value;

use crate::schema::Schema;

/// How one entry of the Schema Map (spec.md §6.4) resolves to a Schema
/// bundle: either a path to a JSON file, or the name of a registered
/// builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaSourceType {
    File,
    Builder,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SchemaMapEntry {
    #[serde(rename = "type")]
    pub source_type: SchemaSourceType,
    pub target: String,
}

/// A name-indexed resolver from schema name to Schema bundle (spec.md §6.4),
/// consulted by the Scheduler (§4.3 step 5) and by a Change resolving its
/// `SchemaRef` back to a live Schema (§9).
#[derive(Clone, Debug, Default)]
pub struct SchemaMap {
    entries: HashMap<String, SchemaMapEntry>,
    base_dir: PathBuf,
}

/// A registered in-process Schema constructor, for `BUILDER`-typed entries.
pub type SchemaBuilder = fn() -> AtResult<Schema>;

impl SchemaMap {
    pub fn load(path: &Path) -> AtResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StructError::from(AtReason::config(format!(
                "reading schema map {}: {e}",
                path.display()
            )))
        })?;
        let entries: HashMap<String, SchemaMapEntry> = serde_json::from_str(&text).map_err(|e| {
            StructError::from(AtReason::config(format!(
                "parsing schema map {}: {e}",
                path.display()
            )))
        })?;
        Ok(Self {
            entries,
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        })
    }

    pub fn entry(&self, schema_name: &str) -> AtResult<&SchemaMapEntry> {
        self.entries.get(schema_name).ok_or_else(|| {
            StructError::from(AtReason::config(format!(
                "no schema map entry for '{schema_name}'"
            )))
        })
    }

    /// Resolves a `FILE`-typed entry to a Schema. `BUILDER` entries must be
    /// resolved by the caller via a registry of [`SchemaBuilder`]s, which
    /// this crate does not itself own (builders are a caller-provided
    /// extension point, matching `original_source`'s
    /// `autotransform/schema/builder.py` registry living outside the map).
    pub fn resolve_file(&self, schema_name: &str) -> AtResult<Schema> {
        let entry = self.entry(schema_name)?;
        if entry.source_type != SchemaSourceType::File {
            return Err(StructError::from(AtReason::config(format!(
                "schema '{schema_name}' is not FILE-typed"
            ))));
        }
        let path = self.base_dir.join(&entry.target);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            StructError::from(AtReason::config(format!(
                "reading schema bundle {}: {e}",
                path.display()
            )))
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            StructError::from(AtReason::config(format!(
                "parsing schema bundle {}: {e}",
                path.display()
            )))
        })?;
        Schema::from_bundle(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_file_entry_relative_to_the_map() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("s.json"),
            serde_json::json!({
                "input": {"name": "directory", "path": "."},
                "filters": [],
                "batcher": {"name": "single", "metadata": {"title": "t"}},
                "transformer": {"name": "regex", "pattern": "a", "replacement": "b"},
                "validators": [],
                "commands": [],
                "config": {"schema_name": "s"},
            })
            .to_string(),
        )
        .unwrap();
        let map_path = dir.path().join("schema_map.json");
        std::fs::write(
            &map_path,
            serde_json::json!({ "s": {"type": "FILE", "target": "s.json"} }).to_string(),
        )
        .unwrap();

        let map = SchemaMap::load(&map_path).unwrap();
        let schema = map.resolve_file("s").unwrap();
        assert_eq!(schema.config.schema_name, "s");
    }

    #[test]
    fn unknown_schema_name_is_config_error() {
        let map = SchemaMap::default();
        let err = map.entry("nope").unwrap_err();
        assert!(format!("{err}").contains("no schema map entry"));
    }
}
