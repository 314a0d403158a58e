use at_core::{AtReason, AtResult, Bundle};
use orion_error::StructError;
use serde_json::Value;

use crate::factories::{factories, Factories};
use crate::schema_config::SchemaConfig;
use crate::traits::{Batcher, Command, FilterEntry, Input, PipelineContext, Repo, Transformer, Validator};

/// One bundled filter plus its `inverted` flag, read directly off the raw
/// bundle object rather than being a field any concrete Filter needs to know
/// about (spec.md §4.1 step 3).
fn build_filter_entry(bundle: &Bundle, factories: &Factories) -> AtResult<FilterEntry> {
    let inverted = bundle
        .params()
        .get("inverted")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let filter = factories.filter.get_instance(bundle)?;
    Ok(if inverted {
        FilterEntry::inverted(filter)
    } else {
        FilterEntry::new(filter)
    })
}

/// A constructed transformation pipeline (spec.md §3). A Schema is a value:
/// two Schemas built from equal bundles behave identically, which is why
/// `Schema` keeps the JSON it was built from (`source`) rather than relying
/// on its trait objects to be individually comparable.
pub struct Schema {
    pub config: SchemaConfig,
    pub input: Box<dyn Input>,
    pub filters: Vec<FilterEntry>,
    pub batcher: Box<dyn Batcher>,
    pub transformer: Box<dyn Transformer>,
    pub validators: Vec<Box<dyn Validator>>,
    pub commands: Vec<Box<dyn Command>>,
    pub repo: Option<Box<dyn Repo>>,
    source: Value,
}

impl Schema {
    /// Builds a Schema from a bundled JSON object shaped
    /// `{ input, filters, batcher, transformer, validators, commands, repo?, config }`
    /// (spec.md §6.1), using the process-wide component registry.
    pub fn from_bundle(value: Value) -> AtResult<Self> {
        let f = factories();
        let obj = value
            .as_object()
            .ok_or_else(|| StructError::from(AtReason::config("schema bundle must be an object")))?;

        let input_bundle = Bundle::from_value(
            obj.get("input")
                .cloned()
                .ok_or_else(|| StructError::from(AtReason::config("schema missing 'input'")))?,
        )?;
        let input = f.input.get_instance(&input_bundle)?;

        let filters = obj
            .get("filters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|v| Bundle::from_value(v).and_then(|b| build_filter_entry(&b, f)))
            .collect::<AtResult<Vec<_>>>()?;

        let batcher_bundle = Bundle::from_value(
            obj.get("batcher")
                .cloned()
                .ok_or_else(|| StructError::from(AtReason::config("schema missing 'batcher'")))?,
        )?;
        let batcher = f.batcher.get_instance(&batcher_bundle)?;

        let transformer_bundle = Bundle::from_value(obj.get("transformer").cloned().ok_or_else(
            || StructError::from(AtReason::config("schema missing 'transformer'")),
        )?)?;
        let transformer = f.transformer.get_instance(&transformer_bundle)?;

        let validators = obj
            .get("validators")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|v| Bundle::from_value(v).and_then(|b| f.validator.get_instance(&b)))
            .collect::<AtResult<Vec<_>>>()?;

        let commands = obj
            .get("commands")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|v| Bundle::from_value(v).and_then(|b| f.command.get_instance(&b)))
            .collect::<AtResult<Vec<_>>>()?;

        let repo = match obj.get("repo").cloned() {
            Some(Value::Null) | None => None,
            Some(v) => Some(f.repo.get_instance(&Bundle::from_value(v)?)?),
        };

        let config = schema_config_from_value(
            obj.get("config")
                .cloned()
                .ok_or_else(|| StructError::from(AtReason::config("schema missing 'config'")))?,
        )?;

        Ok(Self {
            config,
            input,
            filters,
            batcher,
            transformer,
            validators,
            commands,
            repo,
            source: value,
        })
    }

    /// Assembles a Schema directly from already-constructed components,
    /// bypassing bundle decoding. This is the path a `BUILDER`-typed
    /// [`crate::schema_map::SchemaBuilder`] (spec.md §6.4) uses to hand back
    /// a live Schema, and the path integration tests use to exercise the
    /// pipeline against fakes without registering them in the process-wide
    /// Factory. `bundle()` on a Schema built this way returns `Value::Null`
    /// — there is no JSON form to round-trip since components that weren't
    /// decoded from one aren't required to serialize back to one.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        config: SchemaConfig,
        input: Box<dyn Input>,
        filters: Vec<FilterEntry>,
        batcher: Box<dyn Batcher>,
        transformer: Box<dyn Transformer>,
        validators: Vec<Box<dyn Validator>>,
        commands: Vec<Box<dyn Command>>,
        repo: Option<Box<dyn Repo>>,
    ) -> Self {
        Self {
            config,
            input,
            filters,
            batcher,
            transformer,
            validators,
            commands,
            repo,
            source: Value::Null,
        }
    }

    /// The JSON bundle this Schema was constructed from (spec.md §6.1).
    pub fn bundle(&self) -> &Value {
        &self.source
    }

    pub fn pipeline_context(&self) -> SchemaPipelineContext<'_> {
        SchemaPipelineContext { schema: self }
    }
}

fn schema_config_from_value(value: Value) -> AtResult<SchemaConfig> {
    let obj = value
        .as_object()
        .ok_or_else(|| StructError::from(AtReason::config("schema config must be an object")))?;
    let schema_name = obj
        .get("schema_name")
        .and_then(Value::as_str)
        .ok_or_else(|| StructError::from(AtReason::config("schema config missing 'schema_name'")))?
        .to_string();
    let allowed_validation_level = match obj.get("allowed_validation_level").and_then(Value::as_str) {
        Some("WARNING") => at_core::ValidationLevel::Warning,
        Some("ERROR") => at_core::ValidationLevel::Error,
        _ => at_core::ValidationLevel::None,
    };
    let max_submissions = obj
        .get("max_submissions")
        .and_then(Value::as_u64)
        .map(|n| n as u32);
    let owners = obj
        .get("owners")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_owned).collect())
        .unwrap_or_default();

    let mut config = SchemaConfig::new(schema_name).with_allowed_validation_level(allowed_validation_level);
    config = config
        .with_max_submissions(max_submissions)
        .map_err(|e| StructError::from(AtReason::config(format!("{e}"))))?;
    Ok(config.with_owners(owners))
}

/// The [`PipelineContext`] a [`Schema`] presents to its own Commands while
/// executing (spec.md §9).
pub struct SchemaPipelineContext<'a> {
    schema: &'a Schema,
}

impl PipelineContext for SchemaPipelineContext<'_> {
    fn schema_name(&self) -> &str {
        &self.schema.config.schema_name
    }

    fn repo(&self) -> Option<&dyn Repo> {
        self.schema.repo.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_input_is_config_error() {
        let bundle = json!({
            "filters": [],
            "batcher": {"name": "single", "metadata": {"title": "t"}},
            "transformer": {"name": "regex", "pattern": "a", "replacement": "b"},
            "validators": [],
            "commands": [],
            "config": {"schema_name": "s"},
        });
        let err = Schema::from_bundle(bundle).unwrap_err();
        assert!(format!("{err}").contains("input"));
    }

    #[test]
    fn builds_schema_from_minimal_bundle() {
        let bundle = json!({
            "input": {"name": "directory", "path": "."},
            "filters": [],
            "batcher": {"name": "single", "metadata": {"title": "t"}},
            "transformer": {"name": "regex", "pattern": "a", "replacement": "b"},
            "validators": [],
            "commands": [],
            "config": {"schema_name": "s", "allowed_validation_level": "WARNING"},
        });
        let schema = Schema::from_bundle(bundle).unwrap();
        assert_eq!(schema.config.schema_name, "s");
        assert_eq!(schema.config.allowed_validation_level, at_core::ValidationLevel::Warning);
        assert!(schema.repo.is_none());
    }

    /// P6 (bundle round-trip): re-decoding a Schema's own bundle produces a
    /// Schema with identical configuration and an identical bundle.
    #[test]
    fn schema_bundle_round_trips() {
        let bundle = json!({
            "input": {"name": "directory", "path": "."},
            "filters": [{"name": "extension", "extensions": [".py"]}],
            "batcher": {"name": "single", "metadata": {"title": "t"}},
            "transformer": {"name": "regex", "pattern": "a", "replacement": "b"},
            "validators": [],
            "commands": [],
            "config": {"schema_name": "s", "max_submissions": 3, "owners": ["me"]},
        });
        let first = Schema::from_bundle(bundle).unwrap();
        let second = Schema::from_bundle(first.bundle().clone()).unwrap();
        assert_eq!(first.bundle(), second.bundle());
        assert_eq!(first.config.schema_name, second.config.schema_name);
        assert_eq!(first.config.max_submissions, second.config.max_submissions);
        assert_eq!(first.config.owners, second.config.owners);
    }
}
