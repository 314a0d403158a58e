use std::collections::HashMap;

use orion_error::StructError;
use serde_json::Value;

use crate::error::{AtReason, AtResult};

/// The canonical JSON form of a component: a JSON object whose `name` field
/// identifies the concrete class, with the remaining fields holding the
/// component's own attributes (spec.md §6.1). `Bundle` wraps the raw object
/// rather than splitting it into `{name, params}` because several builtin
/// components (e.g. `ChunkBatcher`) read fields alongside `name` directly,
/// matching `original_source`'s `TypedDict`-shaped bundles.
#[derive(Clone, Debug, PartialEq)]
pub struct Bundle(Value);

impl Bundle {
    pub fn new(name: impl Into<String>, mut params: Value) -> Self {
        if !params.is_object() {
            params = Value::Object(Default::default());
        }
        params["name"] = Value::String(name.into());
        Self(params)
    }

    pub fn from_value(value: Value) -> AtResult<Self> {
        if !value.is_object() {
            return Err(StructError::from(AtReason::config(
                "component bundle must be a JSON object",
            )));
        }
        Ok(Self(value))
    }

    pub fn name(&self) -> AtResult<&str> {
        self.0
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| StructError::from(AtReason::config("component bundle missing 'name'")))
    }

    /// The raw attribute object, `name` included. Component `from_data`
    /// implementations read whichever fields they need from it.
    pub fn params(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// A constructor for one concrete component implementing trait object `T`.
pub type Constructor<T> = fn(&Value) -> anyhow::Result<T>;

/// A name-indexed registry mapping bundle `name` to a constructor, scoped to
/// one component kind (Input, Filter, Batcher, ...). The `custom/<name>`
/// namespace is reserved for user-contributed components registered via
/// [`Factory::register_custom`], matching the source's
/// `autotransform.*.factory` modules plus the `CustomComponentFactory`
/// convention they layer on top. Storage is a `RwLock`-guarded map rather
/// than a plain one so that a reference adapter shipped in a crate that
/// cannot depend back on the crate owning the process-wide registry (e.g.
/// `at-repo`'s `GithubRepo`, registered into `at-schema`'s `Repo` factory)
/// can still add a builtin after the registry's first use.
pub struct Factory<T> {
    kind: &'static str,
    builtins: std::sync::RwLock<HashMap<String, Constructor<T>>>,
    custom: std::sync::RwLock<HashMap<String, Constructor<T>>>,
}

impl<T> Factory<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            builtins: std::sync::RwLock::new(HashMap::new()),
            custom: std::sync::RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, name: impl Into<String>, ctor: Constructor<T>) -> &Self {
        self.builtins
            .write()
            .expect("factory registry lock poisoned")
            .insert(name.into(), ctor);
        self
    }

    pub fn register_custom(&self, name: impl Into<String>, ctor: Constructor<T>) -> &Self {
        self.custom
            .write()
            .expect("factory registry lock poisoned")
            .insert(name.into(), ctor);
        self
    }

    pub fn get_instance(&self, bundle: &Bundle) -> AtResult<T> {
        let name = bundle.name()?;
        let builtins = self.builtins.read().expect("factory registry lock poisoned");
        let custom = self.custom.read().expect("factory registry lock poisoned");
        let ctor = match name.strip_prefix("custom/") {
            Some(custom_name) => custom.get(custom_name),
            None => builtins.get(name),
        };
        let ctor = ctor.ok_or_else(|| {
            StructError::from(AtReason::config(format!(
                "unknown {} component '{name}'",
                self.kind
            )))
        })?;
        ctor(bundle.params()).map_err(|e| {
            StructError::from(AtReason::config(format!(
                "failed constructing {} '{name}': {e:#}",
                self.kind
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upper(params: &Value) -> anyhow::Result<String> {
        let prefix = params
            .get("prefix")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(prefix.to_uppercase())
    }

    #[test]
    fn unknown_name_is_config_error() {
        let factory: Factory<String> = Factory::new("Filter");
        let bundle = Bundle::new("does-not-exist", json!({}));
        let err = factory.get_instance(&bundle).unwrap_err();
        assert!(format!("{err}").contains("unknown Filter"));
    }

    #[test]
    fn custom_namespace_resolves_separately() {
        let mut factory: Factory<String> = Factory::new("Filter");
        factory.register("builtin", upper);
        factory.register_custom("mine", upper);

        let bundle = Bundle::new("custom/mine", json!({"prefix": "ok"}));
        assert_eq!(factory.get_instance(&bundle).unwrap(), "OK");

        let bundle = Bundle::new("mine", json!({"prefix": "ok"}));
        assert!(factory.get_instance(&bundle).is_err());
    }

    #[test]
    fn bundle_round_trips_name() {
        let bundle = Bundle::new("regex", json!({"pattern": "a.*b"}));
        assert_eq!(bundle.name().unwrap(), "regex");
        assert_eq!(bundle.params()["pattern"], "a.*b");
    }
}
