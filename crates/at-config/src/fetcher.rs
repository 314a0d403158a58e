use serde_json::Value;

/// A source of configuration settings. Two implementations ship —
/// [`crate::file::FileConfigFetcher`] (reads a TOML file) and
/// [`crate::env::EnvConfigFetcher`] (reads `AUTO_TRANSFORM_*` environment
/// variables) — matching `original_source/autotransform/config/default.py`
/// and `envvar.py`. [`Config::load`](crate::Config::load) picks between them
/// (and can layer one atop the other) the way
/// `original_source/autotransform/config/__init__.py` selects a fetcher via
/// the `AUTO_TRANSFORM_CONFIG` environment variable.
pub trait ConfigFetcher {
    fn credentials_bot_identity(&self) -> Option<String>;
    fn credentials_github_token(&self) -> Option<String>;
    fn credentials_github_base_url(&self) -> Option<String>;
    fn imports_components(&self) -> Vec<String>;
    /// JSON-encoded Runner bundle used for local runs, if configured.
    fn runner_local(&self) -> Option<Value>;
    /// JSON-encoded Runner bundle used for remote runs, if configured.
    fn runner_remote(&self) -> Option<Value>;
    fn component_directory(&self) -> Option<String>;
}
