use serde_json::Value;

use crate::fetcher::ConfigFetcher;

/// Reads configuration from `AUTO_TRANSFORM_<SECTION>_<SETTING>` environment
/// variables, matching
/// `original_source/autotransform/config/envvar.py`'s
/// `EnvironmentVariableConfigFetcher`.
pub struct EnvConfigFetcher;

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl ConfigFetcher for EnvConfigFetcher {
    fn credentials_bot_identity(&self) -> Option<String> {
        env("AUTO_TRANSFORM_CREDENTIALS_BOT_IDENTITY")
    }

    fn credentials_github_token(&self) -> Option<String> {
        env("AUTO_TRANSFORM_CREDENTIALS_GITHUB_TOKEN")
    }

    fn credentials_github_base_url(&self) -> Option<String> {
        env("AUTO_TRANSFORM_CREDENTIALS_GITHUB_BASE_URL")
    }

    fn imports_components(&self) -> Vec<String> {
        match env("AUTO_TRANSFORM_IMPORTS_COMPONENTS") {
            Some(list) => list.split(',').map(|s| s.trim().to_owned()).collect(),
            None => Vec::new(),
        }
    }

    fn runner_local(&self) -> Option<Value> {
        env("AUTO_TRANSFORM_RUNNER_LOCAL").and_then(|s| serde_json::from_str(&s).ok())
    }

    fn runner_remote(&self) -> Option<Value> {
        env("AUTO_TRANSFORM_RUNNER_REMOTE").and_then(|s| serde_json::from_str(&s).ok())
    }

    fn component_directory(&self) -> Option<String> {
        env("AUTO_TRANSFORM_SCHEMA_DIRECTORY")
    }
}

/// Layers [`EnvConfigFetcher`] on top of a fallback fetcher: an env var
/// answers the query if present, otherwise the fallback does. Controlled by
/// `AUTO_TRANSFORM_CONFIG_USE_FALLBACK` (spec.md §6.6) — when unset or
/// false, `Config::load` uses `EnvConfigFetcher` alone.
pub struct FallbackConfigFetcher<F: ConfigFetcher> {
    env: EnvConfigFetcher,
    fallback: F,
}

impl<F: ConfigFetcher> FallbackConfigFetcher<F> {
    pub fn new(fallback: F) -> Self {
        Self {
            env: EnvConfigFetcher,
            fallback,
        }
    }
}

impl<F: ConfigFetcher> ConfigFetcher for FallbackConfigFetcher<F> {
    fn credentials_bot_identity(&self) -> Option<String> {
        self.env
            .credentials_bot_identity()
            .or_else(|| self.fallback.credentials_bot_identity())
    }

    fn credentials_github_token(&self) -> Option<String> {
        self.env
            .credentials_github_token()
            .or_else(|| self.fallback.credentials_github_token())
    }

    fn credentials_github_base_url(&self) -> Option<String> {
        self.env
            .credentials_github_base_url()
            .or_else(|| self.fallback.credentials_github_base_url())
    }

    fn imports_components(&self) -> Vec<String> {
        let env_imports = self.env.imports_components();
        if env_imports.is_empty() {
            self.fallback.imports_components()
        } else {
            env_imports
        }
    }

    fn runner_local(&self) -> Option<Value> {
        self.env
            .runner_local()
            .or_else(|| self.fallback.runner_local())
    }

    fn runner_remote(&self) -> Option<Value> {
        self.env
            .runner_remote()
            .or_else(|| self.fallback.runner_remote())
    }

    fn component_directory(&self) -> Option<String> {
        self.env
            .component_directory()
            .or_else(|| self.fallback.component_directory())
    }
}

pub fn use_fallback_requested() -> bool {
    std::env::var("AUTO_TRANSFORM_CONFIG_USE_FALLBACK")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
