use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::fetcher::ConfigFetcher;

#[derive(Clone, Debug, Default, Deserialize)]
struct CredentialsSection {
    bot_identity: Option<String>,
    github_token: Option<String>,
    github_base_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct ImportsSection {
    #[serde(default)]
    components: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RunnerSection {
    local: Option<Value>,
    remote: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawFileConfig {
    #[serde(default)]
    credentials: CredentialsSection,
    #[serde(default)]
    imports: ImportsSection,
    #[serde(default)]
    runner: RunnerSection,
    component_directory: Option<String>,
}

/// Reads configuration from a TOML file, the way
/// `original_source/autotransform/config/default.py`'s `DefaultConfigFetcher`
/// reads `data/config.ini` (ini → toml is the only format substitution made;
/// the section/key names are otherwise unchanged).
pub struct FileConfigFetcher {
    raw: RawFileConfig,
}

impl FileConfigFetcher {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
        let raw: RawFileConfig = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
        Ok(Self { raw })
    }

    pub fn empty() -> Self {
        Self {
            raw: RawFileConfig::default(),
        }
    }
}

impl ConfigFetcher for FileConfigFetcher {
    fn credentials_bot_identity(&self) -> Option<String> {
        self.raw.credentials.bot_identity.clone()
    }

    fn credentials_github_token(&self) -> Option<String> {
        self.raw.credentials.github_token.clone()
    }

    fn credentials_github_base_url(&self) -> Option<String> {
        self.raw.credentials.github_base_url.clone()
    }

    fn imports_components(&self) -> Vec<String> {
        self.raw.imports.components.clone()
    }

    fn runner_local(&self) -> Option<Value> {
        self.raw.runner.local.clone()
    }

    fn runner_remote(&self) -> Option<Value> {
        self.raw.runner.remote.clone()
    }

    fn component_directory(&self) -> Option<String> {
        self.raw.component_directory.clone()
    }
}
