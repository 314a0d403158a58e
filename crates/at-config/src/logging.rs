use serde::{Deserialize, Serialize};

/// The ambient logging configuration, shaped after
/// `wf-config::logging::LoggingConfig`: pick a human-readable or
/// machine-parseable format and an optional on-disk sink in addition to
/// stderr.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Defaults to the `RUST_LOG`/`AT_LOG` env filter when unset.
    #[serde(default)]
    pub level: Option<String>,
    /// Directory to additionally write a rolling log file to.
    #[serde(default)]
    pub log_dir: Option<std::path::PathBuf>,
}
