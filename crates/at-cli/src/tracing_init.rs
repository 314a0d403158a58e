//! Tracing setup, shaped after `wf-runtime::tracing_init::init_tracing` but
//! without that module's `DomainFormat` promotion machinery — this engine's
//! [`at_config::LoggingConfig`] carries no `modules`/`file` routing fields,
//! just a format, a level filter, and an optional log directory.

use at_config::{LogFormat, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber. Returns the file appender's
/// guard, if a `log_dir` was configured — the caller MUST keep it alive for
/// the process lifetime or buffered log lines are lost on exit.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = config
        .level
        .as_deref()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;
        let appender = tracing_appender::rolling::daily(log_dir, "autotransform.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        match config.format {
            LogFormat::Json => builder.json().with_writer(non_blocking).init(),
            LogFormat::Pretty => builder.with_writer(non_blocking).init(),
        }
        return Ok(Some(guard));
    }

    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(None)
}
