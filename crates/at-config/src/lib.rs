//! Process-wide, read-only settings: credentials, component directory,
//! Runner defaults, and the ambient logging configuration. See
//! `original_source/autotransform/config/` for the Python lineage this
//! module generalizes.

pub mod config;
pub mod env;
pub mod fetcher;
pub mod file;
pub mod logging;

pub use config::{Config, Credentials};
pub use fetcher::ConfigFetcher;
pub use logging::{LogFormat, LoggingConfig};
