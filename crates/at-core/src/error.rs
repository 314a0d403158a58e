use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

use crate::validation::ValidationResult;

/// The error taxonomy of spec.md §7, encoded as values rather than as
/// separate exception types. `ComponentError` carries an opaque
/// `anyhow::Error` from a user-defined component; `ValidationError` wraps
/// the offending [`ValidationResult`]; `ChangeActionError` is raised
/// by an Action and is expected to be caught and logged by the Change
/// Management Loop rather than propagated (see `at-runtime::manage`).
#[derive(Debug, Clone, From, thiserror::Error)]
pub enum AtReason {
    #[error("config error: {0}")]
    Config(String),
    #[error("component error: {0}")]
    Component(String),
    #[error("validation error: {0:?}")]
    Validation(ValidationResult),
    #[error("transient io error: {0}")]
    TransientIo(String),
    #[error("change action error: {0}")]
    ChangeAction(String),
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for AtReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Config(_) => 100,
            Self::Component(_) => 101,
            Self::Validation(_) => 102,
            Self::TransientIo(_) => 103,
            Self::ChangeAction(_) => 104,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type AtError = StructError<AtReason>;
pub type AtResult<T> = Result<T, AtError>;

impl AtReason {
    pub fn component(err: anyhow::Error) -> Self {
        Self::Component(format!("{err:#}"))
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
