use at_core::ValidationResult;
use derive_more::From;
use orion_error::{ErrorCode, UvsReason};

/// Runtime error taxonomy (spec.md §7). `ComponentError` and
/// `ValidationError` abort the current batch; `ChangeActionError` is caught
/// and logged by the Change Management Loop rather than propagated (see
/// `crate::manage`).
#[derive(Debug, Clone, From, thiserror::Error)]
pub enum RuntimeReason {
    #[error("config error: {0}")]
    Config(String),
    #[error("component error: {0:#}")]
    Component(String),
    #[error("validation error: {0:?}")]
    Validation(ValidationResult),
    #[error("change action error: {0}")]
    ChangeAction(String),
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for RuntimeReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Config(_) => 400,
            Self::Component(_) => 401,
            Self::Validation(_) => 402,
            Self::ChangeAction(_) => 403,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type RuntimeError = orion_error::StructError<RuntimeReason>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeReason {
    pub fn component(err: anyhow::Error) -> Self {
        Self::Component(format!("{err:#}"))
    }

    pub fn validation(result: ValidationResult) -> Self {
        Self::Validation(result)
    }
}
