use derive_more::From;
use orion_error::{ErrorCode, UvsReason};

/// Schema-construction and component-factory failures, composed the way
/// `at_core::AtReason` is.
#[derive(Debug, Clone, From, thiserror::Error)]
pub enum SchemaReason {
    #[error("invalid schema config: {0}")]
    InvalidConfig(String),
    #[error("component error: {0}")]
    Component(String),
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for SchemaReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::InvalidConfig(_) => 200,
            Self::Component(_) => 201,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type SchemaError = orion_error::StructError<SchemaReason>;
pub type SchemaResult<T> = Result<T, SchemaError>;
