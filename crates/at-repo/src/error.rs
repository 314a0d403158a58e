use derive_more::From;
use orion_error::{ErrorCode, UvsReason};

#[derive(Debug, Clone, From, thiserror::Error)]
pub enum RepoReason {
    #[error("git operation failed: {0}")]
    Git(String),
    #[error("review-system request failed: {0}")]
    Review(String),
    #[error("malformed change body: {0}")]
    Body(String),
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for RepoReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Git(_) => 300,
            Self::Review(_) => 301,
            Self::Body(_) => 302,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type RepoError = orion_error::StructError<RepoReason>;
pub type RepoResult<T> = Result<T, RepoError>;
