//! Reference `Repo`/`ChangeTarget` implementation against GitHub, plus the
//! naming and body-encoding rules any VCS/review adapter built on this crate
//! shares (spec.md §6.2, §6.3).

pub mod body;
pub mod error;
pub mod github;
pub mod naming;

pub use error::{RepoError, RepoReason, RepoResult};
pub use github::{GithubChange, GithubRepo};

/// Registers this crate's `Repo` adapters into `at-schema`'s process-wide
/// component registry under their builtin names (`"github"`). Callers that
/// construct Schemas from JSON bundles naming a `repo` (typically `at-cli`)
/// MUST call this once, early, before the first such bundle is decoded.
/// Idempotent — re-registering the same name just replaces the constructor.
pub fn register() {
    at_schema::factories().repo.register("github", github::from_params);
}
