//! Actions a Step performs on a Change (spec.md §4.2 "Action contracts").
//! Each variant's constructor enforces the contract's non-empty-string rules
//! at construction rather than at `run` time, matching the validated-leaf
//! convention already used by [`crate::condition`].

use at_schema::ChangeTarget;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{RuntimeError, RuntimeReason, RuntimeResult};
use crate::http::{HttpMethod, TemplatedHttp};
use crate::runner::Runner;

fn require_non_empty(values: &[String], what: &str) -> RuntimeResult<()> {
    if values.iter().any(String::is_empty) {
        return Err(RuntimeError::from(RuntimeReason::Config(format!(
            "{what} entries must be non-empty strings"
        ))));
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub enum Action {
    Abandon,
    Merge,
    None,
    AddLabels(Vec<String>),
    RemoveLabel(String),
    AddReviewers(Vec<String>, Vec<String>),
    Comment(String),
    Update,
    Request {
        http: TemplatedHttp,
        log_response: bool,
    },
}

impl Action {
    pub fn add_labels(labels: Vec<String>) -> RuntimeResult<Self> {
        if labels.is_empty() {
            return Err(RuntimeError::from(RuntimeReason::Config(
                "AddLabels requires at least one label".into(),
            )));
        }
        require_non_empty(&labels, "AddLabels")?;
        Ok(Self::AddLabels(labels))
    }

    pub fn remove_label(label: String) -> RuntimeResult<Self> {
        if label.is_empty() {
            return Err(RuntimeError::from(RuntimeReason::Config(
                "RemoveLabel requires a non-empty label".into(),
            )));
        }
        Ok(Self::RemoveLabel(label))
    }

    pub fn add_reviewers(reviewers: Vec<String>, team_reviewers: Vec<String>) -> RuntimeResult<Self> {
        if reviewers.is_empty() && team_reviewers.is_empty() {
            return Err(RuntimeError::from(RuntimeReason::Config(
                "AddReviewers requires at least one reviewer or team reviewer".into(),
            )));
        }
        require_non_empty(&reviewers, "AddReviewers.reviewers")?;
        require_non_empty(&team_reviewers, "AddReviewers.team_reviewers")?;
        Ok(Self::AddReviewers(reviewers, team_reviewers))
    }

    pub fn comment(body: String) -> RuntimeResult<Self> {
        if body.is_empty() {
            return Err(RuntimeError::from(RuntimeReason::Config(
                "Comment requires a non-empty body".into(),
            )));
        }
        Ok(Self::Comment(body))
    }

    /// Executes the action against `change`, using `runner` only for
    /// `Update` (spec.md §4.2: "re-runs the pipeline ... via the selected
    /// runner"). Every variant returns the action's own success flag; the
    /// Management Loop is responsible for catching and logging the `Err`
    /// case as a `ChangeActionError` rather than propagating it.
    pub fn run(&self, change: &dyn ChangeTarget, runner: &dyn Runner) -> RuntimeResult<bool> {
        let component = |e: anyhow::Error| RuntimeError::from(RuntimeReason::component(e));
        match self {
            Action::Abandon => change.abandon().map_err(component),
            Action::Merge => change.merge().map_err(component),
            Action::None => Ok(true),
            Action::AddLabels(labels) => change.add_labels(labels).map_err(component),
            Action::RemoveLabel(label) => change.remove_label(label).map_err(component),
            Action::AddReviewers(reviewers, team_reviewers) => {
                change.add_reviewers(reviewers, team_reviewers).map_err(component)
            }
            Action::Comment(body) => change.comment(body).map_err(component),
            Action::Update => runner.update(change),
            Action::Request { http, log_response } => {
                let response = http.invoke(change)?;
                if *log_response {
                    at_core::emit_info("action", format!("Request action response: {response}"));
                }
                Ok(true)
            }
        }
    }
}

/// The JSON-decoded shape of an `Action` bundle (spec.md §6.1).
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionDto {
    Abandon,
    Merge,
    None,
    AddLabels { labels: Vec<String> },
    RemoveLabel { label: String },
    AddReviewers {
        #[serde(default)]
        reviewers: Vec<String>,
        #[serde(default)]
        team_reviewers: Vec<String>,
    },
    Comment { body: String },
    Update,
    Request {
        url: String,
        method: HttpMethod,
        #[serde(default)]
        headers: Value,
        #[serde(default)]
        params: Value,
        #[serde(default)]
        data: Value,
        #[serde(default)]
        log_response: bool,
    },
}

impl TryFrom<ActionDto> for Action {
    type Error = RuntimeError;

    fn try_from(dto: ActionDto) -> RuntimeResult<Self> {
        Ok(match dto {
            ActionDto::Abandon => Action::Abandon,
            ActionDto::Merge => Action::Merge,
            ActionDto::None => Action::None,
            ActionDto::AddLabels { labels } => Action::add_labels(labels)?,
            ActionDto::RemoveLabel { label } => Action::remove_label(label)?,
            ActionDto::AddReviewers { reviewers, team_reviewers } => {
                Action::add_reviewers(reviewers, team_reviewers)?
            }
            ActionDto::Comment { body } => Action::comment(body)?,
            ActionDto::Update => Action::Update,
            ActionDto::Request { url, method, headers, params, data, log_response } => Action::Request {
                http: TemplatedHttp::new(url, method, headers, params, data),
                log_response,
            },
        })
    }
}

impl Action {
    pub fn from_json(value: Value) -> RuntimeResult<Self> {
        let dto: ActionDto = serde_json::from_value(value)
            .map_err(|e| RuntimeError::from(RuntimeReason::Config(format!("invalid action: {e}"))))?;
        Action::try_from(dto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_labels_rejects_empty_list() {
        assert!(Action::add_labels(vec![]).is_err());
    }

    #[test]
    fn add_labels_rejects_empty_string_entries() {
        assert!(Action::add_labels(vec!["".into()]).is_err());
    }

    #[test]
    fn add_reviewers_requires_at_least_one_list_non_empty() {
        assert!(Action::add_reviewers(vec![], vec![]).is_err());
        assert!(Action::add_reviewers(vec!["alice".into()], vec![]).is_ok());
        assert!(Action::add_reviewers(vec![], vec!["team".into()]).is_ok());
    }

    #[test]
    fn comment_rejects_empty_body() {
        assert!(Action::comment(String::new()).is_err());
    }

    #[test]
    fn parses_merge_action_from_json() {
        let action = Action::from_json(serde_json::json!({ "type": "MERGE" })).unwrap();
        assert!(matches!(action, Action::Merge));
    }
}
