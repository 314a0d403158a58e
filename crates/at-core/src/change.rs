use serde::{Deserialize, Serialize};

/// Lifecycle state of an outstanding Change (spec.md §3). `Merged` and
/// `Closed` are terminal — the management loop never acts on a Change in
/// either state, matching `original_source/autotransform/change/state.py`'s
/// `ChangeState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeState {
    Open,
    Closed,
    Merged,
}

impl ChangeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Merged)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    NeedsReview,
    Approved,
    ChangesRequested,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestState {
    Pending,
    Success,
    Failure,
}
