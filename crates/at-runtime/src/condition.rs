//! Condition leaves (spec.md §3, §4.2) plus the `Aggregate` combinator.
//! `CreatedAgoCondition`/`UpdatedAgoCondition`/`SchemaNameCondition`/
//! `LabelsCondition`/`ReviewersCondition` are recovered from
//! `original_source`'s condition lineage beyond what the distilled spec
//! names explicitly (SPEC_FULL.md §4.2).

use at_core::{ChangeState, ReviewState};
use at_schema::ChangeTarget;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{RuntimeError, RuntimeReason, RuntimeResult};
use crate::http::{HttpMethod, TemplatedHttp};

/// The full comparison vocabulary (spec.md §3); each leaf condition accepts
/// only a declared subset, rejecting the rest at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparison {
    Equal,
    NotEqual,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
    Empty,
    NotEmpty,
}

fn require(comparison: Comparison, allowed: &[Comparison], what: &str) -> RuntimeResult<()> {
    if allowed.contains(&comparison) {
        Ok(())
    } else {
        Err(RuntimeError::from(RuntimeReason::Config(format!(
            "{what} does not support comparison {comparison:?}"
        ))))
    }
}

#[derive(Clone, Debug)]
pub struct StateCondition {
    comparison: Comparison,
    values: Vec<ChangeState>,
}

impl StateCondition {
    pub fn new(comparison: Comparison, values: Vec<ChangeState>) -> RuntimeResult<Self> {
        require(
            comparison,
            &[Comparison::Equal, Comparison::NotEqual, Comparison::In, Comparison::NotIn],
            "StateCondition",
        )?;
        Ok(Self { comparison, values })
    }

    fn check(&self, change: &dyn ChangeTarget) -> bool {
        let state = change.state();
        match self.comparison {
            Comparison::Equal => self.values.first() == Some(&state),
            Comparison::NotEqual => self.values.first() != Some(&state),
            Comparison::In => self.values.contains(&state),
            Comparison::NotIn => !self.values.contains(&state),
            _ => unreachable!("validated at construction"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReviewStateCondition {
    comparison: Comparison,
    values: Vec<ReviewState>,
}

impl ReviewStateCondition {
    pub fn new(comparison: Comparison, values: Vec<ReviewState>) -> RuntimeResult<Self> {
        require(
            comparison,
            &[Comparison::Equal, Comparison::NotEqual, Comparison::In, Comparison::NotIn],
            "ReviewStateCondition",
        )?;
        Ok(Self { comparison, values })
    }

    fn check(&self, change: &dyn ChangeTarget) -> bool {
        let state = change.review_state();
        match self.comparison {
            Comparison::Equal => self.values.first() == Some(&state),
            Comparison::NotEqual => self.values.first() != Some(&state),
            Comparison::In => self.values.contains(&state),
            Comparison::NotIn => !self.values.contains(&state),
            _ => unreachable!("validated at construction"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SchemaNameCondition {
    comparison: Comparison,
    values: Vec<String>,
}

impl SchemaNameCondition {
    pub fn new(comparison: Comparison, values: Vec<String>) -> RuntimeResult<Self> {
        require(
            comparison,
            &[Comparison::Equal, Comparison::NotEqual, Comparison::In, Comparison::NotIn],
            "SchemaNameCondition",
        )?;
        Ok(Self { comparison, values })
    }

    fn check(&self, change: &dyn ChangeTarget) -> bool {
        let name = change.schema_name();
        match self.comparison {
            Comparison::Equal => self.values.first().map(String::as_str) == Some(name),
            Comparison::NotEqual => self.values.first().map(String::as_str) != Some(name),
            Comparison::In => self.values.iter().any(|v| v == name),
            Comparison::NotIn => !self.values.iter().any(|v| v == name),
            _ => unreachable!("validated at construction"),
        }
    }
}

/// Shared by `LabelsCondition`/`ReviewersCondition`: does the Change's list
/// (labels, or reviewers ++ team_reviewers) contain any of `values`, or is it
/// empty.
#[derive(Clone, Debug)]
pub struct SetCondition {
    comparison: Comparison,
    values: Vec<String>,
    field: SetField,
}

#[derive(Clone, Copy, Debug)]
pub enum SetField {
    Labels,
    Reviewers,
}

impl SetCondition {
    pub fn new(field: SetField, comparison: Comparison, values: Vec<String>) -> RuntimeResult<Self> {
        require(
            comparison,
            &[Comparison::Contains, Comparison::NotContains, Comparison::Empty, Comparison::NotEmpty],
            "LabelsCondition/ReviewersCondition",
        )?;
        Ok(Self { comparison, values, field })
    }

    fn check(&self, change: &dyn ChangeTarget) -> bool {
        let actual: Vec<&String> = match self.field {
            SetField::Labels => change.labels().iter().collect(),
            SetField::Reviewers => change
                .reviewers()
                .iter()
                .chain(change.team_reviewers())
                .collect(),
        };
        match self.comparison {
            Comparison::Contains => self.values.iter().any(|v| actual.contains(&v)),
            Comparison::NotContains => !self.values.iter().any(|v| actual.contains(&v)),
            Comparison::Empty => actual.is_empty(),
            Comparison::NotEmpty => !actual.is_empty(),
            _ => unreachable!("validated at construction"),
        }
    }
}

/// `CreatedAgoCondition`/`UpdatedAgoCondition`: age in seconds against a
/// threshold, `{GT, GTE, LT, LTE}` only.
#[derive(Clone, Debug)]
pub struct AgoCondition {
    comparison: Comparison,
    threshold_seconds: i64,
    field: AgoField,
}

#[derive(Clone, Copy, Debug)]
pub enum AgoField {
    Created,
    Updated,
}

impl AgoCondition {
    pub fn new(field: AgoField, comparison: Comparison, threshold_seconds: i64) -> RuntimeResult<Self> {
        require(
            comparison,
            &[Comparison::Gt, Comparison::Gte, Comparison::Lt, Comparison::Lte],
            "CreatedAgoCondition/UpdatedAgoCondition",
        )?;
        Ok(Self { comparison, threshold_seconds, field })
    }

    fn check(&self, change: &dyn ChangeTarget, now: i64) -> bool {
        let timestamp = match self.field {
            AgoField::Created => change.created_at(),
            AgoField::Updated => change.updated_at(),
        };
        let age = now - timestamp;
        match self.comparison {
            Comparison::Gt => age > self.threshold_seconds,
            Comparison::Gte => age >= self.threshold_seconds,
            Comparison::Lt => age < self.threshold_seconds,
            Comparison::Lte => age <= self.threshold_seconds,
            _ => unreachable!("validated at construction"),
        }
    }
}

/// A parameterized HTTP request whose (possibly JSON-descended) response
/// body is compared against a literal value (spec.md §4.2.1: "`RequestStr`
/// interprets the response either as raw text or ... by JSON-decoding and
/// descending"), via the templated handler shared with the `Request`
/// action.
#[derive(Clone, Debug)]
pub struct RequestStrCondition {
    http: TemplatedHttp,
    response_field: Option<String>,
    comparison: Comparison,
    value: String,
}

impl RequestStrCondition {
    pub fn new(
        http: TemplatedHttp,
        response_field: Option<String>,
        comparison: Comparison,
        value: String,
    ) -> RuntimeResult<Self> {
        require(
            comparison,
            &[Comparison::Equal, Comparison::NotEqual, Comparison::Contains, Comparison::NotContains],
            "RequestStrCondition",
        )?;
        Ok(Self { http, response_field, comparison, value })
    }

    fn check(&self, change: &dyn ChangeTarget) -> bool {
        let actual = match self.http.invoke_str(change, self.response_field.as_deref()) {
            Ok(actual) => actual,
            Err(e) => {
                at_core::emit_warning("condition", format!("RequestStr condition failed: {e}"));
                return false;
            }
        };
        match self.comparison {
            Comparison::Equal => actual == self.value,
            Comparison::NotEqual => actual != self.value,
            Comparison::Contains => actual.contains(&self.value),
            Comparison::NotContains => !actual.contains(&self.value),
            _ => unreachable!("validated at construction"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregator {
    All,
    Any,
}

#[derive(Clone, Debug)]
pub enum Condition {
    State(StateCondition),
    ReviewState(ReviewStateCondition),
    SchemaName(SchemaNameCondition),
    Set(SetCondition),
    Ago(AgoCondition),
    RequestStr(RequestStrCondition),
    Aggregate(Aggregator, Vec<Condition>),
}

impl Condition {
    pub fn check(&self, change: &dyn ChangeTarget, now: i64) -> bool {
        match self {
            Condition::State(c) => c.check(change),
            Condition::ReviewState(c) => c.check(change),
            Condition::SchemaName(c) => c.check(change),
            Condition::Set(c) => c.check(change),
            Condition::Ago(c) => c.check(change, now),
            Condition::RequestStr(c) => c.check(change),
            Condition::Aggregate(Aggregator::All, conditions) => {
                conditions.iter().all(|c| c.check(change, now))
            }
            Condition::Aggregate(Aggregator::Any, conditions) => {
                conditions.iter().any(|c| c.check(change, now))
            }
        }
    }
}

/// The JSON-decoded shape of a `Condition` bundle (spec.md §9 "TypedDict-like
/// bundles ... become tagged variants"), one tagged variant per leaf plus
/// `Aggregate`. [`TryFrom`] runs each variant through the same validated
/// constructor used when building a `Condition` in Rust code, so a
/// comparison outside a leaf's declared subset is still rejected here.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionDto {
    State {
        comparison: Comparison,
        values: Vec<ChangeState>,
    },
    ReviewState {
        comparison: Comparison,
        values: Vec<ReviewState>,
    },
    SchemaName {
        comparison: Comparison,
        values: Vec<String>,
    },
    Labels {
        comparison: Comparison,
        values: Vec<String>,
    },
    Reviewers {
        comparison: Comparison,
        values: Vec<String>,
    },
    CreatedAgo {
        comparison: Comparison,
        threshold_seconds: i64,
    },
    UpdatedAgo {
        comparison: Comparison,
        threshold_seconds: i64,
    },
    RequestStr {
        url: String,
        method: HttpMethod,
        #[serde(default)]
        headers: Value,
        #[serde(default)]
        params: Value,
        #[serde(default)]
        data: Value,
        #[serde(default)]
        response_field: Option<String>,
        comparison: Comparison,
        value: String,
    },
    Aggregate {
        aggregator: Aggregator,
        conditions: Vec<ConditionDto>,
    },
}

impl TryFrom<ConditionDto> for Condition {
    type Error = RuntimeError;

    fn try_from(dto: ConditionDto) -> RuntimeResult<Self> {
        Ok(match dto {
            ConditionDto::State { comparison, values } => {
                Condition::State(StateCondition::new(comparison, values)?)
            }
            ConditionDto::ReviewState { comparison, values } => {
                Condition::ReviewState(ReviewStateCondition::new(comparison, values)?)
            }
            ConditionDto::SchemaName { comparison, values } => {
                Condition::SchemaName(SchemaNameCondition::new(comparison, values)?)
            }
            ConditionDto::Labels { comparison, values } => {
                Condition::Set(SetCondition::new(SetField::Labels, comparison, values)?)
            }
            ConditionDto::Reviewers { comparison, values } => {
                Condition::Set(SetCondition::new(SetField::Reviewers, comparison, values)?)
            }
            ConditionDto::CreatedAgo { comparison, threshold_seconds } => {
                Condition::Ago(AgoCondition::new(AgoField::Created, comparison, threshold_seconds)?)
            }
            ConditionDto::UpdatedAgo { comparison, threshold_seconds } => {
                Condition::Ago(AgoCondition::new(AgoField::Updated, comparison, threshold_seconds)?)
            }
            ConditionDto::RequestStr { url, method, headers, params, data, response_field, comparison, value } => {
                let http = TemplatedHttp::new(url, method, headers, params, data);
                Condition::RequestStr(RequestStrCondition::new(http, response_field, comparison, value)?)
            }
            ConditionDto::Aggregate { aggregator, conditions } => Condition::Aggregate(
                aggregator,
                conditions
                    .into_iter()
                    .map(Condition::try_from)
                    .collect::<RuntimeResult<Vec<_>>>()?,
            ),
        })
    }
}

impl Condition {
    /// Parses a Condition from its JSON bundle form (spec.md §6.1 applied to
    /// Step payloads), used when loading Manager config from disk.
    pub fn from_json(value: serde_json::Value) -> RuntimeResult<Self> {
        let dto: ConditionDto = serde_json::from_value(value)
            .map_err(|e| RuntimeError::from(RuntimeReason::Config(format!("invalid condition: {e}"))))?;
        Condition::try_from(dto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubChange {
        state: ChangeState,
        review_state: ReviewState,
        labels: Vec<String>,
        created_at: i64,
    }

    impl ChangeTarget for StubChange {
        fn schema_name(&self) -> &str {
            "s"
        }
        fn state(&self) -> ChangeState {
            self.state
        }
        fn review_state(&self) -> ReviewState {
            self.review_state
        }
        fn test_state(&self) -> at_core::TestState {
            at_core::TestState::Pending
        }
        fn labels(&self) -> &[String] {
            &self.labels
        }
        fn reviewers(&self) -> &[String] {
            &[]
        }
        fn team_reviewers(&self) -> &[String] {
            &[]
        }
        fn created_at(&self) -> i64 {
            self.created_at
        }
        fn updated_at(&self) -> i64 {
            self.created_at
        }
        fn batch(&self) -> anyhow::Result<at_core::Batch> {
            anyhow::bail!("unused in tests")
        }
        fn schema_bundle(&self) -> anyhow::Result<at_core::Bundle> {
            anyhow::bail!("unused in tests")
        }
        fn abandon(&self) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn merge(&self) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn add_labels(&self, _labels: &[String]) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn remove_label(&self, _label: &str) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn add_reviewers(&self, _r: &[String], _t: &[String]) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn comment(&self, _body: &str) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn review_state_equal_approved() {
        let condition = Condition::ReviewState(
            ReviewStateCondition::new(Comparison::Equal, vec![ReviewState::Approved]).unwrap(),
        );
        let change = StubChange {
            state: ChangeState::Open,
            review_state: ReviewState::Approved,
            labels: vec![],
            created_at: 0,
        };
        assert!(condition.check(&change, 0));
    }

    #[test]
    fn ago_condition_rejects_equality_comparison() {
        assert!(AgoCondition::new(AgoField::Created, Comparison::Equal, 60).is_err());
    }

    #[test]
    fn request_str_condition_rejects_ago_style_comparison() {
        let http = TemplatedHttp::new(
            "http://example.invalid",
            HttpMethod::Get,
            Value::Null,
            Value::Null,
            Value::Null,
        );
        assert!(RequestStrCondition::new(http, None, Comparison::Gt, "x".into()).is_err());
    }

    #[test]
    fn request_str_condition_parses_from_json() {
        let condition = Condition::from_json(serde_json::json!({
            "type": "REQUEST_STR",
            "url": "http://example.invalid",
            "method": "GET",
            "response_field": "a//b",
            "comparison": "EQUAL",
            "value": "ready",
        }))
        .unwrap();
        assert!(matches!(condition, Condition::RequestStr(_)));
    }

    #[test]
    fn aggregate_all_requires_every_leaf() {
        let change = StubChange {
            state: ChangeState::Open,
            review_state: ReviewState::Approved,
            labels: vec!["ready".into()],
            created_at: 0,
        };
        let condition = Condition::Aggregate(
            Aggregator::All,
            vec![
                Condition::ReviewState(
                    ReviewStateCondition::new(Comparison::Equal, vec![ReviewState::Approved]).unwrap(),
                ),
                Condition::Set(
                    SetCondition::new(SetField::Labels, Comparison::Contains, vec!["ready".into()]).unwrap(),
                ),
            ],
        );
        assert!(condition.check(&change, 0));
    }
}
