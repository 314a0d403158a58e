//! Declarative management rules (spec.md §2 component I, §3 "Step").
//! Currently one variant, `Conditional`, matching
//! `original_source/autotransform/step/base.py` + `step/action.py`'s single
//! `ConditionalStep` concrete class.

use at_schema::ChangeTarget;
use serde::Deserialize;
use serde_json::Value;

use crate::action::{Action, ActionDto};
use crate::condition::{Condition, ConditionDto};
use crate::error::{RuntimeError, RuntimeReason, RuntimeResult};

#[derive(Clone, Debug)]
pub enum Step {
    Conditional {
        condition: Condition,
        actions: Vec<Action>,
        continue_if_passed: bool,
    },
}

impl Step {
    /// `step.get_actions(change)` (spec.md §4.2 step 3a): the configured
    /// actions if the condition holds, else none.
    pub fn get_actions(&self, change: &dyn ChangeTarget, now: i64) -> &[Action] {
        match self {
            Step::Conditional { condition, actions, .. } => {
                if condition.check(change, now) {
                    actions
                } else {
                    &[]
                }
            }
        }
    }

    /// Whether the Management Loop should continue to the next step after
    /// this one returned a non-empty action list (spec.md §4.2 "Continue
    /// semantics"). Only meaningful when `get_actions` returned actions; the
    /// loop always continues when it returned none.
    pub fn continue_if_passed(&self) -> bool {
        match self {
            Step::Conditional { continue_if_passed, .. } => *continue_if_passed,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StepDto {
    condition: ConditionDto,
    actions: Vec<ActionDto>,
    #[serde(default)]
    continue_if_passed: bool,
}

impl TryFrom<StepDto> for Step {
    type Error = RuntimeError;

    fn try_from(dto: StepDto) -> RuntimeResult<Self> {
        Ok(Step::Conditional {
            condition: Condition::try_from(dto.condition)?,
            actions: dto
                .actions
                .into_iter()
                .map(Action::try_from)
                .collect::<RuntimeResult<Vec<_>>>()?,
            continue_if_passed: dto.continue_if_passed,
        })
    }
}

impl Step {
    pub fn from_json(value: Value) -> RuntimeResult<Self> {
        let dto: StepDto = serde_json::from_value(value)
            .map_err(|e| RuntimeError::from(RuntimeReason::Config(format!("invalid step: {e}"))))?;
        Step::try_from(dto)
    }
}
