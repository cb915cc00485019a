//! Plan and PlanRun records.
//!
//! The serialized shape matches what the frontend and existing tooling expect
//! from a plan dump: `{id, plan_context: {query, tool_ids}, steps, plan_inputs}`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// What the planner was asked and which tools it could choose from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanContext {
    pub query: String,
    pub tool_ids: Vec<String>,
}

/// A named value consumed by a step, e.g. `$latest_posts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub task: String,
    #[serde(default)]
    pub inputs: Vec<Variable>,
    /// None means the step is answered by the engine without a tool.
    pub tool_id: Option<String>,
    /// Variable the step's output is stored under.
    pub output: String,
    /// Natural-language guard; the step is skipped when it does not hold.
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub plan_context: PlanContext,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub plan_inputs: Vec<Variable>,
}

impl Plan {
    pub fn new(query: impl Into<String>, tool_ids: Vec<String>, steps: Vec<Step>) -> Self {
        Self {
            id: format!("plan-{}", Uuid::new_v4()),
            plan_context: PlanContext {
                query: query.into(),
                tool_ids,
            },
            steps,
            plan_inputs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanRunState {
    NotStarted,
    InProgress,
    NeedClarification,
    Complete,
    Failed,
}

impl std::fmt::Display for PlanRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NOT_STARTED"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::NeedClarification => write!(f, "NEED_CLARIFICATION"),
            Self::Complete => write!(f, "COMPLETE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// A step result. `value` is absent when the step was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub value: Option<Value>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Output {
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            summary: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRunOutputs {
    #[serde(default)]
    pub step_outputs: HashMap<String, Output>,
    pub final_output: Option<Output>,
    /// Question the engine needs answered before it can continue.
    #[serde(default)]
    pub clarification: Option<String>,
    /// Why the run failed, when it did.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRun {
    pub id: String,
    pub plan_id: String,
    pub current_step_index: usize,
    pub state: PlanRunState,
    pub outputs: PlanRunOutputs,
}

impl PlanRun {
    pub fn for_plan(plan: &Plan) -> Self {
        Self {
            id: format!("prun-{}", Uuid::new_v4()),
            plan_id: plan.id.clone(),
            current_step_index: 0,
            state: PlanRunState::NotStarted,
            outputs: PlanRunOutputs::default(),
        }
    }

    /// The terminal value, if the run produced one.
    pub fn final_value(&self) -> Option<&Value> {
        self.outputs.final_output.as_ref()?.value.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_deserializes_dump_shape() {
        let plan: Plan = serde_json::from_value(json!({
            "id": "plan-1",
            "plan_context": {"query": "q", "tool_ids": ["llm_tool"]},
            "steps": [{"task": "t", "tool_id": "llm_tool", "output": "$out"}]
        }))
        .expect("parse");
        assert_eq!(plan.steps[0].condition, None);
        assert!(plan.steps[0].inputs.is_empty());
        assert!(plan.plan_inputs.is_empty());
    }

    #[test]
    fn state_serializes_screaming() {
        assert_eq!(
            serde_json::to_value(PlanRunState::NeedClarification).expect("ser"),
            json!("NEED_CLARIFICATION")
        );
        assert_eq!(PlanRunState::Complete.to_string(), "COMPLETE");
    }

    #[test]
    fn final_value_requires_both_layers() {
        let plan = Plan::new("q", vec![], vec![]);
        let mut run = PlanRun::for_plan(&plan);
        assert_eq!(run.plan_id, plan.id);
        assert!(run.final_value().is_none());

        run.outputs.final_output = Some(Output {
            value: None,
            summary: None,
        });
        assert!(run.final_value().is_none());

        run.outputs.final_output = Some(Output::value("digest"));
        assert_eq!(run.final_value(), Some(&json!("digest")));
    }
}
