//! Plan-then-execute engine.
//!
//! The service only depends on the [`Engine`] trait: hand it a goal and the
//! tool registry, get back an ordered [`Plan`]; hand it the plan, get back a
//! [`PlanRun`]. [`LlmEngine`] is the production implementation.

mod llm_engine;
mod plan;
mod prompt;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::ToolRegistry;

pub use llm_engine::LlmEngine;
pub use plan::{Output, Plan, PlanContext, PlanRun, PlanRunOutputs, PlanRunState, Step, Variable};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Planner returned an invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Plan references unknown tool: {0}")]
    UnknownTool(String),

    #[error("LLM reply is not valid JSON: {0}")]
    InvalidReply(String),

    #[error("Planner returned no steps")]
    EmptyPlan,
}

#[async_trait]
pub trait Engine: Send + Sync {
    /// Turn a natural-language goal into an ordered plan over `tools`.
    async fn plan(&self, query: &str, tools: &ToolRegistry) -> Result<Plan, EngineError>;

    /// Execute `plan`. Tool failures end the run in [`PlanRunState::Failed`]
    /// rather than returning an error.
    async fn run(&self, plan: &Plan, tools: &ToolRegistry) -> Result<PlanRun, EngineError>;
}

#[cfg(test)]
pub(crate) mod stub {
    use std::sync::Mutex;

    use super::*;
    use serde_json::Value;

    /// Deterministic engine for tests.
    ///
    /// Plans one step per configured tool id; the run finishes with
    /// `final_value` (or no output when it is `None`).
    #[derive(Default)]
    pub struct StubEngine {
        pub steps: Vec<(String, String)>,
        pub final_value: Option<Value>,
        pub state: Option<PlanRunState>,
        pub fail_plan: bool,
        pub fail_run: bool,
        pub queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Engine for StubEngine {
        async fn plan(&self, query: &str, tools: &ToolRegistry) -> Result<Plan, EngineError> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail_plan {
                return Err(EngineError::InvalidPlan("stub refused".to_string()));
            }
            let steps = self
                .steps
                .iter()
                .enumerate()
                .map(|(i, (task, tool))| Step {
                    task: task.clone(),
                    inputs: Vec::new(),
                    tool_id: Some(tool.clone()),
                    output: format!("$step_{}", i),
                    condition: None,
                })
                .collect();
            Ok(Plan::new(query, tools.ids(), steps))
        }

        async fn run(&self, plan: &Plan, _tools: &ToolRegistry) -> Result<PlanRun, EngineError> {
            if self.fail_run {
                return Err(EngineError::UnknownTool("stub_tool".to_string()));
            }
            let mut run = PlanRun::for_plan(plan);
            run.current_step_index = plan.steps.len().saturating_sub(1);
            run.state = self.state.unwrap_or(PlanRunState::Complete);
            run.outputs.final_output = self.final_value.clone().map(Output::value);
            Ok(run)
        }
    }
}
