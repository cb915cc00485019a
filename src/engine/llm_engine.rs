//! LLM-driven planner and sequential plan executor.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::plan::{Output, Plan, PlanRun, PlanRunState, Step, Variable};
use super::prompt::{
    build_direct_prompt, build_plan_prompt, build_step_prompt, EXECUTOR_SYSTEM, PLANNER_SYSTEM,
};
use super::{Engine, EngineError};
use crate::llm::{CompletionRequest, LlmClient};
use crate::tools::ToolRegistry;

pub struct LlmEngine {
    llm: Arc<dyn LlmClient>,
}

impl LlmEngine {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn complete_json(&self, system: &str, prompt: String) -> Result<Value, EngineError> {
        let raw = self
            .llm
            .complete(CompletionRequest::new(prompt).with_system(system).json())
            .await?;
        parse_json_reply(&raw)
    }

    /// Ask the LLM how to invoke the step's tool.
    async fn decide(&self, step: &Step, tools: &ToolRegistry, run: &PlanRun) -> Result<Decision, EngineError> {
        let schema = step
            .tool_id
            .as_deref()
            .and_then(|id| tools.get(id))
            .map(|t| t.parameters_schema())
            .unwrap_or(Value::Null);
        let prompt = build_step_prompt(step, &schema, &run.outputs.step_outputs);
        let reply = self.complete_json(EXECUTOR_SYSTEM, prompt).await?;
        Ok(Decision::from_reply(reply))
    }
}

#[derive(Debug, Deserialize)]
struct PlannedSteps {
    steps: Vec<PlannedStep>,
}

#[derive(Debug, Deserialize)]
struct PlannedStep {
    task: String,
    #[serde(default)]
    tool_id: Option<String>,
    #[serde(default)]
    inputs: Vec<PlannedInput>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    condition: Option<String>,
}

/// Planners sometimes list inputs as bare names instead of objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlannedInput {
    Name(String),
    Full(Variable),
}

impl From<PlannedInput> for Variable {
    fn from(input: PlannedInput) -> Self {
        match input {
            PlannedInput::Name(name) => Variable {
                name,
                description: String::new(),
            },
            PlannedInput::Full(v) => v,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Decision {
    Call(Value),
    Skip,
    Clarify(String),
}

impl Decision {
    fn from_reply(mut reply: Value) -> Self {
        if let Some(question) = reply["clarification"].as_str() {
            return Self::Clarify(question.to_string());
        }
        if reply["skip"].as_bool().unwrap_or(false) {
            return Self::Skip;
        }
        match reply.get_mut("args") {
            Some(args) => Self::Call(args.take()),
            // Bare argument objects are common enough to accept.
            None => Self::Call(reply),
        }
    }
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex"))
}

/// Parse a JSON reply. A Markdown code fence is only unwrapped when the
/// reply as a whole is not JSON, since string values may contain fences.
fn parse_json_reply(raw: &str) -> Result<Value, EngineError> {
    let raw = raw.trim();
    if let Ok(value) = serde_json::from_str(raw) {
        return Ok(value);
    }
    let body = fence_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(raw);
    serde_json::from_str(body).map_err(|e| EngineError::InvalidReply(format!("{}: {}", e, body)))
}

fn normalize_var(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('$') {
        name.to_string()
    } else {
        format!("${}", name)
    }
}

fn build_steps(planned: PlannedSteps, tools: &ToolRegistry) -> Result<Vec<Step>, EngineError> {
    if planned.steps.is_empty() {
        return Err(EngineError::EmptyPlan);
    }
    planned
        .steps
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let tool_id = s.tool_id.filter(|t| !t.is_empty() && t != "null");
            if let Some(id) = &tool_id {
                if !tools.contains(id) {
                    return Err(EngineError::UnknownTool(id.clone()));
                }
            }
            Ok(Step {
                task: s.task,
                inputs: s
                    .inputs
                    .into_iter()
                    .map(Variable::from)
                    .map(|v| Variable {
                        name: normalize_var(&v.name),
                        ..v
                    })
                    .collect(),
                tool_id,
                output: s
                    .output
                    .map(|o| normalize_var(&o))
                    .unwrap_or_else(|| format!("$step_{}_output", i)),
                condition: s.condition.filter(|c| !c.trim().is_empty()),
            })
        })
        .collect()
}

#[async_trait]
impl Engine for LlmEngine {
    async fn plan(&self, query: &str, tools: &ToolRegistry) -> Result<Plan, EngineError> {
        let reply = self
            .complete_json(PLANNER_SYSTEM, build_plan_prompt(query, tools))
            .await?;
        let planned: PlannedSteps = serde_json::from_value(reply)
            .map_err(|e| EngineError::InvalidPlan(e.to_string()))?;
        let steps = build_steps(planned, tools)?;

        let plan = Plan::new(query, tools.ids(), steps);
        tracing::info!(plan_id = %plan.id, steps = plan.steps.len(), "Created plan");
        Ok(plan)
    }

    async fn run(&self, plan: &Plan, tools: &ToolRegistry) -> Result<PlanRun, EngineError> {
        let mut run = PlanRun::for_plan(plan);
        run.state = PlanRunState::InProgress;
        let mut last_output: Option<Output> = None;

        for (index, step) in plan.steps.iter().enumerate() {
            run.current_step_index = index;
            tracing::debug!(plan_run_id = %run.id, step = index, tool = ?step.tool_id, "Running step");

            let output = match &step.tool_id {
                None => {
                    let text = self
                        .llm
                        .complete(CompletionRequest::new(build_direct_prompt(
                            step,
                            &run.outputs.step_outputs,
                        )))
                        .await?;
                    Output::value(text)
                }
                Some(tool_id) => match self.decide(step, tools, &run).await? {
                    Decision::Skip => Output {
                        value: None,
                        summary: Some("Condition not met; step skipped".to_string()),
                    },
                    Decision::Clarify(question) => {
                        tracing::info!(plan_run_id = %run.id, step = index, "Run needs clarification");
                        run.state = PlanRunState::NeedClarification;
                        run.outputs.clarification = Some(question);
                        return Ok(run);
                    }
                    Decision::Call(args) => match tools.execute(tool_id, args).await {
                        Ok(text) => Output::value(text),
                        Err(e) => {
                            tracing::warn!(plan_run_id = %run.id, tool = %tool_id, "Tool failed: {}", e);
                            run.state = PlanRunState::Failed;
                            run.outputs.error = Some(format!("{}: {}", tool_id, e));
                            return Ok(run);
                        }
                    },
                },
            };

            if output.value.is_some() {
                last_output = Some(output.clone());
            }
            run.outputs.step_outputs.insert(step.output.clone(), output);
        }

        run.state = PlanRunState::Complete;
        run.outputs.final_output = last_output;
        tracing::info!(plan_run_id = %run.id, "Plan run complete");
        Ok(run)
    }
}
