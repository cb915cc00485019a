//! Prompt templates for planning and step execution.

use std::collections::HashMap;

use super::plan::{Output, Step};
use crate::tools::ToolRegistry;

pub const PLANNER_SYSTEM: &str = r#"You are a planning agent. You turn a user's goal into an ordered list of steps that a separate executor will run one by one.

## Rules

1. **Only use listed tools** - Every step must name one tool id from the tool list, or null when no tool is needed.
2. **One action per step** - Keep each task small enough for a single tool call.
3. **Name every output** - Each step stores its result in a variable whose name starts with `$`. Later steps list the variables they read in `inputs`.
4. **Conditions are optional** - Use `condition` only when a step should run selectively, phrased as a plain-language test over earlier outputs.
5. **Keep the order** - Steps run in the order given. Never refer to a variable before the step that produces it.

## Response Format

Respond with a JSON object and nothing else:
{"steps": [{"task": "...", "tool_id": "...", "inputs": [{"name": "$var", "description": "..."}], "output": "$var", "condition": null}]}"#;

pub const EXECUTOR_SYSTEM: &str = r#"You are the executor for one step of a plan. Decide how to call the step's tool.

Respond with exactly one JSON object:
- {"args": {...}} with arguments matching the tool's parameter schema, or
- {"skip": true} if the step has a condition and the earlier outputs show it does not hold, or
- {"clarification": "question"} if the information needed for the arguments is missing and cannot be inferred."#;

/// Planning prompt listing every tool in the registry.
pub fn build_plan_prompt(query: &str, tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "## Available Tools\n{tool_descriptions}\n\n## Goal\n{query}",
        tool_descriptions = tool_descriptions,
        query = query.trim()
    )
}

/// Argument-selection prompt for a single step.
pub fn build_step_prompt(
    step: &Step,
    schema: &serde_json::Value,
    outputs: &HashMap<String, Output>,
) -> String {
    let mut prompt = format!("## Task\n{}\n\n## Tool parameters\n{}\n", step.task, schema);

    if let Some(condition) = &step.condition {
        prompt.push_str(&format!("\n## Condition\n{}\n", condition));
    }

    let inputs: Vec<String> = step
        .inputs
        .iter()
        .filter_map(|input| {
            let value = outputs.get(&input.name)?.value.as_ref()?;
            Some(format!("### {}\n{}", input.name, render_value(value)))
        })
        .collect();
    if !inputs.is_empty() {
        prompt.push_str("\n## Earlier outputs\n");
        prompt.push_str(&inputs.join("\n\n"));
        prompt.push('\n');
    }

    prompt
}

/// Prompt used when a step has no tool and the engine answers it directly.
pub fn build_direct_prompt(step: &Step, outputs: &HashMap<String, Output>) -> String {
    let context: Vec<String> = step
        .inputs
        .iter()
        .filter_map(|input| {
            let value = outputs.get(&input.name)?.value.as_ref()?;
            Some(format!("{}:\n{}", input.name, render_value(value)))
        })
        .collect();
    if context.is_empty() {
        step.task.clone()
    } else {
        format!("{}\n\nContext:\n{}", step.task, context.join("\n\n"))
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::plan::Variable;
    use crate::tools::testing::registry;

    fn step(inputs: &[&str], condition: Option<&str>) -> Step {
        Step {
            task: "Summarise the posts".to_string(),
            inputs: inputs
                .iter()
                .map(|n| Variable {
                    name: n.to_string(),
                    description: String::new(),
                })
                .collect(),
            tool_id: Some("llm_tool".to_string()),
            output: "$summary".to_string(),
            condition: condition.map(str::to_string),
        }
    }

    #[test]
    fn plan_prompt_lists_tools() {
        let prompt = build_plan_prompt("  get posts ", &registry(&["llm_tool", "search_tool"]));
        assert!(prompt.contains("- **llm_tool**: Echo the arguments back"));
        assert!(prompt.contains("- **search_tool**"));
        assert!(prompt.ends_with("## Goal\nget posts"));
    }

    #[test]
    fn step_prompt_includes_condition_and_known_inputs() {
        let mut outputs = HashMap::new();
        outputs.insert("$posts".to_string(), Output::value("post list"));
        let prompt = build_step_prompt(
            &step(&["$posts", "$missing"], Some("posts were found")),
            &serde_json::json!({"type": "object"}),
            &outputs,
        );
        assert!(prompt.contains("## Condition\nposts were found"));
        assert!(prompt.contains("### $posts\npost list"));
        assert!(!prompt.contains("$missing"));
    }

    #[test]
    fn direct_prompt_without_inputs_is_the_task() {
        assert_eq!(
            build_direct_prompt(&step(&[], None), &HashMap::new()),
            "Summarise the posts"
        );
    }
}
