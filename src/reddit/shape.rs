//! Markdown rendering of plans and final-output extraction.

use serde_json::Value;

use crate::engine::{Plan, PlanRun};

/// Render the plan's tools and steps as Markdown.
pub fn render_plan(plan: &Plan) -> String {
    let mut parts = vec!["### Available Tools\n".to_string()];
    parts.extend(
        plan.plan_context
            .tool_ids
            .iter()
            .map(|id| format!("- **{}**\n", id)),
    );
    parts.push("\n\n### Execution Steps\n".to_string());
    parts.extend(plan.steps.iter().map(|step| {
        format!(
            "\n**Task:** {} \n**Tool:** {}",
            step.task,
            step.tool_id.as_deref().unwrap_or("none")
        )
    }));
    parts.join("\n")
}

/// The run's terminal value, unchanged.
pub fn final_output(run: &PlanRun) -> Option<Value> {
    run.final_value().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Output, PlanRunState, Step};
    use serde_json::json;

    fn plan() -> Plan {
        let step = |task: &str, tool: Option<&str>| Step {
            task: task.to_string(),
            inputs: Vec::new(),
            tool_id: tool.map(str::to_string),
            output: "$x".to_string(),
            condition: None,
        };
        Plan::new(
            "q",
            vec!["mcp:aci-apps-stdio:REDDIT__GET".to_string(), "llm_tool".to_string()],
            vec![
                step("Fetch posts", Some("mcp:aci-apps-stdio:REDDIT__GET")),
                step("Summarise", Some("llm_tool")),
                step("Wrap up", None),
            ],
        )
    }

    #[test]
    fn renders_tools_then_steps_in_order() {
        let md = render_plan(&plan());
        assert_eq!(
            md,
            "### Available Tools\n\n\
             - **mcp:aci-apps-stdio:REDDIT__GET**\n\n\
             - **llm_tool**\n\n\
             \n\n### Execution Steps\n\n\
             \n**Task:** Fetch posts \n**Tool:** mcp:aci-apps-stdio:REDDIT__GET\n\
             \n**Task:** Summarise \n**Tool:** llm_tool\n\
             \n**Task:** Wrap up \n**Tool:** none"
        );
    }

    #[test]
    fn one_bullet_per_tool_and_block_per_step() {
        let md = render_plan(&plan());
        assert_eq!(md.matches("- **").count(), 2);
        assert_eq!(md.matches("**Task:**").count(), 3);
        let fetch = md.find("Fetch posts").expect("fetch");
        let summarise = md.find("Summarise").expect("summarise");
        assert!(fetch < summarise);
    }

    #[test]
    fn final_output_is_passed_through() {
        let mut run = PlanRun::for_plan(&plan());
        assert_eq!(final_output(&run), None);

        let value = json!({"markdown": "# r/python", "posts": [1, 2]});
        run.state = PlanRunState::Complete;
        run.outputs.final_output = Some(Output::value(value.clone()));
        assert_eq!(final_output(&run), Some(value));
    }
}
