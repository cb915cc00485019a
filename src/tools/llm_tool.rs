//! General-purpose text tool backed by the configured LLM.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::llm::{CompletionRequest, LlmClient};

const SYSTEM: &str = "You are a helpful assistant used as a tool inside a multi-step plan. \
Complete the task using only the provided context. Answer with the result itself, no preamble.";

/// Summarise, rewrite, classify or format text with the LLM.
pub struct LlmTool {
    llm: Arc<dyn LlmClient>,
}

impl LlmTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

fn build_prompt(task: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) if !ctx.trim().is_empty() => {
            format!("Task:\n{}\n\nContext:\n{}", task, ctx)
        }
        _ => format!("Task:\n{}", task),
    }
}

#[async_trait]
impl Tool for LlmTool {
    fn name(&self) -> &str {
        "llm_tool"
    }

    fn description(&self) -> &str {
        "Jack of all trades tool for text: summarise, filter, draft replies, or format content as Markdown. Pass earlier step outputs as context."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "What to do with the context"
                },
                "context": {
                    "type": "string",
                    "description": "Text the task operates on"
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let task = args["task"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'task' argument"))?;
        let context = match &args["context"] {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        };

        let request =
            CompletionRequest::new(build_prompt(task, context.as_deref())).with_system(SYSTEM);
        Ok(self.llm.complete(request).await?)
    }
}
