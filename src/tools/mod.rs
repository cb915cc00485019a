//! Tool registry shared by the planner and the executor.
//!
//! Tools come from two sources: the remote MCP server (domain actions such as
//! fetching subreddit posts) and the built-in defaults in this module. The
//! registry is built once at startup and never mutated afterwards.

mod llm_tool;
pub mod mcp;
mod web;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::llm::LlmClient;

pub use llm_tool::LlmTool;
pub use mcp::{McpTool, McpToolSource};
pub use web::{WebFetch, WebSearch};

/// A callable action the planning engine may assign to a step.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry identifier.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Name and description of a registered tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Ordered set of tools keyed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The generic built-in tools.
    pub fn defaults(llm: Arc<dyn LlmClient>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LlmTool::new(llm)));
        registry.register(Arc::new(WebSearch));
        registry.register(Arc::new(WebFetch));
        registry
    }

    /// Add a tool. Returns false (and keeps the existing tool) when the name is taken.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            tracing::warn!(tool = %name, "Duplicate tool id; keeping the first registration");
            return false;
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        true
    }

    /// Union of two registries. Tools from `self` come first.
    ///
    /// Which tool wins on a duplicate id is not part of the contract.
    pub fn merge(mut self, other: ToolRegistry) -> Self {
        for tool in other.tools {
            self.register(tool);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn ids(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, args: Value) -> anyhow::Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;
        tracing::info!(tool = %name, "Executing tool");
        tool.execute(args).await
    }
}

impl std::ops::Add for ToolRegistry {
    type Output = ToolRegistry;

    fn add(self, rhs: ToolRegistry) -> ToolRegistry {
        self.merge(rhs)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.ids())
            .finish()
    }
}
