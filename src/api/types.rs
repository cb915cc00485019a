//! API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::PlanRunState;

/// Single text field request used by `/chat` and `/search_reddit`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// `{message}` body returned by the informational GET routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of a Reddit digest request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRedditResponse {
    /// Markdown rendering of the plan
    pub steps: String,

    /// The run's final output value, passed through unchanged
    pub final_output: Option<Value>,

    /// Terminal state of the run, when one was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PlanRunState>,

    /// Question the engine asked instead of finishing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,

    /// Planning or execution failure (strict error mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
