//! `POST /search_reddit` - plan and run a subreddit digest.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use thiserror::Error;

use super::routes::AppState;
use super::types::{ChatMessage, SearchRedditResponse};
use crate::engine::{EngineError, PlanRunState};
use crate::reddit::{final_output, render_plan};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("planning failed: {0}")]
    Planning(#[source] EngineError),

    #[error("execution failed: {source}")]
    Execution {
        /// Plan Markdown rendered before the run failed
        steps: String,
        #[source]
        source: EngineError,
    },
}

impl SearchError {
    pub fn steps(&self) -> &str {
        match self {
            Self::Planning(_) => "",
            Self::Execution { steps, .. } => steps,
        }
    }
}

/// Plan and run the digest for `subreddit`.
pub async fn search(state: &AppState, subreddit: &str) -> Result<SearchRedditResponse, SearchError> {
    let task = state.config.task.render(subreddit);

    let plan = state
        .engine
        .plan(&task, &state.tools)
        .await
        .map_err(SearchError::Planning)?;
    let steps = render_plan(&plan);

    let run = match state.engine.run(&plan, &state.tools).await {
        Ok(run) => run,
        Err(source) => return Err(SearchError::Execution { steps, source }),
    };

    if run.state != PlanRunState::Complete {
        tracing::warn!(
            plan_run_id = %run.id,
            state = %run.state,
            error = ?run.outputs.error,
            "Plan run did not complete"
        );
    }

    Ok(SearchRedditResponse {
        steps,
        final_output: final_output(&run),
        state: Some(run.state),
        clarification: run.outputs.clarification.clone(),
        error: None,
    })
}

/// POST /search_reddit - the request body's `message` is the subreddit name.
pub async fn search_reddit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatMessage>,
) -> (StatusCode, Json<SearchRedditResponse>) {
    tracing::info!(subreddit = %req.message, "Reddit digest requested");

    match search(&state, &req.message).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e) => {
            tracing::warn!(subreddit = %req.message, "Reddit digest failed: {}", e);
            let mut body = SearchRedditResponse {
                steps: e.steps().to_string(),
                ..SearchRedditResponse::default()
            };
            if state.config.strict_errors {
                body.error = Some(e.to_string());
                (StatusCode::BAD_GATEWAY, Json(body))
            } else {
                (StatusCode::OK, Json(body))
            }
        }
    }
}
