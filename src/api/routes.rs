//! Router, shared state and the informational routes.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use super::reddit::search_reddit;
use super::types::{ChatMessage, ChatResponse, MessageResponse};
use crate::config::Config;
use crate::engine::{Engine, LlmEngine};
use crate::llm::{GeminiClient, LlmClient};
use crate::tools::{McpToolSource, ToolRegistry};

/// Process-wide state. Built once before serving and never mutated.
pub struct AppState {
    pub config: Config,
    pub tools: ToolRegistry,
    pub engine: Arc<dyn Engine>,
}

impl AppState {
    /// Build the LLM client, tool registry and engine from `config`.
    ///
    /// May spawn the MCP tool server; failures there only reduce the tool set.
    pub async fn from_config(config: Config) -> Self {
        let llm: Arc<dyn LlmClient> = Arc::new(GeminiClient::new(
            config.provider.api_key.clone(),
            config.provider.default_model.clone(),
        ));

        let remote = McpToolSource::load(&config.mcp).await;
        let tools = remote + ToolRegistry::defaults(Arc::clone(&llm));
        tracing::info!(tools = ?tools.ids(), "Tool registry ready");

        Self {
            config,
            tools,
            engine: Arc::new(LlmEngine::new(llm)),
        }
    }
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", origin, e))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

pub fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config.cors_origin)?;
    Ok(Router::new()
        .route("/", get(root))
        .route("/hello", get(hello))
        .route("/chat", post(chat))
        .route("/search_reddit", post(search_reddit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Build the state from `config` and serve until the process exits.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::from_config(config).await);
    let app = router(state)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

/// GET / - liveness message.
async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("FastAPI Backend is running!"))
}

/// GET /hello
async fn hello() -> Json<MessageResponse> {
    Json(MessageResponse::new("Hello world"))
}

/// POST /chat - placeholder; the reply does not depend on the message.
async fn chat(Json(_message): Json<ChatMessage>) -> Json<ChatResponse> {
    Json(ChatResponse {
        response: "Hello world".to_string(),
    })
}
