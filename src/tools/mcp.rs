//! Remote tools discovered from an MCP server over stdio.
//!
//! The server is spawned once at startup and speaks JSON-RPC 2.0, one message
//! per line. Every tool it lists is wrapped as an [`McpTool`] with the id
//! `mcp:<server_name>:<tool_name>`.

use std::collections::HashMap;
use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};

use super::{Tool, ToolRegistry};
use crate::config::McpConfig;

const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to spawn MCP server '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("MCP server closed its pipes")]
    Disconnected,

    #[error("MCP server error: {0}")]
    Server(String),

    #[error("Malformed MCP response: {0}")]
    Malformed(String),
}

/// In-flight requests by id. `None` once the server's stdout has closed.
type Pending = Arc<Mutex<Option<HashMap<String, oneshot::Sender<Value>>>>>;

/// JSON-RPC connection to a child process.
pub struct StdioClient {
    server_name: String,
    pending: Pending,
    tx: mpsc::Sender<String>,
    // Held for the lifetime of the process; the server is never torn down explicitly.
    _child: Mutex<Child>,
}

impl std::fmt::Debug for StdioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioClient")
            .field("server_name", &self.server_name)
            .finish()
    }
}

impl StdioClient {
    /// Spawn the server and start the reader/writer tasks.
    pub fn spawn(
        server_name: &str,
        command: &str,
        args: &[String],
        env: Vec<(OsString, OsString)>,
    ) -> Result<Self, McpError> {
        let mut child = Command::new(command)
            .args(args)
            .env_clear()
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| McpError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let (Some(mut stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(McpError::Disconnected);
        };

        let pending: Pending = Arc::new(Mutex::new(Some(HashMap::new())));
        let (tx, mut rx) = mpsc::channel::<String>(64);

        let reader_pending = Arc::clone(&pending);
        let name = server_name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Ok(message) = serde_json::from_str::<Value>(&line) else {
                            tracing::debug!(server = %name, "Ignoring non-JSON stdout line");
                            continue;
                        };
                        let Some(id) = message.get("id").and_then(id_key) else {
                            continue;
                        };
                        let sender = reader_pending
                            .lock()
                            .await
                            .as_mut()
                            .and_then(|pending| pending.remove(&id));
                        if let Some(sender) = sender {
                            let _ = sender.send(message);
                        }
                    }
                    Ok(None) => {
                        tracing::warn!(server = %name, "MCP server stdout closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(server = %name, "Error reading MCP stdout: {}", e);
                        break;
                    }
                }
            }
            // Dropping the senders wakes every waiting request with an error;
            // later requests see `None` and fail immediately.
            reader_pending.lock().await.take();
        });

        let name = server_name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(server = %name, "{}", line.trim_end());
            }
        });

        let name = server_name.to_string();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let written = async {
                    stdin.write_all(msg.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.flush().await
                }
                .await;
                if let Err(e) = written {
                    tracing::error!(server = %name, "Failed to write to MCP stdin: {}", e);
                    break;
                }
            }
        });

        Ok(Self {
            server_name: server_name.to_string(),
            pending,
            tx,
            _child: Mutex::new(child),
        })
    }

    /// Send a request and wait for the matching response's `result`.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = uuid::Uuid::new_v4().to_string();
        let message = json!({
            "jsonrpc": "2.0",
            "id": id.clone(),
            "method": method,
            "params": params,
        });

        let (resp_tx, resp_rx) = oneshot::channel();
        match self.pending.lock().await.as_mut() {
            Some(pending) => pending.insert(id.clone(), resp_tx),
            None => return Err(McpError::Disconnected),
        };

        if self.tx.send(message.to_string()).await.is_err() {
            if let Some(pending) = self.pending.lock().await.as_mut() {
                pending.remove(&id);
            }
            return Err(McpError::Disconnected);
        }

        let response = resp_rx.await.map_err(|_| McpError::Disconnected)?;
        into_result(response)
    }

    /// Send a notification (no response expected).
    pub async fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        let message = json!({"jsonrpc": "2.0", "method": method, "params": params});
        self.tx
            .send(message.to_string())
            .await
            .map_err(|_| McpError::Disconnected)
    }

    async fn initialize(&self) -> Result<(), McpError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await?;
        tracing::debug!(
            server = %self.server_name,
            protocol = %result["protocolVersion"],
            "MCP server initialized"
        );
        self.notify("notifications/initialized", json!({})).await
    }

    /// All tools, following `nextCursor` pagination.
    async fn list_tools(&self) -> Result<Vec<RemoteTool>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(c) => json!({"cursor": c}),
                None => json!({}),
            };
            let page: ToolsPage = serde_json::from_value(self.request("tools/list", params).await?)
                .map_err(|e| McpError::Malformed(e.to_string()))?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }
}

fn id_key(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn into_result(mut response: Value) -> Result<Value, McpError> {
    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");
        return Err(McpError::Server(message.to_string()));
    }
    match response.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(McpError::Malformed("response has neither result nor error".to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolsPage {
    #[serde(default)]
    tools: Vec<RemoteTool>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "empty_schema")]
    input_schema: Value,
}

fn empty_schema() -> Value {
    json!({"type": "object"})
}

/// Flatten a `tools/call` result into text.
fn render_call_result(result: &Value) -> anyhow::Result<String> {
    let text = result["content"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| match item["text"].as_str() {
                    Some(t) => t.to_string(),
                    None => item.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_else(|| result.to_string());

    if result["isError"].as_bool().unwrap_or(false) {
        anyhow::bail!("Tool reported an error: {}", text);
    }
    Ok(text)
}

/// A tool exposed by the MCP server.
pub struct McpTool {
    id: String,
    remote_name: String,
    description: String,
    schema: Value,
    client: Arc<StdioClient>,
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let arguments = if args.is_null() { json!({}) } else { args };
        let result = self
            .client
            .request(
                "tools/call",
                json!({"name": self.remote_name, "arguments": arguments}),
            )
            .await?;
        render_call_result(&result)
    }
}

/// Builds the remote half of the tool registry.
pub struct McpToolSource;

impl McpToolSource {
    /// Spawn the configured server and wrap every tool it lists.
    pub async fn connect(config: &McpConfig) -> Result<ToolRegistry, McpError> {
        let client = Arc::new(StdioClient::spawn(
            &config.server_name,
            &config.command,
            &config.args(),
            config.env(),
        )?);
        client.initialize().await?;

        let mut registry = ToolRegistry::new();
        for tool in client.list_tools().await? {
            registry.register(Arc::new(McpTool {
                id: format!("mcp:{}:{}", config.server_name, tool.name),
                description: tool.description.unwrap_or_default(),
                remote_name: tool.name,
                schema: tool.input_schema,
                client: Arc::clone(&client),
            }));
        }
        Ok(registry)
    }

    /// Like [`connect`](Self::connect) but degrades to an empty registry.
    pub async fn load(config: &McpConfig) -> ToolRegistry {
        if !config.enabled {
            tracing::info!("MCP tool server disabled");
            return ToolRegistry::new();
        }
        match Self::connect(config).await {
            Ok(registry) => {
                tracing::info!(
                    server = %config.server_name,
                    apps = %config.apps,
                    count = registry.len(),
                    "Loaded MCP tools"
                );
                registry
            }
            Err(e) => {
                tracing::warn!(server = %config.server_name, "MCP tools unavailable: {}", e);
                ToolRegistry::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_is_surfaced() {
        let err = into_result(json!({"id": "1", "error": {"code": -1, "message": "nope"}}))
            .expect_err("error");
        assert!(matches!(err, McpError::Server(m) if m == "nope"));
    }

    #[test]
    fn tools_page_parses_camel_case() {
        let page: ToolsPage = serde_json::from_value(json!({
            "tools": [{
                "name": "REDDIT__GET_SUBREDDIT_POSTS",
                "description": "Get posts",
                "inputSchema": {"type": "object", "properties": {"subreddit": {"type": "string"}}}
            }, {"name": "BARE"}],
            "nextCursor": "abc"
        }))
        .expect("parse");
        assert_eq!(page.tools.len(), 2);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
        assert_eq!(page.tools[1].input_schema, json!({"type": "object"}));
    }

    #[test]
    fn call_result_joins_text_content() {
        let out = render_call_result(&json!({
            "content": [{"type": "text", "text": "one"}, {"type": "text", "text": "two"}]
        }))
        .expect("ok");
        assert_eq!(out, "one\ntwo");

        let err = render_call_result(&json!({
            "content": [{"type": "text", "text": "bad account"}],
            "isError": true
        }))
        .expect_err("tool error");
        assert!(err.to_string().contains("bad account"));
    }

    #[tokio::test]
    async fn requests_after_server_exit_fail_fast() {
        let client = StdioClient::spawn(
            "exited",
            "sh",
            &["-c".to_string(), "exit 0".to_string()],
            std::env::vars_os().collect(),
        )
        .expect("spawn sh");
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        for _ in 0..2 {
            let result = tokio::time::timeout(
                std::time::Duration::from_secs(3),
                client.request("tools/call", json!({})),
            )
            .await
            .expect("request should not hang");
            assert!(matches!(result, Err(McpError::Disconnected)));
        }
    }

    #[tokio::test]
    async fn missing_binary_degrades_to_empty_registry() {
        let config = McpConfig {
            command: "definitely-not-a-real-mcp-launcher".to_string(),
            ..McpConfig::default()
        };
        assert!(matches!(
            McpToolSource::connect(&config).await,
            Err(McpError::Spawn { .. })
        ));
        assert!(McpToolSource::load(&config).await.is_empty());
    }
}
