//! Configuration management for Reddit Scout.
//!
//! Configuration is read from the process environment after loading an optional
//! `.env` file:
//! - `GOOGLE_API_KEY` - Optional. Gemini API key. Without it every plan request fails.
//! - `LLM_PROVIDER` - Optional. Only `google` is supported. Defaults to `google`.
//! - `DEFAULT_MODEL` - Optional. Defaults to `gemini-2.5-flash-preview-05-20`.
//! - `ACI_API_KEY` - Optional. Passed to the MCP tool server. A warning is logged if missing.
//! - `MCP_ENABLED` - Optional. Spawn the MCP tool server. Defaults to `true`.
//! - `MCP_COMMAND` - Optional. Launcher for the MCP server. Defaults to `uvx`.
//! - `MCP_SERVER_NAME` - Optional. Defaults to `aci-apps-stdio`.
//! - `MCP_APPS` - Optional. App filter for the MCP server. Defaults to `REDDIT`.
//! - `MCP_LINKED_ACCOUNT_OWNER_ID` - Optional. Defaults to `aci_portia`.
//! - `HOST` - Optional. Server host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `CORS_ORIGIN` - Optional. Allowed browser origin. Defaults to `http://localhost:3000`.
//! - `REDDIT_POST_COUNT` - Optional. Posts requested per digest. Defaults to `5`.
//! - `STRICT_ERRORS` - Optional. Report engine failures as HTTP 502. Defaults to `true`.

use std::ffi::OsString;

use thiserror::Error;

use crate::reddit::TaskTemplate;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    GoogleGenerativeAi,
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" | "gemini" | "google_generative_ai" => Ok(Self::GoogleGenerativeAi),
            other => Err(format!("unsupported provider: {}", other)),
        }
    }
}

/// LLM provider settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: LlmProvider,

    /// Provider API key (None = every completion fails)
    pub api_key: Option<String>,

    /// Model used for planning and for the `llm_tool`
    pub default_model: String,
}

/// How the remote MCP tool server is launched.
#[derive(Debug, Clone)]
pub struct McpConfig {
    pub enabled: bool,
    pub server_name: String,
    pub command: String,
    /// App domain filter, e.g. `REDDIT`
    pub apps: String,
    pub linked_account_owner_id: String,
    /// ACI credential forwarded to the child process
    pub api_key: Option<String>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server_name: "aci-apps-stdio".to_string(),
            command: "uvx".to_string(),
            apps: "REDDIT".to_string(),
            linked_account_owner_id: "aci_portia".to_string(),
            api_key: None,
        }
    }
}

impl McpConfig {
    /// Arguments passed to `command`.
    pub fn args(&self) -> Vec<String> {
        vec![
            "aci-mcp".to_string(),
            "apps-server".to_string(),
            format!("--apps={}", self.apps),
            format!("--linked-account-owner-id={}", self.linked_account_owner_id),
        ]
    }

    /// Child process environment: the parent environment plus the ACI key.
    pub fn env(&self) -> Vec<(OsString, OsString)> {
        let mut env: Vec<(OsString, OsString)> = std::env::vars_os()
            .filter(|(k, _)| k != "ACI_API_KEY")
            .collect();
        if let Some(key) = &self.api_key {
            env.push(("ACI_API_KEY".into(), key.into()));
        }
        env
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,

    pub mcp: McpConfig,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Single origin allowed by CORS
    pub cors_origin: String,

    /// Prompt template for `/search_reddit`
    pub task: TaskTemplate,

    /// Report engine failures with a 502 instead of a 200
    pub strict_errors: bool,
}

impl Config {
    /// Load configuration from `.env` and environment variables.
    ///
    /// Missing credentials only produce warnings; malformed values are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Failed to load .env file: {}", e);
            }
        }

        let provider = std::env::var("LLM_PROVIDER")
            .ok()
            .map(|v| {
                v.parse::<LlmProvider>()
                    .map_err(|e| ConfigError::InvalidValue("LLM_PROVIDER".to_string(), e))
            })
            .transpose()?
            .unwrap_or(LlmProvider::GoogleGenerativeAi);

        let api_key = non_empty_var("GOOGLE_API_KEY");
        if api_key.is_none() {
            tracing::warn!("GOOGLE_API_KEY is not set; planning requests will fail");
        }

        let default_model = std::env::var("DEFAULT_MODEL")
            .unwrap_or_else(|_| "gemini-2.5-flash-preview-05-20".to_string());

        let mcp_api_key = non_empty_var("ACI_API_KEY");
        if mcp_api_key.is_none() {
            tracing::warn!("ACI_API_KEY was not found in the environment; the aci-mcp tools might fail");
        }

        let defaults = McpConfig::default();
        let mcp = McpConfig {
            enabled: bool_var("MCP_ENABLED")?.unwrap_or(true),
            server_name: std::env::var("MCP_SERVER_NAME").unwrap_or(defaults.server_name),
            command: std::env::var("MCP_COMMAND").unwrap_or(defaults.command),
            apps: std::env::var("MCP_APPS").unwrap_or(defaults.apps),
            linked_account_owner_id: std::env::var("MCP_LINKED_ACCOUNT_OWNER_ID")
                .unwrap_or(defaults.linked_account_owner_id),
            api_key: mcp_api_key,
        };

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let post_count: usize = std::env::var("REDDIT_POST_COUNT")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("REDDIT_POST_COUNT".to_string(), format!("{}", e))
            })?;
        if post_count == 0 {
            return Err(ConfigError::InvalidValue(
                "REDDIT_POST_COUNT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let strict_errors = bool_var("STRICT_ERRORS")?.unwrap_or(true);

        Ok(Self {
            provider: ProviderConfig {
                provider,
                api_key,
                default_model,
            },
            mcp,
            host,
            port,
            cors_origin,
            task: TaskTemplate::with_post_count(post_count),
            strict_errors,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: Option<String>, default_model: String) -> Self {
        Self {
            provider: ProviderConfig {
                provider: LlmProvider::GoogleGenerativeAi,
                api_key,
                default_model,
            },
            mcp: McpConfig {
                enabled: false,
                ..McpConfig::default()
            },
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origin: "http://localhost:3000".to_string(),
            task: TaskTemplate::default(),
            strict_errors: true,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn bool_var(name: &str) -> Result<Option<bool>, ConfigError> {
    std::env::var(name)
        .ok()
        .map(|v| parse_bool(&v).map_err(|e| ConfigError::InvalidValue(name.to_string(), e)))
        .transpose()
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("Yes"), Ok(true));
        assert_eq!(parse_bool(" off "), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn provider_parses_google_aliases() {
        assert_eq!(
            "gemini".parse::<LlmProvider>(),
            Ok(LlmProvider::GoogleGenerativeAi)
        );
        assert!("openai".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn mcp_args_carry_app_filter_and_owner() {
        let mcp = McpConfig::default();
        assert_eq!(
            mcp.args(),
            vec![
                "aci-mcp",
                "apps-server",
                "--apps=REDDIT",
                "--linked-account-owner-id=aci_portia"
            ]
        );
    }

    #[test]
    fn mcp_env_forwards_key_once() {
        let mcp = McpConfig {
            api_key: Some("secret".to_string()),
            ..McpConfig::default()
        };
        let keys: Vec<_> = mcp
            .env()
            .into_iter()
            .filter(|(k, _)| k == "ACI_API_KEY")
            .collect();
        assert_eq!(
            keys,
            vec![(OsString::from("ACI_API_KEY"), OsString::from("secret"))]
        );
    }

    #[test]
    fn test_config_disables_mcp() {
        let config = Config::new(None, "gemini-test".to_string());
        assert!(!config.mcp.enabled);
        assert!(config.strict_errors);
        assert_eq!(config.task.post_count, 5);
    }
}
