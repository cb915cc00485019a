//! # Reddit Scout
//!
//! A small HTTP backend that digests subreddits with an LLM agent.
//!
//! This library provides:
//! - An HTTP API (`/search_reddit` plus a few fixed routes)
//! - A plan-then-execute engine that drives tools with Gemini
//! - A tool registry merging MCP server tools with built-in defaults
//!
//! ## Flow
//!
//! 1. The subreddit name is substituted into a five-step digest task
//! 2. The engine plans the task over the tool registry
//! 3. The engine runs the plan step by step
//! 4. The plan is rendered as Markdown and returned with the final output

pub mod api;
pub mod config;
pub mod engine;
pub mod llm;
pub mod reddit;
pub mod tools;

pub use config::Config;
