//! Example GitHub API calls ("tools") built on the `github_api` client.
//!
//! # Architecture
//!
//! ```text
//! GET /tools/:name
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Registry                           │
//! │  - Ordered list of built-in tools        │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Tool (implements trait)            │
//! │  - GET through GitHubClient              │
//! │  - Optional view / embedded asset        │
//! └─────────────────────────────────────────┘
//!          ↓
//!     GitHub REST API
//! ```
//!
//! # Writing a Tool
//!
//! ```no_run
//! use anyhow::Result;
//! use async_trait::async_trait;
//! use github_api::GitHubClient;
//! use github_api_tools::{get_json, Tool, ToolOutput};
//!
//! struct RateLimitTool;
//!
//! #[async_trait]
//! impl Tool for RateLimitTool {
//!     fn name(&self) -> &str {
//!         "rate_limit"
//!     }
//!
//!     fn title(&self) -> &str {
//!         "Rate Limit"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Makes a call to \"/rate_limit\"."
//!     }
//!
//!     async fn run(&self, client: &GitHubClient) -> Result<Option<ToolOutput>> {
//!         get_json(client, "rate_limit", &[]).await
//!     }
//! }
//! ```

pub mod api;
pub mod builtin;
pub mod registry;
mod tool;

pub use tool::{get_json, EmbeddedAsset, Tool, ToolOutput};
