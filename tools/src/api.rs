//! Tools page HTTP API.
//!
//! Exposes two routes:
//! - `GET /tools`: list tools
//! - `GET /tools/:name`: run a tool and return its result, view and asset

use crate::registry::{find_tool, get_all_tools};
use crate::EmbeddedAsset;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use github_api::{GitHubApiConfig, GitHubClient, Settings};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Shown in place of a result the tool could not retrieve.
pub const UNAVAILABLE_MESSAGE: &str = "Unable to retrieve the result";

/// Shared state for the tools API handlers.
#[derive(Clone)]
pub struct ToolsAppState {
    pub config: Arc<GitHubApiConfig>,
    pub settings: Settings,
}

/// A single entry in the `GET /tools` response.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub title: String,
    pub description: String,
}

/// Response for `GET /tools/:name`.
#[derive(Serialize)]
pub struct ToolPage {
    pub tool: ToolInfo,
    pub result: Option<Value>,
    pub view: Option<Value>,
    pub asset: Option<EmbeddedAsset>,
    /// `{rel: page, "<rel>_url": url}` from the response `Link` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ---------------------------------------------------------------------------
// HTTP handlers
// ---------------------------------------------------------------------------

async fn list_tools() -> Json<Vec<ToolInfo>> {
    let tools = get_all_tools()
        .iter()
        .map(|tool| ToolInfo {
            name: tool.name().to_string(),
            title: tool.title().to_string(),
            description: tool.description().to_string(),
        })
        .collect();
    Json(tools)
}

async fn run_tool(
    State(state): State<Arc<ToolsAppState>>,
    Path(name): Path<String>,
) -> Result<Json<ToolPage>, AppError> {
    let tool = find_tool(&name)
        .ok_or_else(|| AppError::NotFound(format!("Tool '{}' not found", name)))?;

    debug!(tool = %name, "Running tool");

    // Credentials may change between requests; build a fresh client.
    let client = GitHubClient::from_settings(&state.config, &state.settings)?;
    let output = tool.run(&client).await?;

    let asset = output.as_ref().and_then(|o| tool.on_render(&o.data));
    let view = output.as_ref().and_then(|o| tool.view(&o.data));
    let message = output.is_none().then(|| UNAVAILABLE_MESSAGE.to_string());

    info!(tool = %name, retrieved = output.is_some(), "Tool finished");

    let (result, pagination) = match output {
        Some(output) => {
            let pagination = (!output.pagination.is_empty()).then(|| output.pagination.to_map());
            (Some(output.data), pagination)
        }
        None => (None, None),
    };

    Ok(Json(ToolPage {
        tool: ToolInfo {
            name: tool.name().to_string(),
            title: tool.title().to_string(),
            description: tool.description().to_string(),
        },
        result,
        view,
        asset,
        pagination,
        message,
    }))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

enum AppError {
    NotFound(String),
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Tool request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(ErrorResponse { error: msg })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn create_tools_router(state: ToolsAppState) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/:name", get(run_tool))
        .with_state(Arc::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_tools() {
        let Json(tools) = list_tools().await;
        assert_eq!(tools.len(), 5);
        assert_eq!(tools[0].name, "get_user_info");
        assert_eq!(tools[0].title, "User Information");
        assert_eq!(tools[4].name, "weekly_commit_count");
    }
}
