use anyhow::{Context, Result};
use async_trait::async_trait;
use github_api::client::Pagination;
use github_api::{GitHubClient, Method, RequestOverrides};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Client-side script a tool page needs, with the JSON it reads.
///
/// The script sees `data` as a global named `variable`.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EmbeddedAsset {
    pub script: String,
    pub variable: String,
    pub data: Value,
}

/// Decoded body of a successful call, with its `Link` pagination.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutput {
    pub data: Value,
    pub pagination: Pagination,
}

/// Example operation listed on the tools page.
///
/// Tools are stateless: the client (and the credentials it carries) is
/// built per request and handed to `run`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier, used in the `/tools/:name` route.
    fn name(&self) -> &str;

    fn title(&self) -> &str;

    fn description(&self) -> &str;

    /// Calls GitHub. `Ok(None)` means the result could not be retrieved.
    async fn run(&self, client: &GitHubClient) -> Result<Option<ToolOutput>>;

    /// Display projection of a result. Tools without one show it raw.
    fn view(&self, _result: &Value) -> Option<Value> {
        None
    }

    /// Hook run before the tool page is rendered.
    fn on_render(&self, _result: &Value) -> Option<EmbeddedAsset> {
        None
    }
}

/// GETs `endpoint` and decodes the body of a 200 response.
///
/// Any other status, or a transport failure, yields `None`.
pub async fn get_json(
    client: &GitHubClient,
    endpoint: &str,
    parameters: &[(&str, &str)],
) -> Result<Option<ToolOutput>> {
    let overrides = parameters
        .iter()
        .fold(RequestOverrides::default(), |overrides, (key, value)| {
            overrides.with_parameter(*key, *value)
        });

    let response = match client.request(Method::Get, endpoint, &overrides).await {
        Ok(response) => response,
        Err(e) => {
            warn!(endpoint = %endpoint, error = %e, "Tool request failed");
            return Ok(None);
        }
    };

    if !response.is_success() {
        warn!(
            endpoint = %endpoint,
            status = response.status.as_u16(),
            "Tool request returned non-200 status"
        );
        return Ok(None);
    }

    let data = response
        .json()
        .with_context(|| format!("Failed to decode response from {}", endpoint))?;
    Ok(Some(ToolOutput {
        data,
        pagination: response.pagination,
    }))
}
