//! GitHub rate-limit status.
//!
//! Reads `GET /rate_limit`, which does not itself count against the quota.
//! See https://developer.github.com/v3/rate_limit/

use crate::client::{ClientError, GitHubClient};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub const RATE_LIMIT_ENDPOINT: &str = "rate_limit";

/// Message used when a failed response carries no `message` field.
pub const UNEXPECTED_RESULT_MESSAGE: &str =
    "Unexpected result when tried to call \"/rate_limit\" endpoint.";

/// Format used to display reset timestamps.
pub const RESET_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error(transparent)]
    Transport(#[from] ClientError),

    #[error("{message}")]
    Api { status: u16, message: String },
}

/// One quota bucket (`core`, `search`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitResource {
    pub limit: u64,
    pub remaining: u64,
    /// Epoch seconds at which the quota resets.
    pub reset: i64,
}

impl RateLimitResource {
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.reset, 0).single()
    }

    /// Reset time rendered as `YYYY-MM-DD HH:MM:SS` (UTC).
    pub fn reset_formatted(&self) -> String {
        self.reset_at()
            .map(|at| at.format(RESET_FORMAT).to_string())
            .unwrap_or_default()
    }
}

/// The `resources` object of the rate-limit response, keyed by resource
/// name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RateLimits(Map<String, Value>);

impl RateLimits {
    pub fn resource(&self, name: &str) -> Option<RateLimitResource> {
        self.0
            .get(name)
            .and_then(|value| RateLimitResource::deserialize(value).ok())
    }

    pub fn core(&self) -> Option<RateLimitResource> {
        self.resource("core")
    }

    pub fn search(&self) -> Option<RateLimitResource> {
        self.resource("search")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Value> for RateLimits {
    /// Picks `resources` when present, otherwise takes the object as-is.
    fn from(value: Value) -> Self {
        let value = match value {
            Value::Object(mut object) => match object.remove("resources") {
                Some(resources) => resources,
                None => Value::Object(object),
            },
            other => other,
        };
        match value {
            Value::Object(map) => RateLimits(map),
            _ => RateLimits::default(),
        }
    }
}

/// Reads the rate-limit status with the client's credentials.
pub struct RateLimitReader<'a> {
    client: &'a GitHubClient,
}

impl<'a> RateLimitReader<'a> {
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<RateLimits, RateLimitError> {
        let response = self.client.get(RATE_LIMIT_ENDPOINT).await?;
        let decoded: Option<Value> = serde_json::from_str(&response.body).ok();

        if response.is_success() {
            debug!("Rate limit status received");
            return Ok(decoded.map(RateLimits::from).unwrap_or_default());
        }

        let message = decoded
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or(UNEXPECTED_RESULT_MESSAGE)
            .to_string();

        warn!(status = response.status.as_u16(), message = %message, "Rate limit request failed");
        Err(RateLimitError::Api {
            status: response.status.as_u16(),
            message,
        })
    }
}
