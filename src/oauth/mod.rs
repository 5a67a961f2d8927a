//! OAuth 2.0 web application flow.
//!
//! 1. User opens `/settings/authorize` and is redirected to GitHub
//! 2. User authorizes the app on github.com
//! 3. GitHub redirects back to the settings page with `code` and `state`
//! 4. State is verified, code is exchanged for an access token
//! 5. Token is persisted; user lands on the clean settings URL
//!
//! Failures never surface as errors. The message is persisted and the user
//! is redirected to the settings page with `got_error=1`, where the next
//! rendering load shows it once.
//!
//! See https://developer.github.com/v3/oauth/#web-application-flow

mod state_manager;

pub use state_manager::{run_state_cleanup, StateManager};

use crate::client::{GitHubClient, Method, RequestOverrides, TOKEN_ENDPOINT};
use crate::config::GitHubApiConfig;
use crate::settings::{keys, Settings};
use anyhow::Result;
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Query string flag marking a redirect caused by a failure.
pub const ERROR_FLAG: &str = "got_error";

pub const STATE_MISMATCH_MESSAGE: &str = "Failed to verify state";

/// Query parameters the settings page may receive.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by GitHub when the user denies access.
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub got_error: Option<String>,
}

/// Result of a settings page load. A redirect ends the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Render { notice: Option<String> },
    Redirect { location: String },
}

/// Token endpoint body. GitHub answers 200 even for a rejected code, with
/// `error` fields instead of `access_token`.
#[derive(Deserialize, Debug)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Drives the authorization code exchange triggered by settings page loads.
#[derive(Clone)]
pub struct Authorizer {
    config: Arc<GitHubApiConfig>,
    settings: Settings,
    state_manager: StateManager,
}

impl Authorizer {
    pub fn new(config: Arc<GitHubApiConfig>, settings: Settings, state_manager: StateManager) -> Self {
        Self {
            config,
            settings,
            state_manager,
        }
    }

    /// Settings page URL, without any query string.
    pub fn redirect_uri(&self) -> &str {
        &self.config.oauth.redirect_uri
    }

    /// Client with the currently stored credentials.
    pub fn client(&self) -> Result<GitHubClient> {
        GitHubClient::from_settings(&self.config, &self.settings)
    }

    /// Issues a fresh state and returns the GitHub authorization URL.
    pub fn authorize_url(&self) -> Result<String> {
        let state = self.state_manager.create_state();
        Ok(self.client()?.authorize_url(&state))
    }

    pub fn verify_state(&self, state: &str) -> bool {
        self.state_manager.validate_and_consume(state)
    }

    /// Handles a settings page load.
    ///
    /// Store failures are the only errors; every OAuth failure becomes a
    /// redirect carrying the error flag.
    pub async fn on_settings_page_load(&self, query: &CallbackQuery) -> Result<PageOutcome> {
        if let (Some(code), Some(state)) = (&query.code, &query.state) {
            if !self.verify_state(state) {
                warn!("OAuth state verification failed");
                return self.redirect_on_error(self.redirect_uri(), STATE_MISMATCH_MESSAGE);
            }
            return self.exchange_code(code).await;
        }

        if let Some(error) = &query.error {
            let description = query.error_description.as_deref().unwrap_or(error);
            warn!(error = %error, "OAuth authorization denied");
            let message = format!("Authorization failed: {}", description);
            return self.redirect_on_error(self.redirect_uri(), &message);
        }

        Ok(PageOutcome::Render {
            notice: self.take_pending_notice(query)?,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<PageOutcome> {
        debug!("Exchanging authorization code for token");

        let client = self.client()?;
        let overrides = RequestOverrides::default().with_code(code);
        let response = client.request(Method::Post, TOKEN_ENDPOINT, &overrides).await;

        let message = match response {
            Ok(resp) if resp.is_success() => match resp.json::<TokenResponse>() {
                Ok(TokenResponse {
                    access_token: Some(token),
                    ..
                }) if !token.is_empty() => {
                    self.settings.set(keys::ACCESS_TOKEN, &token)?;
                    info!("OAuth flow completed successfully");
                    return Ok(PageOutcome::Redirect {
                        location: self.redirect_uri().to_string(),
                    });
                }
                Ok(TokenResponse {
                    error,
                    error_description,
                    ..
                }) => {
                    let reason = error_description
                        .or(error)
                        .unwrap_or_else(|| "no access token in response".to_string());
                    format!("Token exchange failed: {}", reason)
                }
                Err(e) => format!("Failed to parse token response: {}", e),
            },
            Ok(resp) => format!("Status code {}: {}", resp.status.as_u16(), resp.body),
            Err(e) => format!("HTTP transport error: {}", e),
        };

        warn!(reason = %message, "Token exchange failed");
        self.settings.delete(keys::ACCESS_TOKEN)?;
        self.redirect_on_error(self.redirect_uri(), &message)
    }

    /// Stores `message` and returns a redirect to `location` with the error
    /// flag appended.
    pub fn redirect_on_error(&self, location: &str, message: &str) -> Result<PageOutcome> {
        self.settings.set(keys::ERROR_MESSAGE, message)?;
        Ok(PageOutcome::Redirect {
            location: with_error_flag(location),
        })
    }

    /// Pending error message, removed once returned. Only shown when the
    /// URL carries the error flag.
    fn take_pending_notice(&self, query: &CallbackQuery) -> Result<Option<String>> {
        if query.got_error.is_none() {
            return Ok(None);
        }
        self.settings.take(keys::ERROR_MESSAGE)
    }
}

/// Appends `got_error=1` to `location`.
pub fn with_error_flag(location: &str) -> String {
    match Url::parse(location) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(ERROR_FLAG, "1");
            url.to_string()
        }
        Err(_) => {
            let separator = if location.contains('?') { '&' } else { '?' };
            format!("{}{}{}=1", location, separator, ERROR_FLAG)
        }
    }
}
