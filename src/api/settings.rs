//! Settings page endpoints.
//!
//! `GET /settings` is also the OAuth redirect URI: every load runs the
//! authorizer first, and a redirect outcome ends the request.

use super::AppError;
use crate::client::GitHubClient;
use crate::oauth::{Authorizer, CallbackQuery, PageOutcome};
use crate::rate_limit::{RateLimitReader, RateLimitResource};
use crate::settings::{keys, sanitize_credential, Settings};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const METHOD_TOKEN: &str = "OAuth2 Token";
pub const METHOD_KEY_SECRET: &str = "OAuth2 Key/Secret";
pub const METHOD_UNAUTHENTICATED: &str = "Unauthenticated";

/// Route that issues a state and redirects to GitHub.
pub const AUTHORIZE_ROUTE: &str = "/settings/authorize";

/// Shared application state for the settings page
#[derive(Clone)]
pub struct SettingsAppState {
    pub settings: Settings,
    pub authorizer: Authorizer,
}

/// Account the stored token belongs to
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AuthenticatedUser {
    pub login: String,
    pub html_url: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ResourceStatus {
    pub limit: u64,
    pub remaining: u64,
    pub reset: String,
}

impl From<RateLimitResource> for ResourceStatus {
    fn from(resource: RateLimitResource) -> Self {
        Self {
            limit: resource.limit,
            remaining: resource.remaining,
            reset: resource.reset_formatted(),
        }
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct RateLimitStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core: Option<ResourceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<ResourceStatus>,
}

/// Response for GET /settings
#[derive(Serialize, Debug)]
pub struct SettingsPage {
    /// Pending OAuth error first, then any rate-limit failure.
    pub notices: Vec<String>,
    pub authorized: bool,
    pub authentication_method: &'static str,
    pub authenticated_user: Option<AuthenticatedUser>,
    pub rate_limit: Option<RateLimitStatus>,
    /// Local route starting the OAuth flow, when a client id is configured.
    pub authorize_url: Option<&'static str>,
}

/// Request body for POST /settings
#[derive(Deserialize)]
pub struct SettingsForm {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Response for POST /settings
#[derive(Serialize)]
pub struct UpdateSettingsResponse {
    pub success: bool,
    pub client_id_set: bool,
    pub client_secret_set: bool,
}

/// Create settings page router
pub fn create_settings_router(state: SettingsAppState) -> Router {
    Router::new()
        .route("/settings", get(settings_page).post(update_settings))
        .route(AUTHORIZE_ROUTE, get(authorize))
        .with_state(Arc::new(state))
}

/// Label for the credentials requests are sent with.
pub fn authentication_method(settings: &Settings) -> anyhow::Result<&'static str> {
    if settings.get(keys::ACCESS_TOKEN)?.is_some() {
        return Ok(METHOD_TOKEN);
    }
    let has_client = settings.get(keys::CLIENT_ID)?.is_some()
        && settings.get(keys::CLIENT_SECRET)?.is_some();
    Ok(if has_client {
        METHOD_KEY_SECRET
    } else {
        METHOD_UNAUTHENTICATED
    })
}

/// GET /settings
async fn settings_page(
    State(state): State<Arc<SettingsAppState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let mut notices: Vec<String> = match state.authorizer.on_settings_page_load(&query).await? {
        PageOutcome::Redirect { location } => {
            debug!(location = %location, "Settings load redirected");
            return Ok(Redirect::to(&location).into_response());
        }
        PageOutcome::Render { notice } => notice.into_iter().collect(),
    };

    let client = state.authorizer.client()?;
    let authorized = !client.settings().access_token.is_empty();

    let authenticated_user = if authorized {
        fetch_authenticated_user(&client).await
    } else {
        None
    };

    let rate_limit = match RateLimitReader::new(&client).get().await {
        Ok(limits) => Some(RateLimitStatus {
            core: limits.core().map(ResourceStatus::from),
            search: limits.search().map(ResourceStatus::from),
        }),
        Err(e) => {
            notices.push(e.to_string());
            None
        }
    };

    // States are only issued by the authorize route, one per attempt.
    let authorize_url = (!client.settings().client_id.is_empty()).then_some(AUTHORIZE_ROUTE);

    Ok(Json(SettingsPage {
        notices,
        authorized,
        authentication_method: authentication_method(&state.settings)?,
        authenticated_user,
        rate_limit,
        authorize_url,
    })
    .into_response())
}

async fn fetch_authenticated_user(client: &GitHubClient) -> Option<AuthenticatedUser> {
    match client.get("user").await {
        Ok(response) if response.is_success() => response.json().ok(),
        Ok(response) => {
            warn!(status = response.status.as_u16(), "Failed to load authenticated user");
            None
        }
        Err(e) => {
            warn!(error = %e, "Failed to load authenticated user");
            None
        }
    }
}

/// POST /settings
///
/// Values outside `[0-9A-Za-z]+` are cleared.
async fn update_settings(
    State(state): State<Arc<SettingsAppState>>,
    Form(form): Form<SettingsForm>,
) -> Result<Json<UpdateSettingsResponse>, AppError> {
    if form.client_id.is_none() && form.client_secret.is_none() {
        return Err(AppError::BadRequest(
            "Expected client_id or client_secret".to_string(),
        ));
    }

    let mut saved = [false; 2];
    let fields = [
        (keys::CLIENT_ID, &form.client_id),
        (keys::CLIENT_SECRET, &form.client_secret),
    ];
    for (slot, (key, value)) in saved.iter_mut().zip(fields) {
        let Some(value) = value else { continue };
        let value = sanitize_credential(value);
        if value.is_empty() {
            state.settings.delete(key)?;
        } else {
            state.settings.set(key, &value)?;
            *slot = true;
        }
    }

    info!(
        client_id_set = saved[0],
        client_secret_set = saved[1],
        "OAuth app credentials updated"
    );

    Ok(Json(UpdateSettingsResponse {
        success: true,
        client_id_set: saved[0],
        client_secret_set: saved[1],
    }))
}

/// GET /settings/authorize
async fn authorize(State(state): State<Arc<SettingsAppState>>) -> Result<Redirect, AppError> {
    let url = state.authorizer.authorize_url()?;
    info!("Redirecting to GitHub authorization page");
    Ok(Redirect::temporary(&url))
}
