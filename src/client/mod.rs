//! GitHub API v3 client.
//!
//! Every call goes through [`GitHubClient::request`], which merges the
//! client's default [`ClientSettings`] with per-call [`RequestOverrides`],
//! picks the host (OAuth vs REST), selects the parameters to send and
//! attaches the parsed `Link` pagination to the response.
//!
//! See https://developer.github.com/v3/

pub mod pagination;

pub use pagination::{parse_link_header, PageLink, Pagination};

use crate::config::GitHubApiConfig;
use crate::settings::{keys, Settings};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, LINK, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Token exchange endpoint, relative to the OAuth host.
pub const TOKEN_ENDPOINT: &str = "/oauth/access_token";

/// Authorization endpoint, relative to the OAuth host.
pub const AUTHORIZE_ENDPOINT: &str = "/oauth/authorize";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid request header {0}")]
    InvalidHeader(String),

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// HTTP verbs the client issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Parses a verb case-insensitively. Unrecognized verbs fall back to GET.
    pub fn parse(method: &str) -> Self {
        match method.trim().to_ascii_uppercase().as_str() {
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            _ => Method::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default settings every request starts from.
#[derive(Clone, Debug, Default)]
pub struct ClientSettings {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub redirect_uri: String,
    /// Received after GitHub redirects to `redirect_uri`.
    pub code: String,
    pub state: String,
    pub scope: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub parameters: BTreeMap<String, String>,
}

impl ClientSettings {
    /// Builds the defaults from configuration and the stored credentials.
    pub fn load(config: &GitHubApiConfig, settings: &Settings) -> anyhow::Result<Self> {
        let mut headers = BTreeMap::new();
        headers.insert(USER_AGENT.to_string(), config.app.user_agent());
        headers.insert(ACCEPT.to_string(), "application/json".to_string());

        Ok(Self {
            client_id: settings.get_or_empty(keys::CLIENT_ID)?,
            client_secret: settings.get_or_empty(keys::CLIENT_SECRET)?,
            access_token: settings.get_or_empty(keys::ACCESS_TOKEN)?,
            redirect_uri: config.oauth.redirect_uri.clone(),
            code: String::new(),
            state: String::new(),
            scope: config.oauth.scope.clone(),
            headers,
            body: String::new(),
            parameters: BTreeMap::new(),
        })
    }

    /// Returns a copy with `overrides` applied. Override headers and
    /// parameters win over the defaults on key collision.
    pub fn merged(&self, overrides: &RequestOverrides) -> Self {
        let pick = |value: &Option<String>, default: &String| {
            value.clone().unwrap_or_else(|| default.clone())
        };

        // Header names are case-insensitive; keep them lowercase so an
        // override replaces the default instead of sitting next to it.
        let headers: BTreeMap<String, String> = self
            .headers
            .iter()
            .chain(overrides.headers.iter())
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        let mut parameters = self.parameters.clone();
        parameters.extend(overrides.parameters.clone());

        Self {
            client_id: pick(&overrides.client_id, &self.client_id),
            client_secret: pick(&overrides.client_secret, &self.client_secret),
            access_token: pick(&overrides.access_token, &self.access_token),
            redirect_uri: pick(&overrides.redirect_uri, &self.redirect_uri),
            code: pick(&overrides.code, &self.code),
            state: pick(&overrides.state, &self.state),
            scope: pick(&overrides.scope, &self.scope),
            headers,
            body: pick(&overrides.body, &self.body),
            parameters,
        }
    }

    /// Settings sent as request parameters on non-OAuth endpoints. `code`,
    /// `state`, `scope`, `redirect_uri`, `headers`, `body` and `parameters`
    /// never are.
    fn credential_parameters(&self) -> [(&'static str, &str); 3] {
        [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("access_token", self.access_token.as_str()),
        ]
    }
}

/// Per-call overrides of [`ClientSettings`].
#[derive(Clone, Debug, Default)]
pub struct RequestOverrides {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub redirect_uri: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
    pub scope: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub parameters: BTreeMap<String, String>,
}

impl RequestOverrides {
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Fully resolved request, before it hits the network.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    pub method: Method,
    /// Normalized endpoint path (always one leading `/`).
    pub endpoint: String,
    /// Target URL including any query string.
    pub url: Url,
    /// Outgoing parameter set, whether sent as query or form body.
    pub parameters: BTreeMap<String, String>,
    /// Form body (POST only).
    pub form: Option<BTreeMap<String, String>>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Raw response. Non-2xx statuses are returned as values, not errors.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
    pub pagination: Pagination,
}

impl ApiResponse {
    /// GitHub answers 200 for every successful read this crate issues.
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Normalizes an endpoint to exactly one leading slash.
pub fn normalize_endpoint(endpoint: &str) -> String {
    format!("/{}", endpoint.trim().trim_start_matches('/'))
}

/// HTTP client for the GitHub REST and OAuth endpoints.
#[derive(Clone)]
pub struct GitHubClient {
    http_client: reqwest::Client,
    settings: ClientSettings,
    api_base_url: String,
    auth_base_url: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubApiConfig, settings: ClientSettings) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder().build()?;
        Ok(Self {
            http_client,
            settings,
            api_base_url: config.github.api_base_url.trim_end_matches('/').to_string(),
            auth_base_url: config.github.auth_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client with credentials read from the settings store.
    pub fn from_settings(config: &GitHubApiConfig, settings: &Settings) -> anyhow::Result<Self> {
        let client_settings = ClientSettings::load(config, settings)?;
        Ok(Self::new(config, client_settings)?)
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Builds the URL the user is sent to in order to authorize the app.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}{}?client_id={}&redirect_uri={}&scope={}&state={}",
            self.auth_base_url,
            AUTHORIZE_ENDPOINT,
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_uri),
            urlencoding::encode(&self.settings.scope),
            urlencoding::encode(state)
        )
    }

    /// Resolves host, parameters, headers and body for a call.
    pub fn prepare(
        &self,
        method: Method,
        endpoint: &str,
        overrides: &RequestOverrides,
    ) -> Result<PreparedRequest, ClientError> {
        let settings = self.settings.merged(overrides);
        let endpoint = normalize_endpoint(endpoint);

        let base_url = if endpoint.contains("oauth") {
            &self.auth_base_url
        } else {
            &self.api_base_url
        };
        let raw_url = format!("{}{}", base_url, endpoint);
        let mut url = Url::parse(&raw_url).map_err(|e| ClientError::InvalidUrl {
            url: raw_url.clone(),
            reason: e.to_string(),
        })?;

        let mut parameters = if endpoint == TOKEN_ENDPOINT {
            BTreeMap::from([
                ("client_id".to_string(), settings.client_id.clone()),
                ("client_secret".to_string(), settings.client_secret.clone()),
                ("code".to_string(), settings.code.clone()),
                ("redirect_uri".to_string(), settings.redirect_uri.clone()),
            ])
        } else {
            // Caller-supplied parameters win over configured settings.
            let mut params = settings.parameters.clone();
            for (key, value) in settings.credential_parameters() {
                params
                    .entry(key.to_string())
                    .or_insert_with(|| value.to_string());
            }
            params
        };

        let has_token = parameters
            .get("access_token")
            .is_some_and(|token| !token.is_empty());
        if has_token {
            parameters.remove("client_id");
            parameters.remove("client_secret");
        } else {
            parameters.remove("access_token");
        }
        for key in ["client_id", "client_secret"] {
            if parameters.get(key).is_some_and(|v| v.is_empty()) {
                parameters.remove(key);
            }
        }

        let (form, body) = match method {
            Method::Post => (Some(parameters.clone()), String::new()),
            _ => {
                if !parameters.is_empty() {
                    url.query_pairs_mut().extend_pairs(parameters.iter());
                }
                (None, settings.body.clone())
            }
        };

        Ok(PreparedRequest {
            method,
            endpoint,
            url,
            parameters,
            form,
            headers: settings.headers,
            body,
        })
    }

    /// Makes a request to GitHub.
    ///
    /// Returns the response for any HTTP status; only transport failures
    /// are errors.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        overrides: &RequestOverrides,
    ) -> Result<ApiResponse, ClientError> {
        let prepared = self.prepare(method, endpoint, overrides)?;

        debug!(
            method = %prepared.method,
            endpoint = %prepared.endpoint,
            host = prepared.url.host_str().unwrap_or_default(),
            "Sending GitHub request"
        );

        let mut headers = HeaderMap::new();
        for (name, value) in &prepared.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ClientError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        let mut builder = self
            .http_client
            .request(prepared.method.to_reqwest(), prepared.url.clone())
            .headers(headers);
        if let Some(form) = &prepared.form {
            builder = builder.form(form);
        } else if !prepared.body.is_empty() {
            builder = builder.body(prepared.body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        let pagination = headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(parse_link_header)
            .unwrap_or_default();

        debug!(
            endpoint = %prepared.endpoint,
            status = status.as_u16(),
            has_next_page = pagination.next.is_some(),
            "GitHub response received"
        );

        Ok(ApiResponse {
            status,
            headers,
            body,
            pagination,
        })
    }

    /// GET without overrides.
    pub async fn get(&self, endpoint: &str) -> Result<ApiResponse, ClientError> {
        self.request(Method::Get, endpoint, &RequestOverrides::default())
            .await
    }
}
