use anyhow::{Context, Result};
use serde::Deserialize;

/// Default GitHub REST API host.
pub const API_BASE_URL: &str = "https://api.github.com";

/// Default GitHub OAuth host. Authorization and token exchange live under it.
pub const AUTH_BASE_URL: &str = "https://github.com/login";

/// Complete github-api configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubApiConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Application identity, sent as the User-Agent on every GitHub request
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_version")]
    pub version: String,
}

fn default_app_name() -> String {
    "github_api".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

impl AppConfig {
    pub fn user_agent(&self) -> String {
        format!("{} v{}", self.name, self.version)
    }
}

/// Upstream hosts. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
}

fn default_api_base_url() -> String {
    API_BASE_URL.to_string()
}

fn default_auth_base_url() -> String {
    AUTH_BASE_URL.to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            auth_base_url: default_auth_base_url(),
        }
    }
}

/// OAuth app settings.
///
/// `client_id` / `client_secret` here are only fallbacks: values saved in the
/// settings store take precedence.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Settings page URL; GitHub redirects here with `code` and `state`.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// See https://developer.github.com/v3/oauth/#scopes
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_state_expiry_seconds")]
    pub state_expiry_seconds: i64,
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/settings".to_string()
}

fn default_scope() -> String {
    "user:email".to_string()
}

fn default_state_expiry_seconds() -> i64 {
    600
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: default_redirect_uri(),
            scope: default_scope(),
            state_expiry_seconds: default_state_expiry_seconds(),
        }
    }
}

/// Settings store location
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_settings_db")]
    pub settings_db: String,
    /// Base64-encoded 32-byte key. Values are stored in plaintext when unset.
    #[serde(default)]
    pub encryption_key: Option<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_settings_db() -> String {
    "settings.db".to_string()
}

fn default_prefix() -> String {
    "github_api_".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_db: default_settings_db(),
            encryption_key: None,
            prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_tools_port")]
    pub tools_port: u16,
}

fn default_port() -> u16 {
    3000
}

fn default_tools_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            tools_port: default_tools_port(),
        }
    }
}

impl GitHubApiConfig {
    /// Load from `GITHUB_API_CONFIG` if set, otherwise defaults, then apply
    /// environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("GITHUB_API_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Override individual values from environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("GITHUB_API_CLIENT_ID") {
            self.oauth.client_id = Some(v);
        }
        if let Ok(v) = std::env::var("GITHUB_API_CLIENT_SECRET") {
            self.oauth.client_secret = Some(v);
        }
        if let Ok(v) = std::env::var("GITHUB_API_REDIRECT_URI") {
            self.oauth.redirect_uri = v;
        }
        if let Ok(v) = std::env::var("GITHUB_API_SETTINGS_DB") {
            self.storage.settings_db = v;
        }
        if let Ok(v) = std::env::var("GITHUB_API_ENCRYPTION_KEY") {
            self.storage.encryption_key = Some(v);
        }
        if let Ok(v) = std::env::var("GITHUB_API_PORT") {
            self.server.port = v
                .parse()
                .context("GITHUB_API_PORT must be a valid port number")?;
        }
        if let Ok(v) = std::env::var("GITHUB_API_TOOLS_PORT") {
            self.server.tools_port = v
                .parse()
                .context("GITHUB_API_TOOLS_PORT must be a valid port number")?;
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<GitHubApiConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
    let config: GitHubApiConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path))?;
    Ok(config)
}
