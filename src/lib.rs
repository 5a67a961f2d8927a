// Configuration (TOML + environment)
pub mod config;

// Prefixed key/value settings store
pub mod settings;

// GitHub REST client and Link-header pagination
pub mod client;

// OAuth web application flow
pub mod oauth;

// Rate-limit status reader
pub mod rate_limit;

// Settings page HTTP API
pub mod api;

pub use client::{ApiResponse, ClientError, GitHubClient, Method, RequestOverrides};
pub use config::GitHubApiConfig;
pub use settings::Settings;
