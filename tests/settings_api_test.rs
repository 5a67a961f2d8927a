// Integration tests for the settings page API

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use github_api::api::{create_settings_router, SettingsAppState};
use github_api::config::GitHubApiConfig;
use github_api::oauth::{Authorizer, StateManager};
use github_api::settings::{keys, MemorySettingStore, Settings};
use mockito::{Matcher, Server, ServerGuard};
use std::sync::Arc;
use tower::ServiceExt;

const RATE_LIMIT_BODY: &str = r#"{
    "resources": {
        "core": {"limit": 60, "remaining": 57, "reset": 1372700873},
        "search": {"limit": 10, "remaining": 10, "reset": 1372697452}
    },
    "rate": {"limit": 60, "remaining": 57, "reset": 1372700873}
}"#;

fn create_test_app(server_url: &str) -> (Router, Settings) {
    let (router, settings, _) = create_test_app_with_states(server_url);
    (router, settings)
}

fn create_test_app_with_states(server_url: &str) -> (Router, Settings, StateManager) {
    let mut config = GitHubApiConfig::default();
    config.github.api_base_url = server_url.to_string();
    config.github.auth_base_url = format!("{}/login", server_url);

    let settings = Settings::new(Arc::new(MemorySettingStore::new()), "github_api_");
    let states = StateManager::new(600);
    let authorizer = Authorizer::new(Arc::new(config), settings.clone(), states.clone());

    let router = create_settings_router(SettingsAppState {
        settings: settings.clone(),
        authorizer,
    });
    (router, settings, states)
}

async fn mock_rate_limit(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/rate_limit")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(RATE_LIMIT_BODY)
        .create_async()
        .await
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/settings")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_unauthenticated_page() {
    let mut server = Server::new_async().await;
    let _rate = mock_rate_limit(&mut server).await;
    let (app, _) = create_test_app(&server.url());

    let (status, json) = get_json(app, "/settings").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["authorized"], false);
    assert_eq!(json["authentication_method"], "Unauthenticated");
    assert!(json["authenticated_user"].is_null());
    assert_eq!(json["notices"], serde_json::json!([]));
    assert!(json["authorize_url"].is_null());
    assert_eq!(json["rate_limit"]["core"]["limit"], 60);
    assert_eq!(json["rate_limit"]["core"]["remaining"], 57);
    assert_eq!(json["rate_limit"]["core"]["reset"], "2013-07-01 17:47:53");
    assert_eq!(json["rate_limit"]["search"]["remaining"], 10);
}

#[tokio::test]
async fn test_key_secret_page_has_authorize_url() {
    let mut server = Server::new_async().await;
    let _rate = mock_rate_limit(&mut server).await;
    let (app, settings) = create_test_app(&server.url());
    settings.set(keys::CLIENT_ID, "cid").unwrap();
    settings.set(keys::CLIENT_SECRET, "csecret").unwrap();

    let (status, json) = get_json(app, "/settings").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["authentication_method"], "OAuth2 Key/Secret");
    assert_eq!(json["authorize_url"], "/settings/authorize");
}

#[tokio::test]
async fn test_page_renders_issue_no_states() {
    let mut server = Server::new_async().await;
    let _rate = mock_rate_limit(&mut server).await;
    let (app, settings, states) = create_test_app_with_states(&server.url());
    settings.set(keys::CLIENT_ID, "cid").unwrap();

    for _ in 0..5 {
        let (status, _) = get_json(app.clone(), "/settings").await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(states.count(), 0);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/settings/authorize")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(states.count(), 1);
}

#[tokio::test]
async fn test_token_page_shows_user() {
    let mut server = Server::new_async().await;
    let _rate = mock_rate_limit(&mut server).await;
    let _user = server
        .mock("GET", "/user")
        .match_query(Matcher::UrlEncoded("access_token".into(), "gho_tok".into()))
        .with_status(200)
        .with_body(r#"{"login":"gedex","html_url":"https://github.com/gedex","id":1}"#)
        .create_async()
        .await;
    let (app, settings) = create_test_app(&server.url());
    settings.set(keys::ACCESS_TOKEN, "gho_tok").unwrap();

    let (_, json) = get_json(app, "/settings").await;

    assert_eq!(json["authorized"], true);
    assert_eq!(json["authentication_method"], "OAuth2 Token");
    assert_eq!(json["authenticated_user"]["login"], "gedex");
    assert_eq!(json["authenticated_user"]["html_url"], "https://github.com/gedex");
}

#[tokio::test]
async fn test_rate_limit_failure_becomes_notice() {
    let mut server = Server::new_async().await;
    let _rate = server
        .mock("GET", "/rate_limit")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"message":"API rate limit exceeded"}"#)
        .create_async()
        .await;
    let (app, _) = create_test_app(&server.url());

    let (status, json) = get_json(app, "/settings").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["notices"], serde_json::json!(["API rate limit exceeded"]));
    assert!(json["rate_limit"].is_null());
}

#[tokio::test]
async fn test_update_credentials() {
    let (app, settings) = create_test_app("http://127.0.0.1:1");

    let response = app
        .oneshot(form_request("client_id=Iv1abc123&client_secret=0123abcdef"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["client_id_set"], true);
    assert_eq!(json["client_secret_set"], true);

    assert_eq!(settings.get(keys::CLIENT_ID).unwrap().as_deref(), Some("Iv1abc123"));
    assert_eq!(
        settings.get(keys::CLIENT_SECRET).unwrap().as_deref(),
        Some("0123abcdef")
    );
}

#[tokio::test]
async fn test_invalid_credentials_cleared() {
    let (app, settings) = create_test_app("http://127.0.0.1:1");
    settings.set(keys::CLIENT_ID, "previous").unwrap();

    let response = app
        .oneshot(form_request("client_id=bad%20value%3Cscript%3E"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(settings.get(keys::CLIENT_ID).unwrap().is_none());
}

#[tokio::test]
async fn test_update_without_fields_rejected() {
    let (app, _) = create_test_app("http://127.0.0.1:1");

    let response = app.oneshot(form_request("other=1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authorize_redirects_to_github() {
    let (app, settings) = create_test_app("https://github.example");
    settings.set(keys::CLIENT_ID, "cid").unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/settings/authorize")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://github.example/login/oauth/authorize?client_id=cid"));
    assert!(location.contains("scope=user%3Aemail"));
}
