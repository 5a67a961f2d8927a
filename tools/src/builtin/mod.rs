//! Built-in example tools.

pub mod views;

use crate::tool::{get_json, EmbeddedAsset, Tool, ToolOutput};
use anyhow::Result;
use async_trait::async_trait;
use github_api::GitHubClient;
use serde_json::{json, Value};

use self::views::{project, OrgView, RepoView, SearchView, UserView};

/// Chart script rendered by the weekly commit count page.
pub const WEEKLY_COMMIT_CHART_SCRIPT: &str = "tool-chart-repo-weekly-commit-count.js";

/// Global the chart script reads its data from.
pub const CHART_DATA_VARIABLE: &str = "chartData";

pub struct UserInfoTool;

#[async_trait]
impl Tool for UserInfoTool {
    fn name(&self) -> &str {
        "get_user_info"
    }

    fn title(&self) -> &str {
        "User Information"
    }

    fn description(&self) -> &str {
        "Makes a call to \"/users/gedex\" to get GitHub user with login \"gedex\"."
    }

    async fn run(&self, client: &GitHubClient) -> Result<Option<ToolOutput>> {
        get_json(client, "users/gedex", &[]).await
    }

    fn view(&self, result: &Value) -> Option<Value> {
        project::<UserView>(result)
    }
}

pub struct OrgInfoTool;

#[async_trait]
impl Tool for OrgInfoTool {
    fn name(&self) -> &str {
        "get_org_info"
    }

    fn title(&self) -> &str {
        "Org Information"
    }

    fn description(&self) -> &str {
        "Makes a call to \"/orgs/Automattic\" to get GitHub organization named \"Automattic\"."
    }

    async fn run(&self, client: &GitHubClient) -> Result<Option<ToolOutput>> {
        get_json(client, "orgs/Automattic", &[]).await
    }

    fn view(&self, result: &Value) -> Option<Value> {
        project::<OrgView>(result)
    }
}

pub struct RepoInfoTool;

#[async_trait]
impl Tool for RepoInfoTool {
    fn name(&self) -> &str {
        "get_repo_info"
    }

    fn title(&self) -> &str {
        "Repository Information"
    }

    fn description(&self) -> &str {
        "Makes a call to \"/repos/WordPress/WordPress\" to get GitHub repository named \"WordPress\"."
    }

    async fn run(&self, client: &GitHubClient) -> Result<Option<ToolOutput>> {
        get_json(client, "repos/WordPress/WordPress", &[]).await
    }

    fn view(&self, result: &Value) -> Option<Value> {
        project::<RepoView>(result)
    }
}

pub struct SearchRepositoriesTool;

#[async_trait]
impl Tool for SearchRepositoriesTool {
    fn name(&self) -> &str {
        "search_repositories"
    }

    fn title(&self) -> &str {
        "Search Repositories"
    }

    fn description(&self) -> &str {
        "Makes a call to \"/search/repositories?q=WordPress+plugin\" to search repositories that matches \"WordPress plugin\"."
    }

    async fn run(&self, client: &GitHubClient) -> Result<Option<ToolOutput>> {
        get_json(client, "search/repositories", &[("q", "WordPress plugin")]).await
    }

    fn view(&self, result: &Value) -> Option<Value> {
        project::<SearchView>(result)
    }
}

pub struct WeeklyCommitCountTool;

#[async_trait]
impl Tool for WeeklyCommitCountTool {
    fn name(&self) -> &str {
        "weekly_commit_count"
    }

    fn title(&self) -> &str {
        "Repo Weekly Commit Count"
    }

    fn description(&self) -> &str {
        "Makes a call to \"/repos/WordPress/WordPress/stats/participation\" and renders the stats into a bar chart."
    }

    async fn run(&self, client: &GitHubClient) -> Result<Option<ToolOutput>> {
        get_json(client, "repos/WordPress/WordPress/stats/participation", &[]).await
    }

    /// Hands the weekly totals (`all`, oldest week first) to the chart.
    fn on_render(&self, result: &Value) -> Option<EmbeddedAsset> {
        let weeks = result.get("all")?.as_array()?;
        Some(EmbeddedAsset {
            script: WEEKLY_COMMIT_CHART_SCRIPT.to_string(),
            variable: CHART_DATA_VARIABLE.to_string(),
            data: json!({ "all": weeks }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use github_api::client::ClientSettings;
    use github_api::GitHubApiConfig;
    use mockito::{Matcher, Server};

    fn create_client(base_url: &str) -> GitHubClient {
        let mut config = GitHubApiConfig::default();
        config.github.api_base_url = base_url.to_string();
        GitHubClient::new(&config, ClientSettings::default()).unwrap()
    }

    #[test]
    fn test_weekly_commit_count_on_render() {
        let result = json!({"all": [1, 0, 5], "owner": [0, 0, 1]});
        let asset = WeeklyCommitCountTool.on_render(&result).unwrap();

        assert_eq!(asset.script, "tool-chart-repo-weekly-commit-count.js");
        assert_eq!(asset.variable, "chartData");
        assert_eq!(asset.data, json!({"all": [1, 0, 5]}));

        // GitHub answers `{}` while statistics are being computed
        assert!(WeeklyCommitCountTool.on_render(&json!({})).is_none());
    }

    #[test]
    fn test_only_chart_tool_has_render_hook() {
        let result = json!({"all": []});
        assert!(UserInfoTool.on_render(&result).is_none());
        assert!(WeeklyCommitCountTool.view(&result).is_none());
    }

    #[tokio::test]
    async fn test_user_info_success() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/gedex")
            .with_status(200)
            .with_body(r#"{"login":"gedex","name":"Akeda Bagus","html_url":"https://github.com/gedex","avatar_url":"https://a/1"}"#)
            .create_async()
            .await;

        let client = create_client(&server.url());
        let output = UserInfoTool.run(&client).await.unwrap().unwrap();

        assert_eq!(output.data["login"], "gedex");
        assert!(output.pagination.is_empty());
        let view = UserInfoTool.view(&output.data).unwrap();
        assert_eq!(view["name"], "Akeda Bagus");
    }

    #[tokio::test]
    async fn test_search_sends_query() {
        let mut server = Server::new_async().await;
        let link = format!(
            "<{0}/search/repositories?q=WordPress+plugin&page=2>; rel=\"next\", <{0}/search/repositories?q=WordPress+plugin&page=34>; rel=\"last\"",
            server.url()
        );
        let _mock = server
            .mock("GET", "/search/repositories")
            .match_query(Matcher::UrlEncoded("q".into(), "WordPress plugin".into()))
            .with_status(200)
            .with_header("link", &link)
            .with_body(r#"{"total_count":0,"incomplete_results":false,"items":[]}"#)
            .create_async()
            .await;

        let client = create_client(&server.url());
        let output = SearchRepositoriesTool.run(&client).await.unwrap().unwrap();

        assert_eq!(output.data["total_count"], 0);
        assert_eq!(output.pagination.next.map(|l| l.page), Some(2));
        assert_eq!(output.pagination.last.map(|l| l.page), Some(34));
    }

    #[tokio::test]
    async fn test_non_200_yields_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/orgs/Automattic")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let client = create_client(&server.url());
        assert!(OrgInfoTool.run(&client).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transport_error_yields_none() {
        let client = create_client("http://127.0.0.1:1");
        assert!(RepoInfoTool.run(&client).await.unwrap().is_none());
    }
}
