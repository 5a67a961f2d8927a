//! Typed display projections of GitHub responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decodes `result` as `T` and re-encodes it, dropping every other field.
pub fn project<T>(result: &Value) -> Option<Value>
where
    T: for<'de> Deserialize<'de> + Serialize,
{
    let view = T::deserialize(result).ok()?;
    serde_json::to_value(view).ok()
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct UserView {
    pub name: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub html_url: String,
    pub avatar_url: String,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct OrgView {
    pub login: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub blog: Option<String>,
    pub html_url: String,
    pub public_repos: u64,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct RepoView {
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct SearchView {
    pub total_count: u64,
    pub items: Vec<RepoView>,
}
