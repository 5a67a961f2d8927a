//! Tool registry. Order is the order tools are listed in.

use crate::builtin::{
    OrgInfoTool, RepoInfoTool, SearchRepositoriesTool, UserInfoTool, WeeklyCommitCountTool,
};
use crate::Tool;
use std::sync::Arc;

/// Returns all available tools.
pub fn get_all_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(UserInfoTool),
        Arc::new(OrgInfoTool),
        Arc::new(RepoInfoTool),
        Arc::new(SearchRepositoriesTool),
        Arc::new(WeeklyCommitCountTool),
    ]
}

pub fn find_tool(name: &str) -> Option<Arc<dyn Tool>> {
    get_all_tools().into_iter().find(|tool| tool.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_all_tools() {
        let names: Vec<String> = get_all_tools()
            .iter()
            .map(|tool| tool.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "get_user_info",
                "get_org_info",
                "get_repo_info",
                "search_repositories",
                "weekly_commit_count"
            ]
        );
    }

    #[test]
    fn test_find_tool() {
        let tool = find_tool("get_repo_info").unwrap();
        assert_eq!(tool.title(), "Repository Information");
        assert!(find_tool("delete_everything").is_none());
    }
}
