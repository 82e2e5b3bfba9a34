use serde::{Deserialize, Serialize};

/// An issue as returned by GitHub's issues endpoints.
/// Only the fields the pages render are kept; serde ignores the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    /// Markdown. GitHub sends `null` for issues created without a body.
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    pub html_url: String,
    pub user: Account,
    #[serde(default)]
    pub comments: u64,
    /// Present on the cross-repository `/issues` listing only.
    #[serde(default)]
    pub repository: Option<Repository>,
}

impl Issue {
    pub fn body_markdown(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: Account,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub open_issues_count: u64,
    pub html_url: String,
}

/// The authenticated user, from `GET /user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Request body for creating or updating an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePayload {
    pub title: String,
    pub body: String,
}

/// The owner/repo pair that scopes every issue route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

/// Route parameters identifying a single issue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueParams {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl IssueParams {
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
        }
    }
}
