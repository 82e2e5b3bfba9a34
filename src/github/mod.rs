pub mod types;

pub use types::{GitHubUser, Issue, IssueParams, IssuePayload, RepoRef, Repository};

use axum::body::Bytes;
use reqwest::{redirect, RequestBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Page size for every listing forwarded to GitHub.
pub const PER_PAGE: u32 = 10;

const USER_AGENT: &str = "issue-desk";
const ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API returned {0}")]
    UnexpectedStatus(StatusCode),

    #[error("Failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Status and raw body of a single upstream call, relayed by the proxy
/// routes without being decoded.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Thin GitHub REST v3 client. Every method performs exactly one request
/// with the caller's token; nothing is retried or cached.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    /// Redirects are not followed so that a 301 from GitHub reaches the
    /// caller instead of being resolved transparently.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    #[instrument(skip(self, token))]
    pub async fn list_repo_issues(
        &self,
        token: &str,
        repo: &RepoRef,
        page: Option<u32>,
    ) -> Result<UpstreamResponse, GitHubError> {
        let url = format!("{}/repos/{}/{}/issues", self.api_url, repo.owner, repo.repo);
        self.send(self.paged(self.http.get(url), page), token).await
    }

    #[instrument(skip(self, token))]
    pub async fn get_issue(
        &self,
        token: &str,
        params: &IssueParams,
    ) -> Result<UpstreamResponse, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}",
            self.api_url, params.owner, params.repo, params.number
        );
        self.send(self.http.get(url), token).await
    }

    #[instrument(skip(self, token, payload))]
    pub async fn create_issue(
        &self,
        token: &str,
        repo: &RepoRef,
        payload: &IssuePayload,
    ) -> Result<UpstreamResponse, GitHubError> {
        let url = format!("{}/repos/{}/{}/issues", self.api_url, repo.owner, repo.repo);
        self.send(self.http.post(url).json(payload), token).await
    }

    #[instrument(skip(self, token, payload))]
    pub async fn update_issue(
        &self,
        token: &str,
        params: &IssueParams,
        payload: &IssuePayload,
    ) -> Result<UpstreamResponse, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}",
            self.api_url, params.owner, params.repo, params.number
        );
        self.send(self.http.patch(url).json(payload), token).await
    }

    #[instrument(skip(self, token))]
    pub async fn list_user_repos(
        &self,
        token: &str,
        page: Option<u32>,
    ) -> Result<UpstreamResponse, GitHubError> {
        let url = format!("{}/user/repos", self.api_url);
        self.send(self.paged(self.http.get(url), page), token).await
    }

    #[instrument(skip(self, token))]
    pub async fn list_user_issues(
        &self,
        token: &str,
        page: Option<u32>,
    ) -> Result<UpstreamResponse, GitHubError> {
        let url = format!("{}/issues", self.api_url);
        self.send(self.paged(self.http.get(url), page), token).await
    }

    /// Fetch the profile behind `token`. Used once per sign-in.
    #[instrument(skip(self, token))]
    pub async fn current_user(&self, token: &str) -> Result<GitHubUser, GitHubError> {
        let url = format!("{}/user", self.api_url);
        let response = self.send(self.http.get(url), token).await?;
        if response.status != StatusCode::OK {
            return Err(GitHubError::UnexpectedStatus(response.status));
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    fn paged(&self, request: RequestBuilder, page: Option<u32>) -> RequestBuilder {
        let request = request.query(&[("per_page", PER_PAGE)]);
        match page {
            Some(page) => request.query(&[("page", page)]),
            None => request,
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        token: &str,
    ) -> Result<UpstreamResponse, GitHubError> {
        let response = request
            .header("Accept", ACCEPT)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), body_bytes = body.len(), "upstream responded");

        Ok(UpstreamResponse { status, body })
    }
}
