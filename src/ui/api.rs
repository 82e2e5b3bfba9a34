use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::github::{Issue, IssueParams, IssuePayload, RepoRef, Repository};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request to issue proxy failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Issue proxy answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Failed to decode proxy response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status to show on a page that failed to load its data.
    pub fn page_status(&self) -> StatusCode {
        match self {
            ApiError::Status { status, .. } => *status,
            ApiError::Request(_) | ApiError::Decode(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// The pages' view of the proxy routes. Non-success statuses come back as
/// `ApiError::Status`; successful writes return the status they got.
#[async_trait]
pub trait IssueApi: Send + Sync {
    async fn list_issues(&self, token: &str, repo: &RepoRef, page: u32)
        -> Result<Vec<Issue>, ApiError>;

    async fn get_issue(&self, token: &str, params: &IssueParams) -> Result<Issue, ApiError>;

    async fn create_issue(
        &self,
        token: &str,
        repo: &RepoRef,
        payload: &IssuePayload,
    ) -> Result<StatusCode, ApiError>;

    async fn update_issue(
        &self,
        token: &str,
        params: &IssueParams,
        payload: &IssuePayload,
    ) -> Result<StatusCode, ApiError>;

    async fn list_repos(&self, token: &str, page: u32) -> Result<Vec<Repository>, ApiError>;

    async fn list_user_issues(&self, token: &str, page: u32) -> Result<Vec<Issue>, ApiError>;
}

/// `IssueApi` over HTTP against this server's own `/api/github` routes.
/// The token goes out raw in `Authorization`, as the proxy expects.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        token: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let response = request.header("Authorization", token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %message, "proxy call failed");
        Err(ApiError::Status { status, message })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        page: Option<u32>,
    ) -> Result<T, ApiError> {
        let mut request = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        let bytes = self.send(request, token).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl IssueApi for ProxyClient {
    #[instrument(skip(self, token))]
    async fn list_issues(
        &self,
        token: &str,
        repo: &RepoRef,
        page: u32,
    ) -> Result<Vec<Issue>, ApiError> {
        let path = format!("/api/github/issues/{}/{}", repo.owner, repo.repo);
        self.fetch(&path, token, Some(page)).await
    }

    #[instrument(skip(self, token))]
    async fn get_issue(&self, token: &str, params: &IssueParams) -> Result<Issue, ApiError> {
        let path = format!(
            "/api/github/issues/{}/{}/{}",
            params.owner, params.repo, params.number
        );
        self.fetch(&path, token, None).await
    }

    #[instrument(skip(self, token, payload))]
    async fn create_issue(
        &self,
        token: &str,
        repo: &RepoRef,
        payload: &IssuePayload,
    ) -> Result<StatusCode, ApiError> {
        let url = format!("{}/api/github/issues/{}/{}", self.base_url, repo.owner, repo.repo);
        let response = self.send(self.http.post(url).json(payload), token).await?;
        Ok(response.status())
    }

    #[instrument(skip(self, token, payload))]
    async fn update_issue(
        &self,
        token: &str,
        params: &IssueParams,
        payload: &IssuePayload,
    ) -> Result<StatusCode, ApiError> {
        let url = format!(
            "{}/api/github/issues/{}/{}/{}",
            self.base_url, params.owner, params.repo, params.number
        );
        let response = self.send(self.http.patch(url).json(payload), token).await?;
        Ok(response.status())
    }

    #[instrument(skip(self, token))]
    async fn list_repos(&self, token: &str, page: u32) -> Result<Vec<Repository>, ApiError> {
        self.fetch("/api/github/repos", token, Some(page)).await
    }

    #[instrument(skip(self, token))]
    async fn list_user_issues(&self, token: &str, page: u32) -> Result<Vec<Issue>, ApiError> {
        self.fetch("/api/github/issues", token, Some(page)).await
    }
}
