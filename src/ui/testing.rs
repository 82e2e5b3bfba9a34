//! Test doubles for the page and modal tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Mutex;

use super::api::{ApiError, IssueApi};
use crate::github::{
    types::Account, GitHubUser, Issue, IssueParams, IssuePayload, RepoRef, Repository,
};
use crate::session::Session;

/// How the fake answers writes.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(u16),
    Fail(u16),
}

/// `IssueApi` that records writes and serves one canned issue / repository.
pub struct FakeApi {
    reply: Reply,
    updates: Mutex<Vec<IssuePayload>>,
    creates: Mutex<Vec<IssuePayload>>,
    tokens: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            updates: Mutex::new(Vec::new()),
            creates: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn updates(&self) -> Vec<IssuePayload> {
        self.updates.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<IssuePayload> {
        self.creates.lock().unwrap().clone()
    }

    pub fn last_token(&self) -> Option<String> {
        self.tokens.lock().unwrap().last().cloned()
    }

    fn write_reply(&self, token: &str) -> Result<StatusCode, ApiError> {
        self.tokens.lock().unwrap().push(token.to_string());
        match self.reply {
            Reply::Status(code) => Ok(StatusCode::from_u16(code).unwrap()),
            Reply::Fail(code) => Err(ApiError::Status {
                status: StatusCode::from_u16(code).unwrap(),
                message: "Validation failed, or the endpoint has been spammed".to_string(),
            }),
        }
    }
}

pub fn sample_issue(number: u64) -> Issue {
    Issue {
        number,
        title: "Found a bug".to_string(),
        body: Some("It **crashes** on start.".to_string()),
        state: "open".to_string(),
        html_url: format!("https://github.com/octocat/hello-world/issues/{number}"),
        user: Account {
            login: "octocat".to_string(),
        },
        comments: 3,
        repository: None,
    }
}

pub fn sample_repository() -> Repository {
    Repository {
        name: "hello-world".to_string(),
        full_name: "octocat/hello-world".to_string(),
        owner: Account {
            login: "octocat".to_string(),
        },
        description: Some("My first repository".to_string()),
        private: false,
        open_issues_count: 2,
        html_url: "https://github.com/octocat/hello-world".to_string(),
    }
}

pub fn test_session() -> Session {
    Session::new(
        GitHubUser {
            login: "octocat".to_string(),
            name: Some("The Octocat".to_string()),
            avatar_url: None,
        },
        "gho_test".to_string(),
    )
}

#[async_trait]
impl IssueApi for FakeApi {
    async fn list_issues(
        &self,
        _token: &str,
        _repo: &RepoRef,
        _page: u32,
    ) -> Result<Vec<Issue>, ApiError> {
        Ok(vec![sample_issue(1), sample_issue(2)])
    }

    async fn get_issue(&self, _token: &str, params: &IssueParams) -> Result<Issue, ApiError> {
        Ok(sample_issue(params.number))
    }

    async fn create_issue(
        &self,
        token: &str,
        _repo: &RepoRef,
        payload: &IssuePayload,
    ) -> Result<StatusCode, ApiError> {
        self.creates.lock().unwrap().push(payload.clone());
        self.write_reply(token)
    }

    async fn update_issue(
        &self,
        token: &str,
        _params: &IssueParams,
        payload: &IssuePayload,
    ) -> Result<StatusCode, ApiError> {
        self.updates.lock().unwrap().push(payload.clone());
        self.write_reply(token)
    }

    async fn list_repos(&self, _token: &str, _page: u32) -> Result<Vec<Repository>, ApiError> {
        Ok(vec![sample_repository()])
    }

    async fn list_user_issues(&self, _token: &str, _page: u32) -> Result<Vec<Issue>, ApiError> {
        let mut issue = sample_issue(5);
        issue.repository = Some(sample_repository());
        Ok(vec![issue])
    }
}
