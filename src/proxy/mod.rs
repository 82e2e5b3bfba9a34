pub mod status;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::github::{GitHubClient, GitHubError, IssueParams, IssuePayload, RepoRef, UpstreamResponse};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

/// Routes under `/api/github` that forward one request each to GitHub.
pub fn router(github: Arc<GitHubClient>) -> Router {
    Router::new()
        .route("/api/github/repos", get(list_repos))
        .route("/api/github/issues", get(list_user_issues))
        .route(
            "/api/github/issues/{owner}/{repo}",
            get(list_issues).post(create_issue),
        )
        .route(
            "/api/github/issues/{owner}/{repo}/{number}",
            get(get_issue).patch(update_issue),
        )
        .with_state(github)
}

/// Token from the `Authorization` header. Accepts the raw token or a
/// `Bearer ` prefixed one; blank values count as absent.
pub fn request_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn unauthorized() -> Response {
    debug!("rejecting request without Authorization header");
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

/// Resolve the page query once the caller is known to be authorised.
fn page_of(query: Result<Query<PageQuery>, QueryRejection>) -> Result<Option<u32>, Response> {
    match query {
        Ok(Query(query)) => Ok(query.page),
        Err(rejection) => Err(rejection.into_response()),
    }
}

/// Turn the single upstream attempt into the proxy's response.
fn relay(result: Result<UpstreamResponse, GitHubError>) -> Response {
    match result {
        Ok(upstream) if upstream.status.is_success() => (
            upstream.status,
            [(CONTENT_TYPE, "application/json")],
            upstream.body,
        )
            .into_response(),
        Ok(upstream) => {
            let mapped = status::map_upstream_status(upstream.status);
            warn!(
                upstream = upstream.status.as_u16(),
                local = mapped.status.as_u16(),
                "upstream call failed"
            );
            (mapped.status, mapped.message).into_response()
        }
        Err(err) => {
            error!(error = %err, "upstream call did not complete");
            (StatusCode::BAD_GATEWAY, "Bad gateway").into_response()
        }
    }
}

async fn list_issues(
    State(github): State<Arc<GitHubClient>>,
    Path(repo): Path<RepoRef>,
    headers: HeaderMap,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    let Some(token) = request_token(&headers) else {
        return unauthorized();
    };
    let page = match page_of(query) {
        Ok(page) => page,
        Err(rejection) => return rejection,
    };
    relay(github.list_repo_issues(&token, &repo, page).await)
}

async fn get_issue(
    State(github): State<Arc<GitHubClient>>,
    Path(params): Path<IssueParams>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = request_token(&headers) else {
        return unauthorized();
    };
    relay(github.get_issue(&token, &params).await)
}

async fn create_issue(
    State(github): State<Arc<GitHubClient>>,
    Path(repo): Path<RepoRef>,
    headers: HeaderMap,
    payload: Result<Json<IssuePayload>, JsonRejection>,
) -> Response {
    let Some(token) = request_token(&headers) else {
        return unauthorized();
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection.into_response(),
    };
    relay(github.create_issue(&token, &repo, &payload).await)
}

async fn update_issue(
    State(github): State<Arc<GitHubClient>>,
    Path(params): Path<IssueParams>,
    headers: HeaderMap,
    payload: Result<Json<IssuePayload>, JsonRejection>,
) -> Response {
    let Some(token) = request_token(&headers) else {
        return unauthorized();
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection.into_response(),
    };
    relay(github.update_issue(&token, &params, &payload).await)
}

async fn list_repos(
    State(github): State<Arc<GitHubClient>>,
    headers: HeaderMap,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    let Some(token) = request_token(&headers) else {
        return unauthorized();
    };
    let page = match page_of(query) {
        Ok(page) => page,
        Err(rejection) => return rejection,
    };
    relay(github.list_user_repos(&token, page).await)
}

async fn list_user_issues(
    State(github): State<Arc<GitHubClient>>,
    headers: HeaderMap,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    let Some(token) = request_token(&headers) else {
        return unauthorized();
    };
    let page = match page_of(query) {
        Ok(page) => page,
        Err(rejection) => return rejection,
    };
    relay(github.list_user_issues(&token, page).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{any, body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MAX_BODY: usize = 1024 * 1024;

    fn app(server: &MockServer) -> Router {
        let github = GitHubClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        router(Arc::new(github))
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), MAX_BODY).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn list_request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/github/issues/octocat/hello-world?page=1");
        if let Some(token) = token {
            builder = builder.header("Authorization", token);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_request_token_variants() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_token(&headers), None);

        headers.insert(AUTHORIZATION, "gho_abc".parse().unwrap());
        assert_eq!(request_token(&headers).as_deref(), Some("gho_abc"));

        headers.insert(AUTHORIZATION, "Bearer gho_abc".parse().unwrap());
        assert_eq!(request_token(&headers).as_deref(), Some("gho_abc"));

        headers.insert(AUTHORIZATION, "   ".parse().unwrap());
        assert_eq!(request_token(&headers), None);
    }

    #[tokio::test]
    async fn test_missing_token_returns_401_without_upstream_call() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let response = app(&server).oneshot(list_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "Unauthorized");
    }

    #[tokio::test]
    async fn test_missing_token_on_patch_returns_401_without_upstream_call() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let request = Request::builder()
            .method("PATCH")
            .uri("/api/github/issues/octocat/hello-world/1")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"title":"t","body":"b"}"#))
            .unwrap();
        let response = app(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_page_without_token_is_still_401() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for uri in [
            "/api/github/issues/octocat/hello-world?page=abc",
            "/api/github/repos?page=-1",
            "/api/github/issues?page=x",
        ] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app(&server).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_bad_page_with_token_is_rejected_without_upstream_call() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let request = Request::builder()
            .uri("/api/github/issues/octocat/hello-world?page=abc")
            .header("Authorization", "gho_token")
            .body(Body::empty())
            .unwrap();
        let response = app(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_relays_upstream_body_and_status() {
        let server = MockServer::start().await;
        let issues = json!([
            { "number": 1, "title": "Found a bug", "state": "open" },
            { "number": 2, "title": "Docs typo", "state": "closed" }
        ]);
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello-world/issues"))
            .and(query_param("per_page", "10"))
            .and(query_param("page", "1"))
            .and(header("authorization", "Bearer gho_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(issues.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let response = app(&server)
            .oneshot(list_request(Some("gho_token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body, issues);
    }

    #[tokio::test]
    async fn test_known_upstream_failures_keep_status() {
        for (code, message) in [
            (301u16, "Moved permanently"),
            (404, "Not found"),
            (422, "Validation failed, or the endpoint has been spammed"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/repos/octocat/hello-world/issues"))
                .respond_with(ResponseTemplate::new(code))
                .expect(1)
                .mount(&server)
                .await;

            let response = app(&server)
                .oneshot(list_request(Some("gho_token")))
                .await
                .unwrap();
            assert_eq!(response.status().as_u16(), code);
            assert_eq!(body_text(response).await, message);
        }
    }

    #[tokio::test]
    async fn test_other_upstream_failures_become_400() {
        for code in [401u16, 403, 500, 503] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/repos/octocat/hello-world/issues"))
                .respond_with(ResponseTemplate::new(code))
                .mount(&server)
                .await;

            let response = app(&server)
                .oneshot(list_request(Some("gho_token")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_text(response).await, "Client side error");
        }
    }

    #[tokio::test]
    async fn test_unreachable_upstream_returns_502() {
        // Reserve a free port, then release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let github = GitHubClient::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let response = router(Arc::new(github))
            .oneshot(list_request(Some("gho_token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_patch_forwards_payload_and_maps_errors_like_list() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octocat/hello-world/issues/42"))
            .and(header("authorization", "Bearer gho_token"))
            .and(body_json(json!({ "title": "Renamed", "body": "# Heading" })))
            .respond_with(ResponseTemplate::new(422))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::builder()
            .method("PATCH")
            .uri("/api/github/issues/octocat/hello-world/42")
            .header("Authorization", "gho_token")
            .header("Content-Type", "application/json")
            .body(Body::from(r##"{"title":"Renamed","body":"# Heading"}"##))
            .unwrap();
        let response = app(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_text(response).await,
            "Validation failed, or the endpoint has been spammed"
        );
    }

    #[tokio::test]
    async fn test_create_relays_201() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/hello-world/issues"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "number": 9 })))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/github/issues/octocat/hello-world")
            .header("Authorization", "gho_token")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"title":"New","body":"Body text"}"#))
            .unwrap();
        let response = app(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_repos_listing_is_paged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(query_param("per_page", "10"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::builder()
            .uri("/api/github/repos?page=3")
            .header("Authorization", "gho_token")
            .body(Body::empty())
            .unwrap();
        let response = app(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
