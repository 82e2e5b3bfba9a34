use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use axum_extra::extract::cookie::CookieJar;
use maud::{html, Markup, PreEscaped};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::api::{ApiError, IssueApi};
use super::home::home;
use super::issue_modal::{IssueForm, IssueModal, SubmitOutcome};
use super::layout::base_document;
use super::toast::Toast;
use crate::github::{Issue, IssueParams, RepoRef, Repository, PER_PAGE};
use crate::markdown;
use crate::session::{SessionStatus, SessionStore, SESSION_COOKIE};

/// State for the HTML pages: the session table and the proxy seam.
#[derive(Clone)]
pub struct PageState {
    pub sessions: SessionStore,
    pub api: Arc<dyn IssueApi>,
}

pub fn router(state: PageState) -> Router {
    Router::new()
        .route("/", get(home_page))
        .route("/repos", get(repos_page))
        .route("/issues", get(user_issues_page))
        .route(
            "/issues/{owner}/{repo}",
            get(repo_issues_page).post(create_issue),
        )
        .route(
            "/issues/{owner}/{repo}/{number}",
            get(issue_page).post(update_issue),
        )
        .with_state(state)
}

/// Set after a redirect so the re-fetched page can show the success toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Notice {
    Created,
    Updated,
}

impl Notice {
    fn toast(self) -> Toast {
        match self {
            Notice::Created => Toast::success("Create successfully"),
            Notice::Updated => Toast::success("Update successfully"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    page: Option<u32>,
    notice: Option<Notice>,
}

impl PageParams {
    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

async fn session_status(state: &PageState, jar: &CookieJar) -> SessionStatus {
    let id = jar.get(SESSION_COOKIE).map(|cookie| cookie.value());
    state.sessions.status(id).await
}

fn render(status_code: StatusCode, markup: Markup) -> Response {
    (status_code, Html(markup.into_string())).into_response()
}

fn error_page(status: &SessionStatus, err: &ApiError) -> Response {
    warn!(error = %err, "page data could not be loaded");
    let toast = Toast::error("Oops...", "Something error");
    let body = html! {
        main {
            h1 { "Could not load this page" }
            p class="muted" { (err.to_string()) }
            a href="/" class="button" { "Back home" }
        }
    };
    render(
        err.page_status(),
        base_document("Error", status, Some(&toast), body),
    )
}

fn pagination(base: &str, page: u32, shown: usize) -> Markup {
    let has_next = shown as u32 >= PER_PAGE;
    html! {
        nav class="pagination" {
            @if page > 1 {
                a href=(format!("{base}?page={}", page - 1)) class="button" { "Previous" }
            }
            span class="muted" { "Page " (page) }
            @if has_next {
                a href=(format!("{base}?page={}", page + 1)) class="button" { "Next" }
            }
        }
    }
}

fn issue_path(owner: &str, repo: &str, number: u64) -> String {
    format!("/issues/{owner}/{repo}/{number}")
}

async fn home_page(State(state): State<PageState>, jar: CookieJar) -> Response {
    let status = session_status(&state, &jar).await;
    render(StatusCode::OK, base_document("Home", &status, None, home(&status)))
}

async fn repos_page(
    State(state): State<PageState>,
    jar: CookieJar,
    Query(params): Query<PageParams>,
) -> Response {
    let status = session_status(&state, &jar).await;
    let Some(session) = status.session() else {
        return Redirect::to("/").into_response();
    };
    let page = params.page();

    match state.api.list_repos(&session.access_token, page).await {
        Ok(repos) => {
            let body = html! {
                main {
                    h1 { "Your repositories" }
                    (repo_table(&repos))
                    (pagination("/repos", page, repos.len()))
                }
            };
            render(StatusCode::OK, base_document("Repositories", &status, None, body))
        }
        Err(err) => error_page(&status, &err),
    }
}

fn repo_table(repos: &[Repository]) -> Markup {
    html! {
        @if repos.is_empty() {
            p class="muted" { "No repositories." }
        } @else {
            table {
                tr { th { "Repository" } th { "Description" } th { "Open issues" } }
                @for repo in repos {
                    tr {
                        td {
                            a href=(format!("/issues/{}/{}", repo.owner.login, repo.name)) {
                                (repo.full_name)
                            }
                            @if repo.private {
                                " " span class="muted" { "(private)" }
                            }
                        }
                        td { (repo.description.as_deref().unwrap_or_default()) }
                        td { (repo.open_issues_count) }
                    }
                }
            }
        }
    }
}

async fn user_issues_page(
    State(state): State<PageState>,
    jar: CookieJar,
    Query(params): Query<PageParams>,
) -> Response {
    let status = session_status(&state, &jar).await;
    let Some(session) = status.session() else {
        return Redirect::to("/").into_response();
    };
    let page = params.page();

    match state.api.list_user_issues(&session.access_token, page).await {
        Ok(issues) => {
            let body = html! {
                main {
                    h1 { "Your issues" }
                    (issue_table(&issues, None))
                    (pagination("/issues", page, issues.len()))
                }
            };
            render(StatusCode::OK, base_document("Issues", &status, None, body))
        }
        Err(err) => error_page(&status, &err),
    }
}

/// Issue rows. `repo` scopes the links when the listing belongs to one
/// repository; otherwise each issue's own `repository` is used.
fn issue_table(issues: &[Issue], repo: Option<&RepoRef>) -> Markup {
    html! {
        @if issues.is_empty() {
            p class="muted" { "No issues." }
        } @else {
            table {
                tr { th { "#" } th { "Title" } th { "State" } th { "Comments" } }
                @for issue in issues {
                    @let href = issue_href(issue, repo);
                    tr {
                        td { (issue.number) }
                        td {
                            @if let Some(href) = href {
                                a href=(href) { (issue.title) }
                            } @else {
                                (issue.title)
                            }
                            @if let Some(r) = &issue.repository {
                                " " span class="muted" { (r.full_name) }
                            }
                        }
                        td { (issue.state) }
                        td { (issue.comments) }
                    }
                }
            }
        }
    }
}

fn issue_href(issue: &Issue, repo: Option<&RepoRef>) -> Option<String> {
    match (repo, &issue.repository) {
        (Some(repo), _) => Some(issue_path(&repo.owner, &repo.repo, issue.number)),
        (None, Some(r)) => Some(issue_path(&r.owner.login, &r.name, issue.number)),
        (None, None) => None,
    }
}

async fn repo_issues_page(
    State(state): State<PageState>,
    jar: CookieJar,
    Path(repo): Path<RepoRef>,
    Query(params): Query<PageParams>,
) -> Response {
    let status = session_status(&state, &jar).await;
    if status.session().is_none() {
        return Redirect::to("/").into_response();
    }
    let toast = params.notice.map(Notice::toast);
    let modal = IssueModal::create(repo.clone());
    render_repo_issues(&state, &status, &repo, params.page(), &modal, toast.as_ref(), StatusCode::OK)
        .await
}

async fn render_repo_issues(
    state: &PageState,
    status: &SessionStatus,
    repo: &RepoRef,
    page: u32,
    modal: &IssueModal,
    toast: Option<&Toast>,
    status_code: StatusCode,
) -> Response {
    let Some(session) = status.session() else {
        return Redirect::to("/").into_response();
    };

    match state.api.list_issues(&session.access_token, repo, page).await {
        Ok(issues) => {
            let base = format!("/issues/{}/{}", repo.owner, repo.repo);
            let body = html! {
                main {
                    h1 { (repo.owner) "/" (repo.repo) }
                    (modal.render())
                    (issue_table(&issues, Some(repo)))
                    (pagination(&base, page, issues.len()))
                }
            };
            let title = format!("{}/{}", repo.owner, repo.repo);
            render(status_code, base_document(&title, status, toast, body))
        }
        Err(err) => error_page(status, &err),
    }
}

async fn issue_page(
    State(state): State<PageState>,
    jar: CookieJar,
    Path(params): Path<IssueParams>,
    Query(query): Query<PageParams>,
) -> Response {
    let status = session_status(&state, &jar).await;
    let toast = query.notice.map(Notice::toast);
    render_issue(&state, &status, &params, None, toast.as_ref(), StatusCode::OK).await
}

/// Fetch the issue and render it. `modal` is the dialog to embed; a fresh,
/// closed one pre-populated from the issue is used when `None`.
async fn render_issue(
    state: &PageState,
    status: &SessionStatus,
    params: &IssueParams,
    modal: Option<&IssueModal>,
    toast: Option<&Toast>,
    status_code: StatusCode,
) -> Response {
    let Some(session) = status.session() else {
        return Redirect::to("/").into_response();
    };

    let issue = match state.api.get_issue(&session.access_token, params).await {
        Ok(issue) => issue,
        Err(err) => return error_page(status, &err),
    };

    let fresh;
    let modal = match modal {
        Some(modal) => modal,
        None => {
            fresh = IssueModal::update(params.clone(), &issue.title, issue.body_markdown());
            &fresh
        }
    };

    let body = html! {
        main {
            p {
                a href=(format!("/issues/{}/{}", params.owner, params.repo)) {
                    "← " (params.owner) "/" (params.repo)
                }
            }
            article class="issue" {
                h1 { (issue.title) " " span class="muted" { "#" (issue.number) } }
                p class="muted" {
                    (issue.state) " · opened by " (issue.user.login)
                    " · " (issue.comments) " comments · "
                    a href=(issue.html_url) { "View on GitHub" }
                }
                div class="issue-body" {
                    (PreEscaped(markdown::to_html(issue.body_markdown())))
                }
            }
            (modal.render())
        }
    };
    render(status_code, base_document(&issue.title, status, toast, body))
}

fn outcome_status(outcome: SubmitOutcome) -> StatusCode {
    match outcome {
        SubmitOutcome::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitOutcome::Saved | SubmitOutcome::Unacknowledged(_) | SubmitOutcome::Failed => {
            StatusCode::OK
        }
    }
}

async fn update_issue(
    State(state): State<PageState>,
    jar: CookieJar,
    Path(params): Path<IssueParams>,
    Form(form): Form<IssueForm>,
) -> Response {
    let status = session_status(&state, &jar).await;
    let Some(session) = status.session() else {
        return Redirect::to("/").into_response();
    };

    let mut modal = IssueModal::update(params.clone(), &form.title, "");
    modal.edit(form);
    modal.open();

    let mut refreshed = false;
    let outcome = modal
        .submit(state.api.as_ref(), session, || refreshed = true)
        .await;
    debug!(?outcome, "update form submitted");

    if refreshed {
        let path = issue_path(&params.owner, &params.repo, params.number);
        return Redirect::to(&format!("{path}?notice=updated")).into_response();
    }
    render_issue(
        &state,
        &status,
        &params,
        Some(&modal),
        modal.toast(),
        outcome_status(outcome),
    )
    .await
}

async fn create_issue(
    State(state): State<PageState>,
    jar: CookieJar,
    Path(repo): Path<RepoRef>,
    Form(form): Form<IssueForm>,
) -> Response {
    let status = session_status(&state, &jar).await;
    let Some(session) = status.session() else {
        return Redirect::to("/").into_response();
    };

    let mut modal = IssueModal::create(repo.clone());
    modal.edit(form);
    modal.open();

    let mut refreshed = false;
    let outcome = modal
        .submit(state.api.as_ref(), session, || refreshed = true)
        .await;
    debug!(?outcome, "create form submitted");

    if refreshed {
        let path = format!("/issues/{}/{}", repo.owner, repo.repo);
        return Redirect::to(&format!("{path}?notice=created")).into_response();
    }
    render_repo_issues(
        &state,
        &status,
        &repo,
        1,
        &modal,
        modal.toast(),
        outcome_status(outcome),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::testing::{test_session, FakeApi, Reply};
    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn app(reply: Reply) -> (Router, Arc<FakeApi>) {
        let sessions = SessionStore::new();
        sessions.activate("sid", test_session()).await;
        let api = Arc::new(FakeApi::new(reply));
        let state = PageState {
            sessions,
            api: api.clone(),
        };
        (router(state), api)
    }

    fn page_request(uri: &str, signed_in: bool) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if signed_in {
            builder = builder.header(COOKIE, format!("{SESSION_COOKIE}=sid"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(COOKIE, format!("{SESSION_COOKIE}=sid"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    const VALID_FORM: &str =
        "title=Renamed&body=%3Cp%3EThis+body+is+comfortably+longer+than+thirty%3C%2Fp%3E";

    #[tokio::test]
    async fn test_home_signed_out() {
        let (app, _) = app(Reply::Status(200)).await;
        let response = app.oneshot(page_request("/", false)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = text(response).await;
        assert!(html.contains("Please Login First"));
        assert!(html.contains(">Login<"));
    }

    #[tokio::test]
    async fn test_home_signed_in() {
        let (app, _) = app(Reply::Status(200)).await;
        let html = text(app.oneshot(page_request("/", true)).await.unwrap()).await;
        assert!(html.contains("Welcome! The Octocat"));
        assert!(html.contains(">Logout<"));
    }

    #[tokio::test]
    async fn test_pages_redirect_when_signed_out() {
        for uri in ["/repos", "/issues", "/issues/octocat/hello-world", "/issues/octocat/hello-world/1"] {
            let (app, _) = app(Reply::Status(200)).await;
            let response = app.oneshot(page_request(uri, false)).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
        }
    }

    #[tokio::test]
    async fn test_repo_issue_list() {
        let (app, _) = app(Reply::Status(200)).await;
        let response = app
            .oneshot(page_request("/issues/octocat/hello-world?page=2&notice=created", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = text(response).await;
        assert!(html.contains(r#"href="/issues/octocat/hello-world/1""#));
        assert!(html.contains("Page 2"));
        assert!(html.contains(r#"href="/issues/octocat/hello-world?page=1""#));
        assert!(html.contains("Create successfully"));
        assert!(html.contains(r#"<dialog id="create-issue">"#));
    }

    #[tokio::test]
    async fn test_repos_and_user_issues_link_to_issue_pages() {
        let (app, _) = app(Reply::Status(200)).await;
        let html = text(app.clone().oneshot(page_request("/repos", true)).await.unwrap()).await;
        assert!(html.contains(r#"href="/issues/octocat/hello-world""#));
        assert!(html.contains("My first repository"));

        let html = text(app.oneshot(page_request("/issues", true)).await.unwrap()).await;
        assert!(html.contains(r#"href="/issues/octocat/hello-world/5""#));
    }

    #[tokio::test]
    async fn test_issue_page_renders_body_and_prefilled_modal() {
        let (app, _) = app(Reply::Status(200)).await;
        let html = text(
            app.oneshot(page_request("/issues/octocat/hello-world/9", true))
                .await
                .unwrap(),
        )
        .await;
        assert!(html.contains("<strong>crashes</strong>"));
        assert!(html.contains(r#"<dialog id="update-issue">"#));
        assert!(html.contains(r#"value="Found a bug""#));
    }

    #[tokio::test]
    async fn test_update_success_redirects_to_refreshed_issue() {
        let (app, api) = app(Reply::Status(200)).await;
        let response = app
            .oneshot(post_form("/issues/octocat/hello-world/9", VALID_FORM))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/issues/octocat/hello-world/9?notice=updated"
        );

        let sent = api.updates();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Renamed");
        assert_eq!(sent[0].body, "This body is comfortably longer than thirty");
    }

    #[tokio::test]
    async fn test_update_failure_keeps_modal_open() {
        let (app, api) = app(Reply::Fail(422)).await;
        let response = app
            .oneshot(post_form("/issues/octocat/hello-world/9", VALID_FORM))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = text(response).await;
        assert!(html.contains("Something error"));
        assert!(html.contains(r#"<dialog id="update-issue" open"#));
        assert!(html.contains(r#"value="Renamed""#));
        assert_eq!(api.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_update_is_not_sent() {
        let (app, api) = app(Reply::Status(200)).await;
        let response = app
            .oneshot(post_form("/issues/octocat/hello-world/9", "title=&body=short"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = text(response).await;
        assert!(html.contains("Title is required."));
        assert!(html.contains("Body must be at least 30 characters."));
        assert!(api.updates().is_empty());
    }

    #[tokio::test]
    async fn test_create_success_redirects_to_list() {
        let (app, api) = app(Reply::Status(201)).await;
        let response = app
            .oneshot(post_form("/issues/octocat/hello-world", VALID_FORM))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/issues/octocat/hello-world?notice=created"
        );
        assert_eq!(api.creates().len(), 1);
    }
}
