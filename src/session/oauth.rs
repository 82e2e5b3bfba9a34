use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Session, SessionStore, SESSION_COOKIE, SIGN_IN_PATH, SIGN_OUT_PATH};
use crate::github::{GitHubClient, GitHubError};

const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const CALLBACK_PATH: &str = "/auth/callback/github";

/// Scopes needed to read private repositories and edit their issues.
const SCOPES: &[&str] = &["repo", "read:user"];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("GitHub sign-in is not configured")]
    NotConfigured,

    #[error("Failed to create OAuth client: {0}")]
    ClientCreation(String),

    #[error("GitHub denied the sign-in: {0}")]
    Denied(String),

    #[error("No sign-in in progress for this browser")]
    NoPendingSignIn,

    #[error("Sign-in state does not match")]
    StateMismatch,

    #[error("Callback is missing the authorization code")]
    MissingCode,

    #[error("Failed to exchange token: {0}")]
    TokenExchange(String),

    #[error("Failed to fetch GitHub profile: {0}")]
    Profile(#[from] GitHubError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::ClientCreation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Denied(_)
            | AuthError::NoPendingSignIn
            | AuthError::StateMismatch
            | AuthError::MissingCode => StatusCode::BAD_REQUEST,
            AuthError::TokenExchange(_) | AuthError::Profile(_) => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}

/// OAuth authorization-code client for a GitHub OAuth app.
#[derive(Debug, Clone)]
pub struct GitHubOAuth {
    client: BasicClient,
}

impl GitHubOAuth {
    pub fn new(client_id: &str, client_secret: &str, redirect_url: &str) -> Result<Self, AuthError> {
        Self::with_endpoints(
            client_id,
            client_secret,
            redirect_url,
            GITHUB_AUTH_URL,
            GITHUB_TOKEN_URL,
        )
    }

    pub fn with_endpoints(
        client_id: &str,
        client_secret: &str,
        redirect_url: &str,
        auth_url: &str,
        token_url: &str,
    ) -> Result<Self, AuthError> {
        let client = BasicClient::new(
            ClientId::new(client_id.to_string()),
            Some(ClientSecret::new(client_secret.to_string())),
            AuthUrl::new(auth_url.to_string())
                .map_err(|e| AuthError::ClientCreation(e.to_string()))?,
            Some(
                TokenUrl::new(token_url.to_string())
                    .map_err(|e| AuthError::ClientCreation(e.to_string()))?,
            ),
        )
        .set_redirect_uri(
            RedirectUrl::new(redirect_url.to_string())
                .map_err(|e| AuthError::ClientCreation(e.to_string()))?,
        );

        Ok(Self { client })
    }

    pub fn authorize_url(&self) -> (String, CsrfToken) {
        let mut request = self.client.authorize_url(CsrfToken::new_random);
        for scope in SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let (url, csrf_token) = request.url();
        (url.to_string(), csrf_token)
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: String) -> Result<String, AuthError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        Ok(token.access_token().secret().clone())
    }
}

/// State shared by the sign-in, callback and sign-out routes.
#[derive(Debug, Clone)]
pub struct SessionRoutes {
    pub sessions: SessionStore,
    /// `None` when no OAuth app credentials are configured.
    pub oauth: Option<Arc<GitHubOAuth>>,
    pub github: Arc<GitHubClient>,
}

pub fn router(state: SessionRoutes) -> Router {
    Router::new()
        .route(SIGN_IN_PATH, get(sign_in))
        .route(CALLBACK_PATH, get(callback))
        .route(SIGN_OUT_PATH, post(sign_out))
        .with_state(state)
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

async fn sign_in(State(routes): State<SessionRoutes>, jar: CookieJar) -> Response {
    let Some(oauth) = routes.oauth.as_ref() else {
        return AuthError::NotConfigured.into_response();
    };

    // Always mint a fresh id. The one the browser presented is dropped.
    if let Some(previous) = jar.get(SESSION_COOKIE) {
        routes.sessions.sign_out(previous.value()).await;
    }
    let id = Uuid::new_v4().to_string();

    let (url, csrf_token) = oauth.authorize_url();
    routes
        .sessions
        .begin_sign_in(&id, csrf_token.secret().clone())
        .await;
    info!("redirecting to GitHub for sign-in");

    (jar.add(session_cookie(id)), Redirect::to(&url)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn callback(
    State(routes): State<SessionRoutes>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        return AuthError::NoPendingSignIn.into_response();
    };

    match complete_sign_in(&routes, &id, params).await {
        Ok(session) => {
            info!(login = %session.user.login, "signed in");
            routes.sessions.activate(&id, session).await;
            Redirect::to("/").into_response()
        }
        Err(err) => {
            warn!(error = %err, "sign-in failed");
            err.into_response()
        }
    }
}

async fn complete_sign_in(
    routes: &SessionRoutes,
    id: &str,
    params: CallbackParams,
) -> Result<Session, AuthError> {
    let oauth = routes.oauth.as_ref().ok_or(AuthError::NotConfigured)?;
    let expected_state = routes
        .sessions
        .take_pending(id)
        .await
        .ok_or(AuthError::NoPendingSignIn)?;

    if let Some(error) = params.error {
        return Err(AuthError::Denied(error));
    }
    if params.state.as_deref() != Some(expected_state.as_str()) {
        return Err(AuthError::StateMismatch);
    }
    let code = params.code.ok_or(AuthError::MissingCode)?;

    let token = oauth.exchange_code(code).await?;
    let user = routes.github.current_user(&token).await?;
    Ok(Session::new(user, token))
}

async fn sign_out(State(routes): State<SessionRoutes>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        routes.sessions.sign_out(cookie.value()).await;
        info!("signed out");
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/"),
    )
        .into_response()
}
