use axum::Router;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::github::{GitHubClient, GitHubError};
use crate::proxy;
use crate::session::{self, AuthError, GitHubOAuth, SessionRoutes, SessionStore};
use crate::ui::{self, ApiError, PageState, ProxyClient};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to build GitHub client: {0}")]
    GitHub(#[from] GitHubError),

    #[error("Failed to build OAuth client: {0}")]
    OAuth(#[from] AuthError),

    #[error("Failed to build proxy client: {0}")]
    Proxy(#[from] ApiError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Assemble the proxy, sign-in and page routers into one application.
/// `proxy_url` is where the page handlers reach this server's own
/// `/api/github` routes.
pub fn build_app(config: &Config, proxy_url: &str) -> Result<Router, ServerError> {
    build_app_with_sessions(config, proxy_url, SessionStore::new())
}

fn build_app_with_sessions(
    config: &Config,
    proxy_url: &str,
    sessions: SessionStore,
) -> Result<Router, ServerError> {
    let timeout = Duration::from_secs(config.github.timeout_secs);
    let github = Arc::new(GitHubClient::new(&config.github.api_url, timeout)?);

    let oauth = match (&config.github.client_id, &config.github.client_secret) {
        (Some(id), Some(secret)) => Some(Arc::new(GitHubOAuth::new(
            id,
            secret,
            &config.oauth_redirect_url(),
        )?)),
        _ => {
            warn!("GITHUB_CLIENT_ID / GITHUB_CLIENT_SECRET not set; sign-in is disabled");
            None
        }
    };

    let api = ProxyClient::new(proxy_url, timeout)?;

    let app = Router::new()
        .merge(proxy::router(github.clone()))
        .merge(session::router(SessionRoutes {
            sessions: sessions.clone(),
            oauth,
            github,
        }))
        .merge(ui::router(PageState {
            sessions,
            api: Arc::new(api),
        }))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &Config) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    let addr = listener.local_addr()?;
    let proxy_url = loopback_url(addr);
    let app = build_app(config, &proxy_url)?;
    info!(%addr, %proxy_url, public_url = %config.server.public_url, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Base URL for reaching the listener from inside the process. A wildcard
/// bind is reached through the matching loopback address.
fn loopback_url(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}", SocketAddr::new(ip, addr.port()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
    }
}
