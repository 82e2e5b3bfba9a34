pub mod oauth;

pub use oauth::{router, AuthError, GitHubOAuth, SessionRoutes};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::github::GitHubUser;

pub const SESSION_COOKIE: &str = "issue_desk_session";
pub const SIGN_IN_PATH: &str = "/auth/signin/github";
pub const SIGN_OUT_PATH: &str = "/auth/signout";

/// How long a signed-in session stays valid.
pub const SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

/// How long a started sign-in may wait for its OAuth callback.
pub const SIGN_IN_TTL: Duration = Duration::from_secs(10 * 60);

/// Identity and token of a signed-in user.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: GitHubUser,
    pub access_token: String,
    pub expires_at: Instant,
}

impl Session {
    pub fn new(user: GitHubUser, access_token: String) -> Self {
        Self {
            user,
            access_token,
            expires_at: Instant::now() + SESSION_TTL,
        }
    }

    /// Display name, falling back to the login.
    pub fn display_name(&self) -> &str {
        self.user.name.as_deref().unwrap_or(&self.user.login)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// What the pages know about the browser's session.
#[derive(Debug, Clone)]
pub enum SessionStatus {
    /// A sign-in was started and its callback has not arrived yet.
    Loading,
    Authenticated(Session),
    Unauthenticated,
}

impl SessionStatus {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionStatus::Authenticated(session) => Some(session),
            SessionStatus::Loading | SessionStatus::Unauthenticated => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Pending { csrf_state: String, started: Instant },
    Active(Session),
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        match self {
            Entry::Pending { started, .. } => now.duration_since(*started) >= SIGN_IN_TTL,
            Entry::Active(session) => session.is_expired(now),
        }
    }
}

/// Drop every expired entry. Runs under the write lock on each insert so
/// abandoned sign-ins do not accumulate.
fn prune(entries: &mut HashMap<String, Entry>, now: Instant) {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    let dropped = before - entries.len();
    if dropped > 0 {
        debug!(dropped, "pruned expired session entries");
    }
}

/// In-memory session table keyed by the session cookie. Created once at
/// startup and handed to every handler through router state.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the status for a cookie value. Expired entries are dropped.
    pub async fn status(&self, id: Option<&str>) -> SessionStatus {
        let Some(id) = id else {
            return SessionStatus::Unauthenticated;
        };
        let now = Instant::now();

        let entry = self.entries.read().await.get(id).cloned();
        match entry {
            Some(entry) if !entry.is_expired(now) => match entry {
                Entry::Active(session) => SessionStatus::Authenticated(session),
                Entry::Pending { .. } => SessionStatus::Loading,
            },
            Some(_) => {
                debug!("dropping expired session entry");
                self.entries.write().await.remove(id);
                SessionStatus::Unauthenticated
            }
            None => SessionStatus::Unauthenticated,
        }
    }

    /// Record a started sign-in. Replaces whatever the cookie held before.
    pub async fn begin_sign_in(&self, id: &str, csrf_state: String) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        prune(&mut entries, now);
        entries.insert(
            id.to_string(),
            Entry::Pending {
                csrf_state,
                started: now,
            },
        );
    }

    /// Take the CSRF state of a pending sign-in. The pending entry is
    /// consumed, so a callback can be used once.
    pub async fn take_pending(&self, id: &str) -> Option<String> {
        let mut entries = self.entries.write().await;
        if !matches!(entries.get(id), Some(Entry::Pending { .. })) {
            return None;
        }
        match entries.remove(id) {
            Some(Entry::Pending { csrf_state, .. }) => Some(csrf_state),
            _ => None,
        }
    }

    pub async fn activate(&self, id: &str, session: Session) {
        let mut entries = self.entries.write().await;
        prune(&mut entries, Instant::now());
        entries.insert(id.to_string(), Entry::Active(session));
    }

    pub async fn sign_out(&self, id: &str) {
        self.entries.write().await.remove(id);
    }
}
