use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".issue-desk.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .issue-desk.toml.
/// All fields are optional so the server starts with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub github: GitHubConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Base URL browsers use to reach this server; the OAuth redirect is built from it
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: default_public_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// REST API root. Overridden in tests to point at a mock server.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// OAuth app client id. Falls back to GITHUB_CLIENT_ID.
    pub client_id: Option<String>,

    /// OAuth app client secret. Falls back to GITHUB_CLIENT_SECRET.
    pub client_secret: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            client_id: None,
            client_secret: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_public_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from `path`, or from .issue-desk.toml in the
    /// current directory. A missing default file yields the default config;
    /// an explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)?
                } else {
                    Config::default()
                }
            }
        };

        if config.github.client_id.is_none() {
            config.github.client_id = std::env::var("GITHUB_CLIENT_ID").ok();
        }
        if config.github.client_secret.is_none() {
            config.github.client_secret = std::env::var("GITHUB_CLIENT_SECRET").ok();
        }

        Ok(config)
    }

    /// Load from a specific path without env overrides.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// OAuth redirect target registered with the GitHub app.
    pub fn oauth_redirect_url(&self) -> String {
        format!(
            "{}/auth/callback/github",
            self.server.public_url.trim_end_matches('/')
        )
    }
}
