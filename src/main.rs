mod config;
mod github;
mod markdown;
mod proxy;
mod server;
mod session;
mod ui;

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// issue-desk: web dashboard for browsing and editing GitHub issues.
/// Signs users in with GitHub OAuth and proxies the issue API for them.
#[derive(Parser, Debug)]
#[command(name = "issue-desk", version, about)]
struct Cli {
    /// Config file path (defaults to .issue-desk.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config file (e.g., 0.0.0.0:8080)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    server::serve(&config).await?;
    Ok(())
}
