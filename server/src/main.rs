use anyhow::Context;
use listenfd::ListenFd;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod control;
mod database;
mod rooms;
mod search;
mod socket;
mod upstream;

#[derive(StructOpt, Debug)]
#[structopt(name = "jamroom", about = "Shared listening rooms with track search")]
struct Opt {
    /// RON config file; built-in defaults when it does not exist
    #[structopt(long, parse(from_os_str), default_value = "jamroom.ron")]
    config: PathBuf,

    #[structopt(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    spotify_client_id: Option<String>,

    #[structopt(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    spotify_client_secret: Option<String>,
}

async fn listener(config: &config::Config) -> anyhow::Result<TcpListener> {
    let mut fds = ListenFd::from_env();
    if let Some(listener) = fds
        .take_tcp_listener(0)
        .context("LISTEN_FD must be a TCP socket")?
    {
        listener.set_nonblocking(true)?;
        return Ok(TcpListener::from_std(listener)?);
    }
    TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("cannot listen on {}", config.listen))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opt = Opt::from_args();
    let config = config::Config::load_or_default(&opt.config)
        .with_context(|| format!("loading config {}", opt.config.display()))?;

    let credentials = match (opt.spotify_client_id, opt.spotify_client_secret) {
        (Some(client_id), Some(client_secret)) => Some(upstream::Credentials {
            client_id,
            client_secret,
        }),
        _ => {
            warn!(message = "search API credentials not set, searches will fail");
            None
        }
    };
    let db = database::TokenDb::open(&config.database)
        .with_context(|| format!("opening database {}", config.database.display()))?;
    let upstream = upstream::Upstream::new(
        reqwest::Client::new(),
        credentials,
        db,
        config.token_url.clone(),
        config.search_url.clone(),
    );
    let state = Arc::new(app::AppState::new(upstream));
    let router = app::router(state, config.static_dir.as_deref());

    let listener = listener(&config).await?;
    info!(message = "listening", addr = %listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
