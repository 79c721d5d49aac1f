//! Application setup and runtime.

pub mod config;

use crate::http;
use config::Config;
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn};

/// Default target of `mailrelay --healthcheck`.
pub const DEFAULT_HEALTH_URL: &str = "http://localhost:5000/health";

/// Shared application state.
#[derive(Clone, Default)]
pub struct AppState {
  /// `None` when the required environment is incomplete.
  pub config: Option<Arc<Config>>,
}

impl AppState {
  pub fn new(config: Option<Config>) -> Self {
    AppState {
      config: config.map(Arc::new),
    }
  }
}

/// Start the HTTP server with configuration from the environment.
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  crate::util::init_tracing();

  let config = Config::from_env();
  match &config {
    Some(cfg) => info!(
      "upstream smtp:        smtps://{}:{} as {}",
      cfg.smtp.host, cfg.smtp.port, cfg.smtp.username
    ),
    None => warn!("environment incomplete; every request will fail until it is set up"),
  }

  let state = AppState::new(config);
  let app = http::build_router(state);

  let addr: SocketAddr = std::env::var("RELAY_ADDR")
    .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
    .parse()?;

  info!("send endpoint:        POST http://{}/sendmail", addr);
  info!("dry-run endpoint:     POST http://{}/sendmail_dryrun", addr);
  info!("health endpoint:      GET  http://{}/health", addr);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;
  Ok(())
}

/// Liveness poller: healthy iff `url` answers 200.
pub async fn healthcheck(url: &str) -> bool {
  match reqwest::get(url).await {
    Ok(res) => res.status() == reqwest::StatusCode::OK,
    Err(_) => false,
  }
}
