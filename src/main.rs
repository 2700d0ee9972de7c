//! Quizbank · Question Bank & Quiz Backend
//!
//! - Axum HTTP + WebSocket API over a JSON-file question bank
//! - Standard (filtered) and adaptive (weak-areas-first) quiz modes
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   QUIZBANK_CONFIG_PATH : path to TOML config (data dir, quiz defaults)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod store;
mod pool;
mod session;
mod state;
mod protocol;
mod logic;
mod transfer;
mod attach;
mod routes;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (JSON-backed stores, idle quiz session).
  let state = AppState::new()?;

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizbank_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
