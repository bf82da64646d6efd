//! LearnEase · Study Material Backend
//!
//! - Axum HTTP API: PDF summaries and multiple-choice question generation
//! - Optional OpenAI integration (via environment variables), offline model otherwise
//! - Embedded distractor bank (./assets/distractors.toml), replaceable at startup
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   OPENAI_API_KEY        : enables OpenAI integration if present
//!   OPENAI_BASE_URL       : default "https://api.openai.com/v1"
//!   OPENAI_MODEL          : default "gpt-4o-mini"
//!   LEARNEASE_CONFIG_PATH : path to TOML config (prompts + pipeline settings)
//!   DISTRACTOR_BANK_PATH  : path to a replacement distractor bank (TOML)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod answer;
mod config;
mod distractors;
mod domain;
mod error;
mod format;
mod logic;
mod model;
mod openai;
mod parser;
mod pdf;
mod pipeline;
mod protocol;
mod routes;
mod state;
mod summary;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (model collaborators, distractor bank, prompts).
  let state = Arc::new(AppState::from_env()?);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "learnease_backend", %addr, model = %state.model.name(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "learnease_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "learnease_backend", error = %e, "Failed to listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
  info!(target: "learnease_backend", "Shutdown signal received");
}
