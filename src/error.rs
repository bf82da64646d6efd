//! Error types shared by the model clients, configuration loading and HTTP layer.
//!
//! Per-candidate problems inside the MCQ pipeline are never errors (they are
//! skipped); only failures that abort a whole request end up here.

use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

use crate::protocol::ErrorOut;

/// Failures of a language-model collaborator (remote or local).
#[derive(Debug, Clone, Error)]
pub enum ModelError {
  #[error("model transport error: {0}")]
  Transport(String),

  #[error("model HTTP {status}: {message}")]
  Status { status: u16, message: String },

  #[error("model response could not be decoded: {0}")]
  Decode(String),

  #[error("model call timed out after {0:?}")]
  Timeout(Duration),
}

impl From<reqwest::Error> for ModelError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      ModelError::Transport(format!("request timed out: {err}"))
    } else if err.is_decode() {
      ModelError::Decode(err.to_string())
    } else {
      ModelError::Transport(err.to_string())
    }
  }
}

/// Failures while loading startup resources.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse distractor bank: {0}")]
  Bank(#[from] toml::de::Error),
}

/// Request-level failures surfaced to clients as `{ "error": <message> }`.
#[derive(Debug, Error)]
pub enum AppError {
  #[error("Invalid request: {0}")]
  Validation(String),

  #[error("Failed to generate MCQs: {0}")]
  Model(#[from] ModelError),

  #[error("Failed to process PDF: {0}")]
  Pdf(String),

  #[error("Invalid upload: {0}")]
  Upload(String),

  #[error("No text found in PDF")]
  NoText,
}

impl AppError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::Upload(_) => StatusCode::BAD_REQUEST,
      AppError::NoText => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::Model(ModelError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
      AppError::Model(_) => StatusCode::BAD_GATEWAY,
      AppError::Pdf(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> axum::response::Response {
    (self.status_code(), Json(ErrorOut { error: self.to_string() })).into_response()
  }
}
