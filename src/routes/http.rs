//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs basic request and result info.

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, Multipart, State},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::logic::{generate_mcqs, summarize_pdf};
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body))]
pub async fn http_generate_mcqs(
  State(state): State<Arc<AppState>>,
  body: Result<Json<GenerateMcqsIn>, JsonRejection>,
) -> Result<Json<GenerateMcqsOut>, AppError> {
  let Json(body) = body.map_err(|e| AppError::Validation(e.body_text()))?;
  let mcqs = generate_mcqs(&state, &body.paragraph, body.num_questions).await?;
  info!(target: "mcq", requested = body.num_questions, delivered = mcqs.len(), "HTTP generate_mcqs served");
  Ok(Json(GenerateMcqsOut { mcqs }))
}

#[instrument(level = "info", skip(state, multipart))]
pub async fn http_upload_pdf(
  State(state): State<Arc<AppState>>,
  mut multipart: Multipart,
) -> Result<Json<SummaryOut>, AppError> {
  let mut file = None;
  while let Some(field) = multipart.next_field().await.map_err(|e| AppError::Upload(e.body_text()))? {
    if field.name() == Some("file") {
      let filename = field.file_name().unwrap_or_default().to_string();
      let bytes = field.bytes().await.map_err(|e| AppError::Upload(e.body_text()))?;
      info!(target: "summary", %filename, bytes = bytes.len(), "HTTP upload received");
      file = Some(bytes.to_vec());
      break;
    }
  }
  let bytes = file.ok_or_else(|| AppError::Upload("missing 'file' field".into()))?;
  let summary = summarize_pdf(&state, bytes).await?;
  info!(target: "summary", summary_len = summary.len(), "HTTP upload_pdf served");
  Ok(Json(SummaryOut { summary }))
}

#[cfg(test)]
mod tests {
  use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
  };
  use tower::ServiceExt;

  use super::*;
  use crate::config::{PipelineSettings, Prompts};
  use crate::distractors::DistractorBank;
  use crate::model::testing::{EchoSummarizer, ScriptedModel};
  use crate::routes::build_router;

  fn app(model: ScriptedModel) -> Router {
    let state = AppState::with_parts(
      Arc::new(model),
      Arc::new(EchoSummarizer::default()),
      Arc::new(DistractorBank::builtin().unwrap()),
      Prompts::default(),
      PipelineSettings::default(),
    );
    build_router(Arc::new(state))
  }

  async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
      .method("POST")
      .uri(uri)
      .header(CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
  }

  fn multipart_post(field: &str, filename: &str, content: &str) -> Request<Body> {
    let body = format!(
      "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n--XBOUNDARY--\r\n"
    );
    Request::builder()
      .method("POST")
      .uri("/upload_pdf/")
      .header(CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
      .body(Body::from(body))
      .unwrap()
  }

  #[tokio::test]
  async fn health_reports_ok() {
    let req = Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap();
    let (status, json) = send(app(ScriptedModel::default()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
  }

  #[tokio::test]
  async fn generate_mcqs_returns_four_option_questions() {
    let model = ScriptedModel::new(&["What drives the water cycle?|||the sun|||moon|||gravity"], &[]);
    let req = json_post("/generate_mcqs/", r#"{"paragraph":"The sun drives the water cycle.","num_questions":1}"#);
    let (status, json) = send(app(model), req).await;
    assert_eq!(status, StatusCode::OK);
    let mcqs = json["mcqs"].as_array().unwrap();
    assert_eq!(mcqs.len(), 1);
    assert_eq!(mcqs[0]["question"], "What drives the water cycle?");
    assert_eq!(mcqs[0]["correct_answer"], "the sun");
    assert_eq!(mcqs[0]["options"].as_array().unwrap().len(), 4);
  }

  #[tokio::test]
  async fn malformed_json_yields_error_body() {
    let req = json_post("/generate_mcqs/", r#"{"num_questions":2}"#);
    let (status, json) = send(app(ScriptedModel::default()), req).await;
    assert!(status.is_client_error());
    assert!(json["error"].as_str().unwrap().starts_with("Invalid request"));
  }

  #[tokio::test]
  async fn model_failure_yields_error_body() {
    let req = json_post("/generate_mcqs/", r#"{"paragraph":"Rain falls."}"#);
    let (status, json) = send(app(ScriptedModel::failing()), req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().starts_with("Failed to generate MCQs"));
  }

  #[tokio::test]
  async fn upload_rejects_non_pdf_files() {
    let req = multipart_post("file", "notes.txt", "just some text");
    let (status, json) = send(app(ScriptedModel::default()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid upload: file is not a PDF");
  }

  #[tokio::test]
  async fn upload_requires_a_file_field() {
    let req = multipart_post("document", "notes.pdf", "%PDF-1.4");
    let (status, json) = send(app(ScriptedModel::default()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid upload: missing 'file' field");
  }
}
