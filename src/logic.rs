//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - MCQ generation: two batch passes sharing one per-request seen set, each
//!     rendered question re-validated through the block parsers
//!   - PDF summarization: text extraction then chunked summarization

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::parser::{parse_block_with_fallback, LetteredBlockParser, ParsedBlock};
use crate::pdf::extract_text_blocking;
use crate::pipeline::{McqPipeline, SeenSet};
use crate::protocol::McqOut;
use crate::state::AppState;
use crate::summary::hierarchical_summary;

#[instrument(level = "info", skip(state, paragraph), fields(paragraph_len = paragraph.len(), request_id = %Uuid::new_v4()))]
pub async fn generate_mcqs(state: &AppState, paragraph: &str, num_questions: i64) -> Result<Vec<McqOut>, AppError> {
  if paragraph.trim().is_empty() {
    return Err(AppError::Validation("paragraph must not be empty".into()));
  }
  let max = state.settings.max_questions;
  let n = usize::try_from(num_questions)
    .ok()
    .filter(|n| *n <= max)
    .ok_or_else(|| AppError::Validation(format!("num_questions must be between 0 and {max}")))?;
  if n == 0 {
    return Ok(Vec::new());
  }

  let mut rng = StdRng::from_entropy();
  let mut seen = SeenSet::new(state.settings.answer_similarity);
  let pipeline = McqPipeline {
    model: state.model.as_ref(),
    prompts: &state.prompts,
    bank: &state.bank,
    settings: &state.settings,
  };

  // Pass 1: over-generate, keep what survives the block round trip.
  let report = pipeline.generate_batch(paragraph, n * 2, &mut seen, &mut rng).await?;
  let mut out: Vec<McqOut> = report
    .mcqs
    .iter()
    .filter_map(|mcq| parse_block_with_fallback(&mcq.render()))
    .filter_map(usable)
    .collect();
  info!(target: "mcq", pass = 1, produced = report.mcqs.len(), kept = out.len(), "MCQ pass finished");

  // Pass 2: top up the deficit, lenient parsing only.
  if out.len() < n {
    let deficit = n - out.len();
    let lenient = LetteredBlockParser::lenient();
    let report = pipeline.generate_batch(paragraph, deficit * 3, &mut seen, &mut rng).await?;
    let before = out.len();
    out.extend(
      report
        .mcqs
        .iter()
        .filter_map(|mcq| lenient.parse_block(&mcq.render()))
        .filter_map(usable),
    );
    info!(target: "mcq", pass = 2, produced = report.mcqs.len(), kept = out.len() - before, "MCQ pass finished");
  }

  if out.len() < n {
    warn!(target: "mcq", requested = n, delivered = out.len(), seen = seen.len(), "Returning fewer MCQs than requested");
  }
  out.truncate(n);
  Ok(out)
}

fn usable(block: ParsedBlock) -> Option<McqOut> {
  (block.options.len() >= 4).then(|| McqOut::from(block))
}

#[instrument(level = "info", skip(state, bytes), fields(bytes = bytes.len(), request_id = %Uuid::new_v4()))]
pub async fn summarize_pdf(state: &AppState, bytes: Vec<u8>) -> Result<String, AppError> {
  let text = extract_text_blocking(bytes).await?;
  summarize_text(state, &text).await
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn summarize_text(state: &AppState, text: &str) -> Result<String, AppError> {
  if text.trim().is_empty() {
    return Err(AppError::NoText);
  }
  hierarchical_summary(
    state.summarizer.as_ref(),
    &state.prompts,
    text,
    state.settings.chunk_chars,
    state.settings.model_timeout(),
  )
  .await
  .map_err(|e| AppError::Pdf(e.to_string()))
}
