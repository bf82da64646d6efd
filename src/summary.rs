//! Chunked hierarchical summarization of extracted document text.
//!
//! Text is cut into sentence-aligned chunks, each chunk is summarized with a
//! length budget derived from its word count, and the chunk summaries are
//! joined in order.

use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::error::ModelError;
use crate::model::Summarizer;

/// Word budget for one chunk summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SummaryLimits {
  pub max_words: usize,
  pub min_words: usize,
}

impl SummaryLimits {
  pub fn for_chunk(chunk: &str) -> Self {
    let words = chunk.split_whitespace().count();
    let mut max_words = (words / 2 + 50).min(300).min(500);
    if words < 10 {
      max_words = words.min(50);
    }
    Self { max_words, min_words: max_words.min(50) }
  }
}

/// Cut `text` into chunks of at most `chunk_chars` characters, preferring to
/// end each chunk on the last `.` inside the window.
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
  let chunk_chars = chunk_chars.max(1);
  let mut chunks = Vec::new();
  let mut rest = text;
  loop {
    let Some((window_end, _)) = rest.char_indices().nth(chunk_chars) else {
      break;
    };
    let cut = rest[..window_end].rfind('.').map(|i| i + 1).unwrap_or(window_end);
    chunks.push(rest[..cut].to_string());
    rest = rest[cut..].trim();
  }
  if !rest.is_empty() {
    chunks.push(rest.to_string());
  }
  chunks
}

/// Summarize every chunk and join the results. Chunks that fail are logged
/// and skipped; an error is returned only when every chunk failed.
#[instrument(level = "info", skip(summarizer, prompts, text), fields(summarizer = %summarizer.name(), text_len = text.len()))]
pub async fn hierarchical_summary(
  summarizer: &dyn Summarizer,
  prompts: &Prompts,
  text: &str,
  chunk_chars: usize,
  timeout: Duration,
) -> Result<String, ModelError> {
  let chunks: Vec<String> = chunk_text(text, chunk_chars)
    .into_iter()
    .filter(|c| !c.trim().is_empty())
    .collect();
  let start = Instant::now();
  let mut summaries = Vec::with_capacity(chunks.len());
  let mut last_error = None;

  for (i, chunk) in chunks.iter().enumerate() {
    let limits = SummaryLimits::for_chunk(chunk);
    let call = summarizer.summarize_chunk(prompts, chunk, limits);
    let result = match tokio::time::timeout(timeout, call).await {
      Ok(r) => r,
      Err(_) => Err(ModelError::Timeout(timeout)),
    };
    match result {
      Ok(s) if !s.trim().is_empty() => summaries.push(s.trim().to_string()),
      Ok(_) => warn!(target: "summary", chunk = i + 1, "Empty chunk summary; skipping"),
      Err(e) => {
        error!(target: "summary", chunk = i + 1, error = %e, "Error summarizing chunk; skipping");
        last_error = Some(e);
      }
    }
  }

  info!(target: "summary", chunks = chunks.len(), summarized = summaries.len(), elapsed = ?start.elapsed(), "Summary assembled");
  match last_error {
    Some(e) if summaries.is_empty() => Err(e),
    _ => Ok(summaries.join(" ")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::testing::EchoSummarizer;

  #[test]
  fn chunks_end_on_sentence_boundaries() {
    let text = "One two. Three four. Five six seven.";
    let chunks = chunk_text(text, 15);
    assert_eq!(chunks, vec!["One two.", "Three four.", "Five six seven."]);
  }

  #[test]
  fn chunks_fall_back_to_hard_cuts() {
    let chunks = chunk_text("abcdefghij", 4);
    assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
  }

  #[test]
  fn short_text_is_a_single_chunk() {
    assert_eq!(chunk_text("Short text.", 2000), vec!["Short text."]);
    assert!(chunk_text("", 2000).is_empty());
  }

  #[test]
  fn chunking_is_char_boundary_safe() {
    let text = "ééé. ééé. ééé.";
    let chunks = chunk_text(text, 5);
    assert_eq!(chunks.concat().replace(' ', ""), text.replace(' ', ""));
  }

  #[test]
  fn limits_follow_chunk_length() {
    let words = |n: usize| vec!["w"; n].join(" ");
    assert_eq!(SummaryLimits::for_chunk(&words(5)), SummaryLimits { max_words: 5, min_words: 5 });
    assert_eq!(SummaryLimits::for_chunk(&words(100)), SummaryLimits { max_words: 100, min_words: 50 });
    assert_eq!(SummaryLimits::for_chunk(&words(1000)), SummaryLimits { max_words: 300, min_words: 50 });
  }

  #[tokio::test]
  async fn chunk_summaries_are_joined_in_order() {
    let summarizer = EchoSummarizer::default();
    let text = "Rain falls from clouds. Rivers carry it to the sea. The sun heats the sea.";
    let out = hierarchical_summary(&summarizer, &Prompts::default(), text, 30, Duration::from_secs(1))
      .await
      .unwrap();
    assert_eq!(out, "Rain falls from clouds. Rivers carry it to the sea. The sun heats the sea.");
  }

  #[tokio::test]
  async fn failing_chunks_are_skipped() {
    let summarizer = EchoSummarizer { fail_containing: Some("Rivers".into()) };
    let text = "Rain falls from clouds. Rivers carry it to the sea. The sun heats the sea.";
    let out = hierarchical_summary(&summarizer, &Prompts::default(), text, 30, Duration::from_secs(1))
      .await
      .unwrap();
    assert_eq!(out, "Rain falls from clouds. The sun heats the sea.");

    let all_fail = EchoSummarizer { fail_containing: Some("".into()) };
    assert!(hierarchical_summary(&all_fail, &Prompts::default(), text, 30, Duration::from_secs(1))
      .await
      .is_err());
  }
}
