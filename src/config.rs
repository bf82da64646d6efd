//! Loading service configuration (prompts + pipeline tuning) from TOML.
//!
//! Every field has a default, so a config file only needs to list overrides:
//!
//! ```toml
//! distractor_bank_path = "./assets/my_bank.toml"
//!
//! [prompts]
//! question_user_template = "Write one exam question about: {text}"
//!
//! [pipeline]
//! attempt_multiplier = 12
//! answer_similarity = "substring"
//! topic_match = "first"
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{AnswerSimilarity, TopicMatch};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub pipeline: PipelineSettings,
  /// Replaces the built-in distractor bank (`DISTRACTOR_BANK_PATH` wins over this).
  #[serde(default)]
  pub distractor_bank_path: Option<String>,
}

/// Prompts sent to the model. `{text}`, `{paragraph}`, `{question}`,
/// `{max_words}` and `{min_words}` are substituted where shown.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub question_system: String,
  pub question_user_template: String,
  pub answer_system: String,
  pub answer_user_template: String,
  pub summary_system: String,
  pub summary_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "You write multiple-choice study questions. Reply on ONE line as: question|||correct answer|||wrong answer|||wrong answer|||wrong answer. Keep answers to a few words. No numbering, no labels.".into(),
      question_user_template: "Generate a single question from the following text: {text}".into(),
      answer_system: "You answer study questions with a short phrase only.".into(),
      answer_user_template: "Based on this text: {paragraph}. What is the correct answer to this question: {question}? Give a short, concise answer only.".into(),
      summary_system: "You summarize study material faithfully. Output ONLY the summary text.".into(),
      summary_user_template: "Summarize the following text in at most {max_words} words (aim for at least {min_words}).\n\n{text}".into(),
    }
  }
}

/// Knobs for the MCQ batch driver and the document path.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
  /// Attempt budget per batch is `target * attempt_multiplier`.
  pub attempt_multiplier: usize,
  /// Upper bound for a single model call.
  pub model_timeout_secs: f64,
  /// Largest `num_questions` accepted per request.
  pub max_questions: usize,
  pub answer_similarity: AnswerSimilarity,
  pub topic_match: TopicMatch,
  /// Summarization chunk size, in characters.
  pub chunk_chars: usize,
  pub max_upload_bytes: usize,
}

impl Default for PipelineSettings {
  fn default() -> Self {
    Self {
      attempt_multiplier: 10,
      model_timeout_secs: 30.0,
      max_questions: 25,
      answer_similarity: AnswerSimilarity::default(),
      topic_match: TopicMatch::default(),
      chunk_chars: 2000,
      max_upload_bytes: 20 * 1024 * 1024,
    }
  }
}

impl PipelineSettings {
  pub fn model_timeout(&self) -> Duration {
    Duration::try_from_secs_f64(self.model_timeout_secs).unwrap_or(Duration::from_secs(30))
  }
}

/// Attempt to load `AppConfig` from LEARNEASE_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("LEARNEASE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "learnease_backend", %path, "Loaded service config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "learnease_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "learnease_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_config_keeps_defaults() {
    let cfg: AppConfig = toml::from_str(
      r#"
        [pipeline]
        attempt_multiplier = 4
        answer_similarity = "exact"

        [prompts]
        question_user_template = "Ask about: {text}"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.pipeline.attempt_multiplier, 4);
    assert_eq!(cfg.pipeline.answer_similarity, AnswerSimilarity::Exact);
    assert_eq!(cfg.pipeline.topic_match, TopicMatch::Longest);
    assert_eq!(cfg.pipeline.chunk_chars, 2000);
    assert_eq!(cfg.prompts.question_user_template, "Ask about: {text}");
    assert!(cfg.prompts.answer_user_template.contains("{question}"));
    assert!(cfg.distractor_bank_path.is_none());
  }

  #[test]
  fn invalid_timeouts_fall_back() {
    let settings = PipelineSettings { model_timeout_secs: -1.0, ..PipelineSettings::default() };
    assert_eq!(settings.model_timeout(), Duration::from_secs(30));
    let settings = PipelineSettings { model_timeout_secs: 0.25, ..PipelineSettings::default() };
    assert_eq!(settings.model_timeout(), Duration::from_millis(250));
  }
}
