//! Minimal OpenAI-compatible client for our use-cases.
//!
//! We only call chat.completions and request plain text.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::Prompts;
use crate::error::ModelError;
use crate::model::{QuestionModel, Summarizer};
use crate::summary::SummaryLimits;
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  /// Plain-text chat completion.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  async fn chat_plain(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
    max_tokens: Option<u32>,
  ) -> Result<String, ModelError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      max_tokens,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "learnease-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(ModelError::Status { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| ModelError::Decode(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    debug!(elapsed = ?start.elapsed(), response_len = text.len(), "OpenAI response received");
    Ok(text)
  }
}

#[async_trait]
impl QuestionModel for OpenAI {
  fn name(&self) -> &str {
    &self.model
  }

  #[instrument(level = "info", skip(self, prompts, passage), fields(passage_len = passage.len()))]
  async fn generate_question(&self, prompts: &Prompts, passage: &str) -> Result<String, ModelError> {
    let user = fill_template(&prompts.question_user_template, &[("text", passage)]);
    self.chat_plain(&prompts.question_system, &user, 0.7, Some(50)).await
  }

  #[instrument(level = "info", skip(self, prompts, passage, question), fields(passage_len = passage.len(), question_len = question.len()))]
  async fn generate_answer(&self, prompts: &Prompts, passage: &str, question: &str) -> Result<String, ModelError> {
    let question = question.trim().trim_end_matches('?');
    let user = fill_template(
      &prompts.answer_user_template,
      &[("paragraph", passage), ("question", question)],
    );
    self.chat_plain(&prompts.answer_system, &user, 0.5, Some(20)).await
  }
}

#[async_trait]
impl Summarizer for OpenAI {
  fn name(&self) -> &str {
    &self.model
  }

  #[instrument(level = "info", skip(self, prompts, chunk), fields(chunk_len = chunk.len(), max_words = limits.max_words))]
  async fn summarize_chunk(&self, prompts: &Prompts, chunk: &str, limits: SummaryLimits) -> Result<String, ModelError> {
    let max_words = limits.max_words.to_string();
    let min_words = limits.min_words.to_string();
    let user = fill_template(
      &prompts.summary_user_template,
      &[("text", chunk), ("max_words", &max_words), ("min_words", &min_words)],
    );
    // Roughly 4/3 tokens per word, plus headroom.
    let max_tokens = (limits.max_words as u32).saturating_mul(4) / 3 + 32;
    self.chat_plain(&prompts.summary_system, &user, 0.0, Some(max_tokens)).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
