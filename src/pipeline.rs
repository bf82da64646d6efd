//! Batch driver: repeat model call → parse → resolve answer → distractors → format
//! until the target count is reached or the attempt budget runs out.
//!
//! Duplicates are tracked in a [`SeenSet`] owned by the caller, so one request can
//! run several batches against the same history without any process-wide state.

use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::answer::extract_key_answer;
use crate::config::{PipelineSettings, Prompts};
use crate::distractors::{DistractorBank, DISTRACTOR_COUNT};
use crate::domain::{AnswerSimilarity, FormattedMcq};
use crate::error::ModelError;
use crate::format::{format_mcq, normalize_question};
use crate::model::QuestionModel;
use crate::parser::parse_model_output;
use crate::util::trunc_for_log;

/// Lower-cased questions and answers already emitted for one request.
#[derive(Debug, Default)]
pub struct SeenSet {
  questions: HashSet<String>,
  answers: Vec<String>,
  similarity: AnswerSimilarity,
}

impl SeenSet {
  pub fn new(similarity: AnswerSimilarity) -> Self {
    Self { similarity, ..Self::default() }
  }

  pub fn contains_question(&self, question: &str) -> bool {
    self.questions.contains(&question_key(question))
  }

  pub fn answer_conflicts(&self, answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    self.answers.iter().any(|seen| answers_similar(seen, &answer, self.similarity))
  }

  pub fn record(&mut self, question: &str, answer: &str) {
    self.questions.insert(question_key(question));
    self.answers.push(answer.trim().to_lowercase());
  }

  pub fn len(&self) -> usize {
    self.questions.len()
  }
}

fn question_key(question: &str) -> String {
  normalize_question(question).to_lowercase()
}

/// Whether two answers count as the same answer for deduplication.
pub fn answers_similar(a: &str, b: &str, mode: AnswerSimilarity) -> bool {
  let (a, b) = (a.trim().to_lowercase(), b.trim().to_lowercase());
  match mode {
    AnswerSimilarity::Exact => normalize_ws(&a) == normalize_ws(&b),
    AnswerSimilarity::Substring => a.contains(&b) || b.contains(&a),
    AnswerSimilarity::Token => {
      let (ta, tb) = (tokens(&a), tokens(&b));
      if ta.is_empty() || tb.is_empty() {
        return normalize_ws(&a) == normalize_ws(&b);
      }
      contains_run(&ta, &tb) || contains_run(&tb, &ta)
    }
  }
}

fn normalize_ws(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tokens(s: &str) -> Vec<&str> {
  s.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).collect()
}

/// `needle` appears as a contiguous run inside `haystack`.
fn contains_run(haystack: &[&str], needle: &[&str]) -> bool {
  needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Outcome of one batch. A short `mcqs` list is a partial result, not an error.
#[derive(Debug, Default)]
pub struct BatchReport {
  pub mcqs: Vec<FormattedMcq>,
  pub target: usize,
  pub attempts: usize,
  pub duplicates: usize,
  pub unanswered: usize,
  pub unparseable: usize,
}

impl BatchReport {
  pub fn is_partial(&self) -> bool {
    self.mcqs.len() < self.target
  }
}

pub struct McqPipeline<'a> {
  pub model: &'a dyn QuestionModel,
  pub prompts: &'a Prompts,
  pub bank: &'a DistractorBank,
  pub settings: &'a PipelineSettings,
}

impl<'a> McqPipeline<'a> {
  /// Produce up to `target` MCQs for `passage`. Model failures abort the batch.
  #[instrument(level = "info", skip(self, passage, seen, rng), fields(model = %self.model.name(), passage_len = passage.len()))]
  pub async fn generate_batch<R: Rng + Send>(
    &self,
    passage: &str,
    target: usize,
    seen: &mut SeenSet,
    rng: &mut R,
  ) -> Result<BatchReport, ModelError> {
    let budget = target.saturating_mul(self.settings.attempt_multiplier);
    let timeout = self.settings.model_timeout();
    let start = Instant::now();
    let mut report = BatchReport { target, ..BatchReport::default() };

    while report.mcqs.len() < target && report.attempts < budget {
      report.attempts += 1;
      let raw = bounded(timeout, self.model.generate_question(self.prompts, passage)).await?;

      let Some(candidate) = parse_model_output(&raw).into_candidate() else {
        debug!(target: "mcq", attempt = report.attempts, "Blank model output; skipping");
        report.unparseable += 1;
        continue;
      };
      if seen.contains_question(&candidate.question) {
        debug!(target: "mcq", attempt = report.attempts, question = %trunc_for_log(&candidate.question, 80), "Duplicate question; skipping");
        report.duplicates += 1;
        continue;
      }

      let answer = if candidate.has_answer() {
        candidate.correct_answer.trim().to_string()
      } else {
        let text = bounded(
          timeout,
          self.model.generate_answer(self.prompts, passage, &candidate.question),
        )
        .await?;
        extract_key_answer(&text)
      };
      if answer.is_empty() {
        debug!(target: "mcq", attempt = report.attempts, "No answer resolved; skipping");
        report.unanswered += 1;
        continue;
      }
      if seen.answer_conflicts(&answer) {
        debug!(target: "mcq", attempt = report.attempts, answer = %answer, "Answer already used; skipping");
        report.duplicates += 1;
        continue;
      }

      let distractors = if candidate.distractors.len() < DISTRACTOR_COUNT {
        self.bank.synthesize(&answer, &candidate.distractors, rng)
      } else {
        candidate.distractors[..DISTRACTOR_COUNT].to_vec()
      };
      let mcq = format_mcq(&candidate.question, &answer, &distractors, self.bank.fillers(), rng);
      seen.record(&candidate.question, &answer);
      report.mcqs.push(mcq);
    }

    if report.is_partial() {
      warn!(target: "mcq", produced = report.mcqs.len(), target, attempts = report.attempts, "Attempt budget exhausted");
    }
    info!(
      target: "mcq",
      produced = report.mcqs.len(),
      target,
      attempts = report.attempts,
      duplicates = report.duplicates,
      unanswered = report.unanswered,
      unparseable = report.unparseable,
      elapsed = ?start.elapsed(),
      "Batch finished"
    );
    Ok(report)
  }
}

/// Bound a single model call.
async fn bounded<F>(timeout: Duration, call: F) -> Result<String, ModelError>
where
  F: Future<Output = Result<String, ModelError>>,
{
  match tokio::time::timeout(timeout, call).await {
    Ok(r) => r,
    Err(_) => Err(ModelError::Timeout(timeout)),
  }
}
