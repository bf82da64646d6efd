//! Language-model collaborators.
//!
//! The pipeline only sees these traits: a prompt goes in, a string comes out.
//! `OpenAI` (see `openai.rs`) implements them against a chat-completions API;
//! [`LocalModel`] is the offline fallback used when no API key is configured.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;

use crate::config::Prompts;
use crate::distractors::DistractorBank;
use crate::domain::FIELD_DELIMITER;
use crate::error::ModelError;
use crate::summary::SummaryLimits;
use crate::util::split_sentences;

/// Question and answer generation for the MCQ pipeline.
#[async_trait]
pub trait QuestionModel: Send + Sync {
  fn name(&self) -> &str;

  /// Raw output for one question about `passage`. May or may not be delimited.
  async fn generate_question(&self, prompts: &Prompts, passage: &str) -> Result<String, ModelError>;

  /// Free-text answer attempt for `question`, grounded in `passage`.
  async fn generate_answer(&self, prompts: &Prompts, passage: &str, question: &str) -> Result<String, ModelError>;
}

/// Summarizes one chunk of document text.
#[async_trait]
pub trait Summarizer: Send + Sync {
  fn name(&self) -> &str;

  async fn summarize_chunk(&self, prompts: &Prompts, chunk: &str, limits: SummaryLimits) -> Result<String, ModelError>;
}

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z'-]*").expect("word regex"));

/// Offline model: cloze questions over bank vocabulary, overlap-based answers,
/// extractive summaries.
#[derive(Clone, Debug)]
pub struct LocalModel {
  bank: Arc<DistractorBank>,
}

impl LocalModel {
  pub fn new(bank: Arc<DistractorBank>) -> Self {
    Self { bank }
  }

  /// Longest bank key present in `sentence` as whole words.
  fn key_term_in(&self, sentence: &str) -> Option<String> {
    let lower = sentence.to_lowercase();
    let mut keys: Vec<&str> = self.bank.topic_keys().filter(|k| k.len() >= 3 && lower.contains(*k)).collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));
    keys
      .into_iter()
      .find(|k| whole_word(k).map(|re| re.is_match(sentence)).unwrap_or(false))
      .map(str::to_string)
  }

  fn cloze_question(&self, passage: &str) -> String {
    let sentences: Vec<&str> = split_sentences(passage)
      .into_iter()
      .filter(|s| s.split_whitespace().count() >= 4)
      .collect();
    let Some(sentence) = sentences.choose(&mut rand::thread_rng()).copied() else {
      return passage.trim().to_string();
    };

    let answer = self.key_term_in(sentence).or_else(|| {
      WORD
        .find_iter(sentence)
        .map(|m| m.as_str())
        .filter(|w| w.len() >= 5)
        .max_by_key(|w| w.len())
        .map(str::to_string)
    });

    match answer.and_then(|a| whole_word(&a).map(|re| (re, a))) {
      Some((re, answer)) => {
        let blanked = re.replace_all(sentence, "_____");
        format!("Which term best completes the statement: \"{blanked}\"?{FIELD_DELIMITER}{answer}")
      }
      None => format!("What does the passage say about the following: {sentence}?"),
    }
  }

  fn best_sentence_for<'p>(passage: &'p str, question: &str) -> &'p str {
    let question_words: Vec<String> = WORD
      .find_iter(question)
      .map(|m| m.as_str().to_lowercase())
      .filter(|w| w.len() > 3)
      .collect();
    let sentences = split_sentences(passage);
    sentences
      .iter()
      .copied()
      .max_by_key(|s| {
        let lower = s.to_lowercase();
        // Shorter sentences win ties.
        (question_words.iter().filter(|w| lower.contains(w.as_str())).count(), std::cmp::Reverse(s.len()))
      })
      .unwrap_or("")
  }
}

fn whole_word(term: &str) -> Option<Regex> {
  Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))).ok()
}

#[async_trait]
impl QuestionModel for LocalModel {
  fn name(&self) -> &str {
    "local"
  }

  async fn generate_question(&self, _prompts: &Prompts, passage: &str) -> Result<String, ModelError> {
    Ok(self.cloze_question(passage))
  }

  async fn generate_answer(&self, _prompts: &Prompts, passage: &str, question: &str) -> Result<String, ModelError> {
    Ok(Self::best_sentence_for(passage, question).to_string())
  }
}

#[async_trait]
impl Summarizer for LocalModel {
  fn name(&self) -> &str {
    "local"
  }

  async fn summarize_chunk(&self, _prompts: &Prompts, chunk: &str, limits: SummaryLimits) -> Result<String, ModelError> {
    let mut out: Vec<&str> = Vec::new();
    let mut words = 0;
    for sentence in split_sentences(chunk) {
      let n = sentence.split_whitespace().count();
      if !out.is_empty() && words + n > limits.max_words {
        break;
      }
      out.push(sentence);
      words += n;
    }
    if out.is_empty() {
      return Ok(String::new());
    }
    Ok(format!("{}.", out.join(". ")))
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::DelimitedParser;

  fn local() -> LocalModel {
    LocalModel::new(Arc::new(DistractorBank::builtin().unwrap()))
  }

  #[tokio::test]
  async fn local_questions_blank_out_a_bank_term() {
    let model = local();
    let passage = "Heat from the sun drives evaporation from the oceans.";
    let raw = model.generate_question(&Prompts::default(), passage).await.unwrap();
    let c = DelimitedParser::split(&raw);
    assert_eq!(c.correct_answer, "evaporation");
    assert!(c.question.contains("_____"));
    assert!(!c.question.to_lowercase().contains("evaporation"));
  }

  #[tokio::test]
  async fn local_questions_fall_back_to_long_words() {
    let model = local();
    let raw = model
      .generate_question(&Prompts::default(), "Zorblax quickly fizzled beyond Qwertyvania.")
      .await
      .unwrap();
    let c = DelimitedParser::split(&raw);
    assert_eq!(c.correct_answer, "Qwertyvania");
  }

  #[tokio::test]
  async fn local_answers_pick_the_most_relevant_sentence() {
    let model = local();
    let passage = "Clouds form when vapour cools. Rivers carry water to oceans.";
    let answer = model
      .generate_answer(&Prompts::default(), passage, "Where do rivers carry water?")
      .await
      .unwrap();
    assert_eq!(answer, "Rivers carry water to oceans");
  }

  #[tokio::test]
  async fn local_summary_respects_word_budget() {
    let model = local();
    let chunk = "One two three. Four five six. Seven eight nine.";
    let out = model
      .summarize_chunk(&Prompts::default(), chunk, SummaryLimits { max_words: 6, min_words: 3 })
      .await
      .unwrap();
    assert_eq!(out, "One two three. Four five six.");
  }
}
