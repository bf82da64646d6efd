//! Key-phrase extraction for free-text answers.
//!
//! The model's answer attempt is rarely a clean noun phrase. We run an ordered
//! chain of pure strategies over it and keep the first non-empty result.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::FIELD_DELIMITER;

/// Domain vocabulary recognised verbatim in long answers.
pub const KEY_TERMS: &[&str] = &[
  "water cycle",
  "evaporation",
  "condensation",
  "precipitation",
  "collection",
  "hydrologic",
  "hydrological",
];

static PHRASE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
  [
    r"\bis (?:the )?([^.]+)",
    r"\bcalled (?:the )?([^.]+)",
    r"\bknown as (?:the )?([^.]+)",
    r"\btermed (?:the )?([^.]+)",
    r"(?:the )?([a-zA-Z ]+) (?:cycle|process)",
  ]
  .iter()
  .map(|p| Regex::new(p).expect("answer phrase regex"))
  .collect()
});

/// The input seen by each strategy: the raw text and its first sentence.
#[derive(Debug)]
pub struct AnswerText<'a> {
  raw: &'a str,
  sentence: String,
}

impl<'a> AnswerText<'a> {
  pub fn new(raw: &'a str) -> Self {
    // Delimiter leftovers never belong to the answer phrase.
    let before_question = raw.split('?').next().unwrap_or_default().replace(FIELD_DELIMITER, " ");
    let sentence = before_question
      .split(['.', '!', ';'])
      .map(|s| s.trim_matches(|c: char| c == '|' || c.is_whitespace()))
      .find(|s| !s.is_empty())
      .unwrap_or_default()
      .to_string();
    Self { raw, sentence }
  }

  fn word_count(&self) -> usize {
    self.sentence.split_whitespace().count()
  }
}

pub type Strategy = fn(&AnswerText) -> Option<String>;

/// Applied in order; first `Some` wins.
pub const STRATEGIES: &[(&str, Strategy)] = &[
  ("delimited", delimited_segment),
  ("phrase_pattern", phrase_pattern),
  ("key_term", key_term),
  ("leading_words", leading_words),
  ("whole_sentence", whole_sentence),
];

/// Reduce a free-text answer to a short phrase. Never fails; may return "".
pub fn extract_key_answer(text: &str) -> String {
  let input = AnswerText::new(text);
  for (name, strategy) in STRATEGIES {
    if let Some(answer) = strategy(&input).filter(|a| !a.is_empty()) {
      debug!(target: "mcq", strategy = %name, answer = %answer, "Answer phrase extracted");
      return answer;
    }
  }
  String::new()
}

fn delimited_segment(input: &AnswerText) -> Option<String> {
  if !input.raw.contains(FIELD_DELIMITER) {
    return None;
  }
  input.raw.split(FIELD_DELIMITER).nth(1).map(|s| s.trim().to_string())
}

fn phrase_pattern(input: &AnswerText) -> Option<String> {
  if input.word_count() <= 5 {
    return None;
  }
  PHRASE_PATTERNS.iter().find_map(|re| {
    re.captures(&input.sentence)
      .and_then(|c| c.get(1))
      .map(|m| m.as_str().trim().to_string())
      .filter(|s| !s.is_empty())
  })
}

fn key_term(input: &AnswerText) -> Option<String> {
  if input.word_count() <= 4 {
    return None;
  }
  let lower = input.sentence.to_lowercase();
  KEY_TERMS.iter().find(|t| lower.contains(*t)).map(|t| t.to_string())
}

fn leading_words(input: &AnswerText) -> Option<String> {
  if input.word_count() <= 4 {
    return None;
  }
  Some(input.sentence.split_whitespace().take(3).collect::<Vec<_>>().join(" "))
}

fn whole_sentence(input: &AnswerText) -> Option<String> {
  Some(input.sentence.clone())
}
