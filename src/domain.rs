//! Domain models for the MCQ pipeline: parsed candidates, formatted questions,
//! and the policy knobs that tune matching.

use serde::{Deserialize, Serialize};

/// Reserved separator between question / answer / distractor fields in model output.
pub const FIELD_DELIMITER: &str = "|||";

/// What the output parser could pull out of one raw model string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedCandidate {
  pub question: String,
  /// Empty when the model did not supply an answer.
  pub correct_answer: String,
  pub distractors: Vec<String>,
}

impl ParsedCandidate {
  pub fn question_only(question: impl Into<String>) -> Self {
    Self { question: question.into(), ..Self::default() }
  }

  pub fn has_answer(&self) -> bool {
    !self.correct_answer.trim().is_empty()
  }
}

/// Letter bound to one of the four option slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionLabel { A, B, C, D }

impl OptionLabel {
  pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

  pub fn from_index(idx: usize) -> Option<Self> {
    Self::ALL.get(idx).copied()
  }

  pub fn from_char(c: char) -> Option<Self> {
    match c.to_ascii_uppercase() {
      'A' => Some(OptionLabel::A),
      'B' => Some(OptionLabel::B),
      'C' => Some(OptionLabel::C),
      'D' => Some(OptionLabel::D),
      _ => None,
    }
  }

  pub fn index(self) -> usize {
    self as usize
  }

  pub fn as_char(self) -> char {
    (b'A' + self as u8) as char
  }
}

/// A finished question: exactly four distinct options, one of them correct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormattedMcq {
  pub question: String,
  pub options: [String; 4],
  pub correct_label: OptionLabel,
}

impl FormattedMcq {
  pub fn correct_answer(&self) -> &str {
    &self.options[self.correct_label.index()]
  }

  /// Render the labelled block consumed by the block parsers and clients.
  pub fn render(&self) -> String {
    let mut out = format!("Question: {}\n\n", self.question);
    for (label, option) in OptionLabel::ALL.iter().zip(self.options.iter()) {
      out.push_str(&format!("{}) {}\n", label.as_char(), option));
    }
    out.push_str(&format!(
      "\nCorrect Answer: {}) {}",
      self.correct_label.as_char(),
      self.correct_answer()
    ));
    out
  }
}

/// How the topic table is searched for a correct answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicMatch {
  /// Longest contained key wins; declaration order breaks ties.
  #[default]
  Longest,
  /// First contained key in declaration order.
  First,
}

/// When two answers count as "the same" for deduplication.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSimilarity {
  /// One answer's word sequence appears contiguously in the other's.
  #[default]
  Token,
  /// Raw substring containment in either direction.
  Substring,
  /// Case-insensitive equality after whitespace normalization.
  Exact,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_round_trip_through_index_and_char() {
    for (i, label) in OptionLabel::ALL.iter().enumerate() {
      assert_eq!(label.index(), i);
      assert_eq!(OptionLabel::from_index(i), Some(*label));
      assert_eq!(OptionLabel::from_char(label.as_char().to_ascii_lowercase()), Some(*label));
    }
    assert_eq!(OptionLabel::from_index(4), None);
    assert_eq!(OptionLabel::from_char('E'), None);
  }

  #[test]
  fn render_lists_options_and_correct_line() {
    let mcq = FormattedMcq {
      question: "What drives the water cycle?".into(),
      options: ["moon".into(), "the sun".into(), "gravity".into(), "wind".into()],
      correct_label: OptionLabel::B,
    };
    let block = mcq.render();
    assert!(block.starts_with("Question: What drives the water cycle?\n\nA) moon\nB) the sun\n"));
    assert!(block.ends_with("\nCorrect Answer: B) the sun"));
  }
}
