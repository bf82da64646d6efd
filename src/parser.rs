//! Parsing raw model text into MCQ candidates.
//!
//! Two strategies implement [`OutputParser`]:
//!   - [`DelimitedParser`]: `question|||answer|||distractor|||...` (what the question
//!     prompt asks for).
//!   - [`LetteredBlockParser`]: a `Question:` / `A)`..`D)` / `Correct Answer:` block,
//!     in a strict layout or a lenient one. Also used to validate the blocks the
//!     formatter renders before they go out to clients.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{OptionLabel, ParsedCandidate, FIELD_DELIMITER};

/// Result of classifying one raw model string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseOutcome {
  /// Delimited or block output: a question plus whatever fields were present.
  Structured(ParsedCandidate),
  /// Plain text taken as the question; the answer must be resolved separately.
  QuestionOnly(String),
  /// Nothing usable (blank question).
  Unparseable,
}

impl ParseOutcome {
  pub fn into_candidate(self) -> Option<ParsedCandidate> {
    match self {
      ParseOutcome::Structured(c) => Some(c),
      ParseOutcome::QuestionOnly(q) => Some(ParsedCandidate::question_only(q)),
      ParseOutcome::Unparseable => None,
    }
  }
}

pub trait OutputParser {
  fn parse(&self, raw: &str) -> ParseOutcome;
}

/// Right-strip pipe and space artifacts left over from a sloppy delimiter split.
pub fn clean_distractor(s: &str) -> String {
  s.trim().trim_end_matches(|c| c == '|' || c == ' ').to_string()
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DelimitedParser;

impl DelimitedParser {
  /// Total split: never fails, blank input yields an empty question.
  pub fn split(raw: &str) -> ParsedCandidate {
    if !raw.contains(FIELD_DELIMITER) {
      return ParsedCandidate::question_only(raw.trim());
    }
    let mut parts = raw.split(FIELD_DELIMITER);
    let question = parts.next().unwrap_or_default().trim().to_string();
    let correct_answer = parts.next().map(|s| s.trim().to_string()).unwrap_or_default();
    let distractors = parts
      .map(clean_distractor)
      .filter(|d| !d.is_empty())
      .collect();
    ParsedCandidate { question, correct_answer, distractors }
  }
}

impl OutputParser for DelimitedParser {
  fn parse(&self, raw: &str) -> ParseOutcome {
    let candidate = Self::split(raw);
    if candidate.question.is_empty() {
      ParseOutcome::Unparseable
    } else if raw.contains(FIELD_DELIMITER) {
      ParseOutcome::Structured(candidate)
    } else {
      ParseOutcome::QuestionOnly(candidate.question)
    }
  }
}

/// Primary delimited parse, with the lenient block parser as the alternative
/// when the model answered with a lettered block instead of the delimiter format.
pub fn parse_model_output(raw: &str) -> ParseOutcome {
  match DelimitedParser.parse(raw) {
    ParseOutcome::QuestionOnly(question) => match LetteredBlockParser::lenient().parse(raw) {
      structured @ ParseOutcome::Structured(_) => structured,
      _ => ParseOutcome::QuestionOnly(question),
    },
    other => other,
  }
}

/// A lettered block pulled apart into its fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedBlock {
  pub question: String,
  /// Exactly four entries.
  pub options: Vec<String>,
  /// Literal text of the correct option.
  pub correct_answer: String,
}

impl ParsedBlock {
  pub fn into_candidate(self) -> ParsedCandidate {
    let correct_lower = self.correct_answer.to_lowercase();
    let distractors = self
      .options
      .into_iter()
      .filter(|o| o.to_lowercase() != correct_lower)
      .collect();
    ParsedCandidate { question: self.question, correct_answer: self.correct_answer, distractors }
  }
}

static STRICT_BLOCK: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?is)Question:\s*(?P<question>.+?)\n\s*A\)\s*(?P<a>.+?)\n\s*B\)\s*(?P<b>.+?)\n\s*C\)\s*(?P<c>.+?)\n\s*D\)\s*(?P<d>.+?)\n\s*Correct\s+Answer:\s*(?P<letter>[A-D])\)\s*(?P<correct>.+)",
  )
  .expect("strict block regex")
});
static QUESTION_BLOCK: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?s)(?i:question):[ \t]*(.+?)\n\s*[A-D][.):]").expect("question block regex")
});
static QUESTION_LINE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)Question:[ \t]*(.+)").expect("question regex"));
static NUMBERED_LINE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?m)^\s*\d+\.?[ \t]*(.+)$").expect("numbered regex"));
static OPTION_LINE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?m)^\s*([A-D])[.):][ \t]*(.+?)\s*$").expect("option regex"));
static ANSWER_WITH_LETTER: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?im)(?:correct\s*answer|answer)(?:\s*is)?\s*:?[ \t]*(?-i:([A-D]))(?:[.):]|[ \t]|$)[ \t]*(.*)$")
    .expect("answer letter regex")
});
static ANSWER_TEXT: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?im)(?:correct\s*answer|answer)(?:\s*is)?\s*:?[ \t]*(.+)$").expect("answer text regex")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockLayout {
  Strict,
  Lenient,
}

#[derive(Clone, Copy, Debug)]
pub struct LetteredBlockParser {
  layout: BlockLayout,
}

impl LetteredBlockParser {
  /// Exactly the layout [`crate::domain::FormattedMcq::render`] produces.
  pub fn strict() -> Self {
    Self { layout: BlockLayout::Strict }
  }

  /// Tolerates `A.`/`A:` markers, numbered questions and letter-only answers.
  pub fn lenient() -> Self {
    Self { layout: BlockLayout::Lenient }
  }

  pub fn parse_block(&self, raw: &str) -> Option<ParsedBlock> {
    match self.layout {
      BlockLayout::Strict => parse_strict(raw),
      BlockLayout::Lenient => parse_lenient(raw),
    }
  }
}

impl OutputParser for LetteredBlockParser {
  fn parse(&self, raw: &str) -> ParseOutcome {
    match self.parse_block(raw) {
      Some(block) => ParseOutcome::Structured(block.into_candidate()),
      None => ParseOutcome::Unparseable,
    }
  }
}

/// Strict first, lenient when the strict layout does not match.
pub fn parse_block_with_fallback(raw: &str) -> Option<ParsedBlock> {
  LetteredBlockParser::strict()
    .parse_block(raw)
    .or_else(|| LetteredBlockParser::lenient().parse_block(raw))
}

fn parse_strict(raw: &str) -> Option<ParsedBlock> {
  let caps = STRICT_BLOCK.captures(raw)?;
  let field = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
  let question = field("question");
  let options = vec![field("a"), field("b"), field("c"), field("d")];
  if question.is_empty() || options.iter().any(|o| o.is_empty()) {
    return None;
  }
  let stated = field("correct");
  let correct_answer = match options.iter().find(|o| o.to_lowercase() == stated.to_lowercase()) {
    Some(o) => o.clone(),
    None => {
      let label = field("letter").chars().next().and_then(OptionLabel::from_char)?;
      options[label.index()].clone()
    }
  };
  Some(ParsedBlock { question, options, correct_answer })
}

fn parse_lenient(raw: &str) -> Option<ParsedBlock> {
  // Multi-line questions run up to the first option marker.
  let question = QUESTION_BLOCK
    .captures(raw)
    .or_else(|| QUESTION_LINE.captures(raw))
    .or_else(|| NUMBERED_LINE.captures(raw))
    .and_then(|c| c.get(1))
    .map(|m| m.as_str().trim().to_string())
    .filter(|q| !q.is_empty())?;

  let mut options = Vec::with_capacity(4);
  let mut options_end = 0;
  for m in OPTION_LINE.captures_iter(raw).filter_map(|c| c.get(2)) {
    let text = m.as_str().trim();
    if text.is_empty() {
      continue;
    }
    options.push(text.to_string());
    options_end = m.end();
    if options.len() == 4 {
      break;
    }
  }
  if options.len() < 4 {
    return None;
  }

  // The answer line follows the options.
  let tail = &raw[options_end..];
  let correct_answer = if let Some(caps) = ANSWER_WITH_LETTER.captures(tail) {
    let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
    if text.is_empty() {
      let label = caps.get(1).and_then(|m| m.as_str().chars().next()).and_then(OptionLabel::from_char)?;
      options[label.index()].clone()
    } else {
      reconcile_with_options(text, &options)
    }
  } else {
    let text = ANSWER_TEXT.captures(tail)?.get(1)?.as_str().trim().to_string();
    reconcile_with_options(&text, &options)
  };

  Some(ParsedBlock { question, options, correct_answer })
}

/// Map a stated answer onto one of the options: exact, case-insensitive,
/// containment either way, else the first option.
fn reconcile_with_options(stated: &str, options: &[String]) -> String {
  if let Some(o) = options.iter().find(|o| o.as_str() == stated) {
    return o.clone();
  }
  let lower = stated.to_lowercase();
  for o in options {
    let ol = o.to_lowercase();
    if ol == lower || lower.contains(&ol) || ol.contains(&lower) {
      return o.clone();
    }
  }
  options[0].clone()
}
