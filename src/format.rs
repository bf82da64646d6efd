//! Assemble a four-option MCQ from a question, its answer and candidate distractors.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::distractors::DISTRACTOR_COUNT;
use crate::domain::{FormattedMcq, OptionLabel};

/// Trim and end with exactly one `?`.
pub fn normalize_question(question: &str) -> String {
  let core = question.trim().trim_end_matches(|c: char| c == '?' || c.is_whitespace());
  format!("{core}?")
}

/// Build the option set and shuffle it. Never fails: missing distractors are
/// topped up from `fillers`, then with `Option N` placeholders.
pub fn format_mcq<R: Rng + ?Sized>(
  question: &str,
  correct_answer: &str,
  distractors: &[String],
  fillers: &[String],
  rng: &mut R,
) -> FormattedMcq {
  let correct = correct_answer.trim().to_string();
  let mut taken: Vec<String> = vec![correct.to_lowercase()];
  let mut wrong: Vec<String> = Vec::with_capacity(DISTRACTOR_COUNT);

  let mut offer = |candidate: &str, wrong: &mut Vec<String>| {
    let candidate = candidate.trim();
    let lower = candidate.to_lowercase();
    if wrong.len() < DISTRACTOR_COUNT && !candidate.is_empty() && !taken.contains(&lower) {
      taken.push(lower);
      wrong.push(candidate.to_string());
    }
  };

  for d in distractors {
    offer(d, &mut wrong);
  }
  for f in fillers {
    offer(f, &mut wrong);
  }
  let mut n = wrong.len() + 1;
  while wrong.len() < DISTRACTOR_COUNT {
    offer(&format!("Option {n}"), &mut wrong);
    n += 1;
  }

  let mut pool = Vec::with_capacity(DISTRACTOR_COUNT + 1);
  pool.push(correct);
  pool.extend(wrong);
  let mut order: Vec<usize> = (0..pool.len()).collect();
  order.shuffle(rng);

  let options: [String; 4] = std::array::from_fn(|i| pool[order[i]].clone());
  let correct_label = order
    .iter()
    .position(|&i| i == 0)
    .and_then(OptionLabel::from_index)
    .unwrap_or(OptionLabel::A);

  FormattedMcq { question: normalize_question(question), options, correct_label }
}
