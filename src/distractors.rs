//! Distractor bank and synthesis.
//!
//! The bank is pure data (`assets/distractors.toml`, embedded at build time and
//! replaceable at startup). Synthesis draws wrong answers from three tiers:
//! the topic pool matched against the correct answer, the shuffled general
//! pool, then the backup list in declared order.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::domain::TopicMatch;
use crate::error::ConfigError;
use crate::parser::clean_distractor;

/// Number of wrong options every question carries.
pub const DISTRACTOR_COUNT: usize = 3;

const SHORT_KEY_CHARS: usize = 3;

const BUILTIN_BANK: &str = include_str!("../assets/distractors.toml");

#[derive(Clone, Debug, Deserialize)]
pub struct TopicEntry {
  pub key: String,
  pub terms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BankFile {
  #[serde(default)]
  backup: Vec<String>,
  #[serde(default)]
  fillers: Vec<String>,
  #[serde(default)]
  general: Vec<String>,
  #[serde(default, rename = "topic")]
  topics: Vec<TopicEntry>,
}

/// Immutable after load; shared read-only across requests.
#[derive(Clone, Debug)]
pub struct DistractorBank {
  topics: Vec<TopicEntry>,
  general: Vec<String>,
  backup: Vec<String>,
  fillers: Vec<String>,
  topic_match: TopicMatch,
}

impl DistractorBank {
  pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
    let file: BankFile = toml::from_str(s)?;
    let topics = file
      .topics
      .into_iter()
      .map(|t| TopicEntry { key: t.key.trim().to_lowercase(), terms: t.terms })
      .filter(|t| !t.key.is_empty())
      .collect();
    Ok(Self {
      topics,
      general: file.general,
      backup: file.backup,
      fillers: file.fillers,
      topic_match: TopicMatch::default(),
    })
  }

  /// The bank compiled into the binary.
  pub fn builtin() -> Result<Self, ConfigError> {
    Self::from_toml_str(BUILTIN_BANK)
  }

  /// Load from `path` when given, falling back to the built-in bank if the
  /// file cannot be read or parsed.
  pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
    let Some(path) = path else {
      return Self::builtin();
    };
    let loaded = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Read { path: path.to_string(), source })
      .and_then(|s| Self::from_toml_str(&s));
    match loaded {
      Ok(bank) => {
        info!(target: "learnease_backend", %path, topics = bank.topics.len(), "Loaded distractor bank");
        Ok(bank)
      }
      Err(e) => {
        error!(target: "learnease_backend", %path, error = %e, "Failed to load distractor bank; using built-in");
        Self::builtin()
      }
    }
  }

  pub fn with_topic_match(mut self, topic_match: TopicMatch) -> Self {
    self.topic_match = topic_match;
    self
  }

  pub fn topic_count(&self) -> usize {
    self.topics.len()
  }

  pub fn topic_keys(&self) -> impl Iterator<Item = &str> {
    self.topics.iter().map(|t| t.key.as_str())
  }

  pub fn fillers(&self) -> &[String] {
    &self.fillers
  }

  /// Topic entry whose key occurs in the (lower-cased) correct answer.
  pub fn topic_for(&self, correct_lower: &str) -> Option<&TopicEntry> {
    let mut matching = self.topics.iter().filter(|t| key_matches(&t.key, correct_lower));
    match self.topic_match {
      TopicMatch::First => matching.next(),
      TopicMatch::Longest => matching.fold(None, |best: Option<&TopicEntry>, t| match best {
        Some(b) if b.key.len() >= t.key.len() => Some(b),
        _ => Some(t),
      }),
    }
  }

  /// Up to three wrong answers for `correct`, seeded with `existing`.
  /// Returns fewer only when every tier is exhausted.
  pub fn synthesize<R: Rng + ?Sized>(&self, correct: &str, existing: &[String], rng: &mut R) -> Vec<String> {
    let correct_lower = correct.trim().to_lowercase();
    let mut out: Vec<String> = Vec::with_capacity(DISTRACTOR_COUNT);
    for d in existing.iter().map(|d| clean_distractor(d)) {
      if !d.is_empty() && !contains_ci(&out, &d) {
        out.push(d);
      }
    }

    let overlaps_answer = |term: &str| {
      let t = term.to_lowercase();
      t.contains(&correct_lower) || correct_lower.contains(&t)
    };

    if out.len() < DISTRACTOR_COUNT {
      if let Some(topic) = self.topic_for(&correct_lower) {
        debug!(target: "mcq", key = %topic.key, "Topic pool matched");
        let mut pool: Vec<&String> = topic.terms.iter().filter(|t| !overlaps_answer(t.as_str())).collect();
        pool.shuffle(rng);
        push_until_full(&mut out, pool);
      }
    }

    if out.len() < DISTRACTOR_COUNT {
      let mut pool: Vec<&String> = self.general.iter().filter(|t| !overlaps_answer(t.as_str())).collect();
      pool.shuffle(rng);
      push_until_full(&mut out, pool);
    }

    // Backup: declared order, only the presence and equality filters.
    for b in &self.backup {
      if out.len() >= DISTRACTOR_COUNT {
        break;
      }
      if b.to_lowercase() != correct_lower && !contains_ci(&out, b) {
        out.push(b.clone());
      }
    }

    out.truncate(DISTRACTOR_COUNT);
    out
  }
}

/// Keys up to `SHORT_KEY_CHARS` long must match a whole word ("ore" is not in "more").
fn key_matches(key: &str, correct_lower: &str) -> bool {
  if key.chars().count() <= SHORT_KEY_CHARS {
    correct_lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == key)
  } else {
    correct_lower.contains(key)
  }
}

fn contains_ci(list: &[String], s: &str) -> bool {
  let s = s.to_lowercase();
  list.iter().any(|x| x.to_lowercase() == s)
}

fn push_until_full(out: &mut Vec<String>, pool: Vec<&String>) {
  for term in pool {
    if out.len() >= DISTRACTOR_COUNT {
      break;
    }
    if !contains_ci(out, term) {
      out.push(term.clone());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn builtin() -> DistractorBank {
    DistractorBank::builtin().expect("built-in bank parses")
  }

  #[test]
  fn builtin_bank_loads_all_tiers() {
    let bank = builtin();
    assert!(bank.topic_count() > 700);
    assert_eq!(bank.backup.len(), 11);
    assert_eq!(bank.fillers().len(), 9);
    assert!(bank.general.len() > 100);
    assert!(bank.topic_keys().all(|k| k == k.to_lowercase()));
  }

  #[test]
  fn evaporation_draws_from_its_curated_pool() {
    let bank = builtin();
    let allowed = [
      "sublimation", "transpiration", "infiltration", "runoff", "percolation", "radiation", "convection",
    ];
    for seed in 0..20 {
      let mut rng = StdRng::seed_from_u64(seed);
      let out = bank.synthesize("evaporation", &[], &mut rng);
      assert_eq!(out.len(), 3);
      assert!(out.iter().all(|d| allowed.contains(&d.as_str())), "{out:?}");
      assert!(out.iter().all(|d| d != "evaporation"));
      let unique: std::collections::HashSet<&String> = out.iter().collect();
      assert_eq!(unique.len(), 3);
    }
  }

  #[test]
  fn existing_candidates_are_kept_and_topped_up() {
    let bank = builtin();
    let mut rng = StdRng::seed_from_u64(7);
    let out = bank.synthesize("the sun", &["moon".into(), "gravity|| ".into()], &mut rng);
    assert_eq!(&out[..2], &["moon".to_string(), "gravity".to_string()]);
    assert!(["wind", "temperature", "pressure", "humidity", "atmosphere"].contains(&out[2].as_str()));
  }

  #[test]
  fn backup_list_is_consumed_in_declared_order() {
    let bank = DistractorBank::from_toml_str(
      r#"
        backup = ["climate change", "water pollution", "ocean currents", "groundwater"]
        general = ["acid rain", "amino acid", "ACID"]
      "#,
    )
    .unwrap();
    for seed in 0..5 {
      let mut rng = StdRng::seed_from_u64(seed);
      let out = bank.synthesize("acid", &[], &mut rng);
      assert_eq!(out, vec!["climate change", "water pollution", "ocean currents"]);
    }
  }

  #[test]
  fn backup_skips_answer_and_present_entries() {
    let bank = DistractorBank::from_toml_str(r#"backup = ["Groundwater", "humidity", "watershed", "acid rain"]"#).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let out = bank.synthesize("groundwater", &["Humidity".into()], &mut rng);
    assert_eq!(out, vec!["Humidity", "watershed", "acid rain"]);
  }

  #[test]
  fn exhausted_sources_return_a_short_list() {
    let bank = DistractorBank::from_toml_str(r#"backup = ["watershed"]"#).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(bank.synthesize("rain", &[], &mut rng), vec!["watershed"]);
  }

  #[test]
  fn longest_key_beats_declaration_order() {
    let toml = r#"
      [[topic]]
      key = "Cycle"
      terms = ["loop", "circuit"]

      [[topic]]
      key = "water cycle"
      terms = ["carbon cycle", "rock cycle", "nitrogen cycle"]
    "#;
    let longest = DistractorBank::from_toml_str(toml).unwrap();
    assert_eq!(longest.topic_for("the water cycle").map(|t| t.key.as_str()), Some("water cycle"));

    let first = DistractorBank::from_toml_str(toml).unwrap().with_topic_match(TopicMatch::First);
    assert_eq!(first.topic_for("the water cycle").map(|t| t.key.as_str()), Some("cycle"));
    assert!(first.topic_for("rainfall").is_none());
  }

  #[test]
  fn short_keys_only_match_whole_words() {
    let bank = builtin();
    assert_eq!(bank.topic_for("the sun").map(|t| t.key.as_str()), Some("sun"));
    assert_eq!(bank.topic_for("iron ore").map(|t| t.key.as_str()), Some("ore"));
    for answer in ["unit", "fundamental", "round", "whole", "more energy"] {
      let key = bank.topic_for(answer).map(|t| t.key.as_str());
      assert!(!matches!(key, Some("ore") | Some("un") | Some("who")), "{answer} matched {key:?}");
    }
    assert!(bank.topic_keys().all(|k| k != "un" && k != "who"));
  }

  #[test]
  fn topic_terms_overlapping_the_answer_are_filtered() {
    let bank = DistractorBank::from_toml_str(
      r#"
        [[topic]]
        key = "cycle"
        terms = ["water cycle", "cycle", "rock cycle", "life cycle", "carbon cycle"]
      "#,
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let out = bank.synthesize("Water Cycle", &[], &mut rng);
    assert_eq!(out.len(), 3);
    assert!(out.iter().all(|d| d != "water cycle" && d != "cycle"));
  }
}
