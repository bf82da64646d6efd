//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::parser::ParsedBlock;

fn default_num_questions() -> i64 {
    5
}

/// Body of `POST /generate_mcqs/`.
#[derive(Debug, Deserialize)]
pub struct GenerateMcqsIn {
    pub paragraph: String,
    #[serde(default = "default_num_questions")]
    pub num_questions: i64,
}

/// One question as delivered to clients. `correct_answer` is the literal text
/// of one of the four `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqOut {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl From<ParsedBlock> for McqOut {
    fn from(b: ParsedBlock) -> Self {
        McqOut {
            question: b.question,
            options: b.options,
            correct_answer: b.correct_answer,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateMcqsOut {
    pub mcqs: Vec<McqOut>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryOut {
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_questions_defaults_to_five() {
        let body: GenerateMcqsIn = serde_json::from_str(r#"{"paragraph":"Rain falls."}"#).unwrap();
        assert_eq!(body.num_questions, 5);
        assert_eq!(body.paragraph, "Rain falls.");
    }

    #[test]
    fn mcq_out_uses_snake_case_keys() {
        let out = McqOut {
            question: "Q?".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: "b".into(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["correct_answer"], "b");
        assert_eq!(json["options"].as_array().map(|a| a.len()), Some(4));
    }
}
