//! Defensive sanitization of generated batch output.
//!
//! Models hand back loosely-shaped JSON; this module turns each item into a
//! well-formed [`BankQuestion`] with documented defaults:
//! - missing/blank question text becomes a placeholder
//! - the choice list is truncated/padded to exactly four entries
//! - `correctIndex` is coerced from number or numeric string and clamped to 0..=3
//! - missing wrong-quip slots get generic fillers, a missing correct quip
//!   gets a stock cheer
//!
//! Schema validation proper lives in the domain; this step never rejects,
//! it only repairs.

use std::collections::BTreeMap;

use serde::Deserialize;

use quizsmith_domain::{BankQuestion, GameCategory};

use crate::generate::strip_code_fences;

pub const DEFAULT_QUESTION_TEXT: &str = "Unknown question";
pub const DEFAULT_CORRECT_QUIP: &str = "Boom! Nailed it.";
pub const CHOICE_PLACEHOLDERS: [&str; 4] = ["A", "B", "C", "D"];
pub const WRONG_QUIP_FILLERS: [&str; 4] = [
    "Nope, not quite.",
    "Nice try, still wrong.",
    "Swing and a miss.",
    "That answer tripped over itself.",
];

#[derive(Debug, Default, Deserialize)]
pub struct RawBatch {
    #[serde(default)]
    pub questions: Vec<RawBatchQuestion>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawBatchQuestion {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    #[serde(rename = "correctIndex", default)]
    pub correct_index: Option<serde_json::Value>,
    #[serde(rename = "wrongQuips", default)]
    pub wrong_quips: Option<BTreeMap<String, String>>,
    #[serde(rename = "correctQuip", default)]
    pub correct_quip: Option<String>,
}

/// Parse a model reply into a raw batch, stripping code fences and falling
/// back to the outermost `{...}` substring when the reply has prose around
/// the JSON.
pub fn parse_batch(text: &str) -> Result<RawBatch, serde_json::Error> {
    let stripped = strip_code_fences(text);
    match serde_json::from_str(stripped) {
        Ok(batch) => Ok(batch),
        Err(e) => {
            if let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) {
                if end > start {
                    return serde_json::from_str(&stripped[start..=end]);
                }
            }
            Err(e)
        }
    }
}

/// Repair one raw item into a ready-to-serve bank question.
pub fn sanitize(raw: RawBatchQuestion, category: GameCategory, id: String) -> BankQuestion {
    let question = raw
        .question
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_QUESTION_TEXT.to_string());

    let mut choices = raw.choices.unwrap_or_default();
    choices.truncate(CHOICE_PLACEHOLDERS.len());
    while choices.len() < CHOICE_PLACEHOLDERS.len() {
        choices.push(CHOICE_PLACEHOLDERS[choices.len()].to_string());
    }

    let answer_index = raw
        .correct_index
        .as_ref()
        .and_then(coerce_index)
        .unwrap_or(0)
        .clamp(0, (CHOICE_PLACEHOLDERS.len() - 1) as i64) as usize;

    let provided = raw.wrong_quips.unwrap_or_default();
    let wrong_answer_quips: BTreeMap<usize, String> = (0..CHOICE_PLACEHOLDERS.len())
        .filter(|i| *i != answer_index)
        .map(|i| {
            let quip = provided
                .get(&i.to_string())
                .filter(|q| !q.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| WRONG_QUIP_FILLERS[i].to_string());
            (i, quip)
        })
        .collect();

    BankQuestion {
        id,
        category,
        question,
        choices,
        answer_index,
        correct_quip: raw
            .correct_quip
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CORRECT_QUIP.to_string()),
        wrong_answer_quips,
        used: false,
    }
}

fn coerce_index(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}
