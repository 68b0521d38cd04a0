//! Durable library document model.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::BankQuestion;
use crate::question::{Tone, TriviaQuestion, OPTION_COUNT};

/// Where a stored question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Library,
    #[default]
    Generated,
    Imported,
    Cloud,
}

impl QuestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionSource::Library => "library",
            QuestionSource::Generated => "generated",
            QuestionSource::Imported => "imported",
            QuestionSource::Cloud => "cloud",
        }
    }
}

impl fmt::Display for QuestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A question as stored in the library.
///
/// `stem_hash` is globally unique in the store; inserting a doc whose hash
/// already exists is a no-op reported as a duplicate, never an overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDoc {
    #[serde(flatten)]
    pub question: TriviaQuestion,
    pub id: String,
    #[serde(rename = "stemHash")]
    pub stem_hash: String,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub source: QuestionSource,
    #[serde(rename = "usedAt", default)]
    pub used_at: Option<DateTime<Utc>>,
}

impl QuestionDoc {
    /// Convert to the session-pool shape. The incorrect quip is reused for
    /// every wrong choice because library docs carry a single one-liner.
    pub fn to_bank_question(&self) -> BankQuestion {
        let q = &self.question;
        let wrong_answer_quips: BTreeMap<usize, String> = (0..OPTION_COUNT)
            .filter(|i| *i != q.correct_index)
            .map(|i| (i, q.quips.incorrect.clone()))
            .collect();
        BankQuestion {
            id: self.id.clone(),
            category: q.category.into(),
            question: q.question.clone(),
            choices: q.options.clone(),
            answer_index: q.correct_index,
            correct_quip: q.quips.correct.clone(),
            wrong_answer_quips,
            used: false,
        }
    }
}

/// A candidate for insertion; the store assigns whatever is missing
/// (id, stem hash, creation time, default source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(flatten)]
    pub question: TriviaQuestion,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "stemHash", default)]
    pub stem_hash: Option<String>,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default)]
    pub source: Option<QuestionSource>,
}

impl From<TriviaQuestion> for QuestionDraft {
    fn from(question: TriviaQuestion) -> Self {
        Self {
            question,
            id: None,
            stem_hash: None,
            tone: None,
            source: None,
        }
    }
}
