//! Generated trivia question model and validation.
//!
//! `TriviaQuestion` is the canonical shape the generative backend must
//! produce. Validation bounds mirror what the prompt asks for, so a failure
//! here means the model ignored its instructions and the caller should retry
//! or give up.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The eight categories the generator and library know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriviaCategory {
    History,
    Science,
    Arts,
    PopCulture,
    Sports,
    Geography,
    Literature,
    Technology,
}

impl TriviaCategory {
    pub const ALL: [TriviaCategory; 8] = [
        TriviaCategory::History,
        TriviaCategory::Science,
        TriviaCategory::Arts,
        TriviaCategory::PopCulture,
        TriviaCategory::Sports,
        TriviaCategory::Geography,
        TriviaCategory::Literature,
        TriviaCategory::Technology,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriviaCategory::History => "history",
            TriviaCategory::Science => "science",
            TriviaCategory::Arts => "arts",
            TriviaCategory::PopCulture => "pop_culture",
            TriviaCategory::Sports => "sports",
            TriviaCategory::Geography => "geography",
            TriviaCategory::Literature => "literature",
            TriviaCategory::Technology => "technology",
        }
    }
}

impl fmt::Display for TriviaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Question difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Writing voice requested from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tone {
    #[serde(rename = "snark")]
    Snark,
    #[serde(rename = "deadpan")]
    Deadpan,
    #[serde(rename = "professor")]
    Professor,
    #[serde(rename = "roast-lite")]
    RoastLite,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Snark => "snark",
            Tone::Deadpan => "deadpan",
            Tone::Professor => "professor",
            Tone::RoastLite => "roast-lite",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Content-safety toggles applied to prompt construction and filtering.
///
/// `keep_kind` has no "off" position; it exists so the filter contract is
/// explicit about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityFlags {
    pub pg13_snark: bool,
    pub no_politics: bool,
    pub allow_light_innuendo: bool,
    pub keep_kind: bool,
}

impl Default for PersonalityFlags {
    fn default() -> Self {
        Self {
            pg13_snark: true,
            no_politics: true,
            allow_light_innuendo: false,
            keep_kind: true,
        }
    }
}

/// One-liner reactions attached to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quips {
    pub correct: String,
    pub incorrect: String,
}

pub const QUESTION_MIN_CHARS: usize = 6;
pub const QUESTION_MAX_CHARS: usize = 280;
pub const EXPLANATION_MIN_CHARS: usize = 6;
pub const EXPLANATION_MAX_CHARS: usize = 300;
pub const QUIP_MIN_CHARS: usize = 2;
pub const QUIP_MAX_CHARS: usize = 160;
pub const OPTION_COUNT: usize = 4;

/// A fully generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriviaQuestion {
    pub category: TriviaCategory,
    pub difficulty: Difficulty,
    /// Must equal the seed supplied to the generation request.
    #[serde(rename = "seedEcho")]
    pub seed_echo: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctIndex")]
    pub correct_index: usize,
    pub explanation: String,
    pub quips: Quips,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("seedEcho must be non-empty")]
    EmptySeedEcho,
    #[error("question text must be {QUESTION_MIN_CHARS}-{QUESTION_MAX_CHARS} characters, got {0}")]
    QuestionLength(usize),
    #[error("expected exactly {OPTION_COUNT} options, got {0}")]
    OptionCount(usize),
    #[error("option {0} is empty")]
    EmptyOption(usize),
    #[error("correctIndex {0} is out of range 0..{OPTION_COUNT}")]
    CorrectIndexRange(usize),
    #[error(
        "explanation must be {EXPLANATION_MIN_CHARS}-{EXPLANATION_MAX_CHARS} characters, got {0}"
    )]
    ExplanationLength(usize),
    #[error("{0} quip must be {QUIP_MIN_CHARS}-{QUIP_MAX_CHARS} characters, got {1}")]
    QuipLength(&'static str, usize),
}

impl TriviaQuestion {
    /// Check every schema bound, returning the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.seed_echo.is_empty() {
            return Err(ValidationError::EmptySeedEcho);
        }
        let question_len = self.question.chars().count();
        if !(QUESTION_MIN_CHARS..=QUESTION_MAX_CHARS).contains(&question_len) {
            return Err(ValidationError::QuestionLength(question_len));
        }
        if self.options.len() != OPTION_COUNT {
            return Err(ValidationError::OptionCount(self.options.len()));
        }
        if let Some(idx) = self.options.iter().position(|o| o.is_empty()) {
            return Err(ValidationError::EmptyOption(idx));
        }
        if self.correct_index >= OPTION_COUNT {
            return Err(ValidationError::CorrectIndexRange(self.correct_index));
        }
        let explanation_len = self.explanation.chars().count();
        if !(EXPLANATION_MIN_CHARS..=EXPLANATION_MAX_CHARS).contains(&explanation_len) {
            return Err(ValidationError::ExplanationLength(explanation_len));
        }
        for (label, quip) in [
            ("correct", &self.quips.correct),
            ("incorrect", &self.quips.incorrect),
        ] {
            let len = quip.chars().count();
            if !(QUIP_MIN_CHARS..=QUIP_MAX_CHARS).contains(&len) {
                return Err(ValidationError::QuipLength(label, len));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TriviaQuestion {
        TriviaQuestion {
            category: TriviaCategory::Science,
            difficulty: Difficulty::Easy,
            seed_echo: "abc123".to_string(),
            question: "What gas do plants absorb during photosynthesis?".to_string(),
            options: vec![
                "Oxygen".to_string(),
                "Hydrogen".to_string(),
                "Carbon Dioxide".to_string(),
                "Nitrogen".to_string(),
            ],
            correct_index: 2,
            explanation: "Plants absorb carbon dioxide and release oxygen.".to_string(),
            quips: Quips {
                correct: "Photosynthetic perfection.".to_string(),
                incorrect: "Leaf that choice behind.".to_string(),
            },
        }
    }

    #[test]
    fn valid_question_passes() {
        assert_eq!(sample().validate(), Ok(()));
    }

    #[test]
    fn rejects_wrong_option_count() {
        let mut q = sample();
        q.options.pop();
        assert_eq!(q.validate(), Err(ValidationError::OptionCount(3)));
    }

    #[test]
    fn rejects_out_of_range_correct_index() {
        let mut q = sample();
        q.correct_index = 4;
        assert_eq!(q.validate(), Err(ValidationError::CorrectIndexRange(4)));
    }

    #[test]
    fn rejects_short_question() {
        let mut q = sample();
        q.question = "Hi?".to_string();
        assert_eq!(q.validate(), Err(ValidationError::QuestionLength(3)));
    }

    #[test]
    fn rejects_empty_seed_echo() {
        let mut q = sample();
        q.seed_echo.clear();
        assert_eq!(q.validate(), Err(ValidationError::EmptySeedEcho));
    }

    #[test]
    fn serde_round_trip_uses_camel_case_fields() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(json["seedEcho"], "abc123");
        assert_eq!(json["correctIndex"], 2);
        assert_eq!(json["category"], "science");
    }
}
