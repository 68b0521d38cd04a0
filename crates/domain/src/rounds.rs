//! Round identity and paired-question types for symmetric multiplayer rounds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::question::{Difficulty, Tone, TriviaCategory, TriviaQuestion};

/// Which side of a paired round a generation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundRole {
    A,
    B,
}

impl fmt::Display for RoundRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundRole::A => write!(f, "A"),
            RoundRole::B => write!(f, "B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    Normal,
    BinaryBlitz,
    SpeedLink,
    FinalAttack,
}

/// Identity shared by both halves of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundMeta {
    pub round_id: String,
    pub round_seed: String,
    pub category: TriviaCategory,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tone: Option<Tone>,
    pub round_type: RoundType,
}

impl RoundMeta {
    /// Token shared by roles A and B so their questions come out
    /// difficulty-matched without sharing facts.
    pub fn diff_token(&self) -> String {
        format!("{}:{}:{}", self.round_seed, self.category, self.difficulty)
    }
}

/// Two independently validated questions sharing one round identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriviaPair {
    pub a: TriviaQuestion,
    pub b: TriviaQuestion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_token_combines_seed_category_difficulty() {
        let meta = RoundMeta {
            round_id: "r1".to_string(),
            round_seed: "seed42".to_string(),
            category: TriviaCategory::Geography,
            difficulty: Difficulty::Hard,
            tone: None,
            round_type: RoundType::Normal,
        };
        assert_eq!(meta.diff_token(), "seed42:geography:hard");
    }
}
