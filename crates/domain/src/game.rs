//! Session-facing game state: bank questions, players, turn order, stats.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::question::TriviaCategory;

/// The six board categories a player must complete to win.
///
/// Serialized with display names because session snapshots and bank fixtures
/// use them as keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameCategory {
    #[serde(rename = "History")]
    History,
    #[serde(rename = "Science")]
    Science,
    #[serde(rename = "Pop Culture")]
    PopCulture,
    #[serde(rename = "Art & Music")]
    ArtMusic,
    #[serde(rename = "Sports")]
    Sports,
    #[serde(rename = "Random")]
    Random,
}

impl GameCategory {
    pub const ALL: [GameCategory; 6] = [
        GameCategory::History,
        GameCategory::Science,
        GameCategory::PopCulture,
        GameCategory::ArtMusic,
        GameCategory::Sports,
        GameCategory::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameCategory::History => "History",
            GameCategory::Science => "Science",
            GameCategory::PopCulture => "Pop Culture",
            GameCategory::ArtMusic => "Art & Music",
            GameCategory::Sports => "Sports",
            GameCategory::Random => "Random",
        }
    }
}

impl fmt::Display for GameCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<TriviaCategory> for GameCategory {
    /// Map the eight library categories onto the six board categories.
    /// Categories without a board slot land on Random.
    fn from(value: TriviaCategory) -> Self {
        match value {
            TriviaCategory::History => GameCategory::History,
            TriviaCategory::Science => GameCategory::Science,
            TriviaCategory::PopCulture => GameCategory::PopCulture,
            TriviaCategory::Arts => GameCategory::ArtMusic,
            TriviaCategory::Sports => GameCategory::Sports,
            TriviaCategory::Geography | TriviaCategory::Literature | TriviaCategory::Technology => {
                GameCategory::Random
            }
        }
    }
}

/// A question as held in the session pool.
///
/// `used` flips true exactly once, when the question is drawn; it resets only
/// on a bank reset or refill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankQuestion {
    pub id: String,
    pub category: GameCategory,
    pub question: String,
    pub choices: Vec<String>,
    pub answer_index: usize,
    pub correct_quip: String,
    /// Keyed by the wrong choice index; the correct index has no entry.
    pub wrong_answer_quips: BTreeMap<usize, String>,
    pub used: bool,
}

impl BankQuestion {
    pub fn wrong_quip(&self, chosen_index: usize) -> Option<&str> {
        self.wrong_answer_quips.get(&chosen_index).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Single,
    Multiplayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub completed_categories: Vec<GameCategory>,
    pub streak: u32,
    pub score: u32,
    #[serde(default)]
    pub is_host: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            completed_categories: Vec::new(),
            streak: 0,
            score: 0,
            is_host: false,
        }
    }

    pub fn has_completed(&self, category: GameCategory) -> bool {
        self.completed_categories.contains(&category)
    }

    /// Record a completed category. Returns true when it was newly added.
    pub fn complete_category(&mut self, category: GameCategory) -> bool {
        if self.has_completed(category) {
            return false;
        }
        self.completed_categories.push(category);
        true
    }

    pub fn incomplete_categories(&self) -> Vec<GameCategory> {
        GameCategory::ALL
            .into_iter()
            .filter(|c| !self.has_completed(*c))
            .collect()
    }
}

/// Per-session game state. Status only moves forward:
/// `waiting -> active -> completed` (single-player starts at `active`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub id: String,
    pub status: GameStatus,
    pub current_turn: String,
    pub players: Vec<Player>,
    #[serde(default)]
    pub winner: Option<String>,
    pub mode: GameMode,
    #[serde(default)]
    pub current_category: Option<GameCategory>,
    #[serde(default)]
    pub current_question: Option<BankQuestion>,
}

impl GameState {
    pub fn current_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.id == self.current_turn)
    }

    pub fn current_player_mut(&mut self) -> Option<&mut Player> {
        let turn = self.current_turn.clone();
        self.players.iter_mut().find(|p| p.id == turn)
    }

    /// Pass the turn to the next player in round-robin order.
    /// Single-player games never switch turns.
    pub fn advance_turn(&mut self) {
        if self.mode == GameMode::Single {
            return;
        }
        let Some(current) = self.players.iter().position(|p| p.id == self.current_turn) else {
            return;
        };
        let next = (current + 1) % self.players.len();
        self.current_turn = self.players[next].id.clone();
    }
}

/// Monotonically accumulating session counters.
///
/// `accuracy` and `session_time` are derived on read; everything else only
/// grows until a reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub total_questions: u32,
    pub correct_answers: u32,
    pub accuracy: u32,
    pub longest_streak: u32,
    pub categories_completed: u32,
    /// Seconds since the session started, refreshed on read.
    pub session_time: u64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

impl GameStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            total_questions: 0,
            correct_answers: 0,
            accuracy: 0,
            longest_streak: 0,
            categories_completed: 0,
            session_time: 0,
            started_at: Some(started_at),
        }
    }

    /// Recompute the derived fields against `now`.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.accuracy = if self.total_questions > 0 {
            let ratio = f64::from(self.correct_answers) / f64::from(self.total_questions);
            (ratio * 100.0).round() as u32
        } else {
            0
        };
        if let Some(started) = self.started_at {
            self.session_time = (now - started).num_seconds().max(0) as u64;
        }
    }
}
