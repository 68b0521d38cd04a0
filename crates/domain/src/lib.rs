pub mod game;
pub mod library;
pub mod question;
pub mod rounds;
pub mod scoring;

pub use game::{
    BankQuestion, GameCategory, GameMode, GameState, GameStats, GameStatus, Player,
};
pub use library::{QuestionDoc, QuestionDraft, QuestionSource};
pub use question::{
    Difficulty, PersonalityFlags, Quips, Tone, TriviaCategory, TriviaQuestion, ValidationError,
};
pub use rounds::{RoundMeta, RoundRole, RoundType, TriviaPair};
pub use scoring::{score_round, ScoreBreakdown, ScoreRoundArgs};
