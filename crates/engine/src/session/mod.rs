//! Game session service.
//!
//! Owns per-session player state, turn order, win detection and stats, and
//! composes the question bank. Session and stats snapshots round-trip
//! through the injected key-value store: loaded on construction, saved on
//! every mutation. Corrupt or missing snapshots degrade to a fresh session;
//! snapshot write failures are logged, never surfaced - the game must not
//! hard-fail over persistence.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use quizsmith_domain::{
    BankQuestion, GameCategory, GameMode, GameState, GameStats, GameStatus, Player,
};

use crate::bank::QuestionBank;
use crate::infrastructure::ports::{ClockPort, KvPort};

pub const STATE_KEY: &str = "session::game_state";
pub const STATS_KEY: &str = "session::game_stats";

/// Streak length that earns the pick-your-own-category privilege.
pub const CHOOSE_CATEGORY_STREAK: u32 = 3;

const NO_QUESTION_QUIP: &str = "No question to answer!";
const NO_PLAYER_QUIP: &str = "No player found!";
const GENERIC_WRONG_QUIP: &str = "Wrong! Try harder next time.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub quip: String,
}

struct SessionState {
    game: Option<GameState>,
    stats: GameStats,
}

pub struct GameSessionService {
    bank: Arc<QuestionBank>,
    kv: Arc<dyn KvPort>,
    clock: Arc<dyn ClockPort>,
    state: Mutex<SessionState>,
}

impl GameSessionService {
    /// Construct and restore any persisted snapshot.
    pub async fn new(
        bank: Arc<QuestionBank>,
        kv: Arc<dyn KvPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let game = Self::load_snapshot::<GameState>(kv.as_ref(), STATE_KEY).await;
        let stats = Self::load_snapshot::<GameStats>(kv.as_ref(), STATS_KEY)
            .await
            .unwrap_or_default();
        Self {
            bank,
            kv,
            clock,
            state: Mutex::new(SessionState { game, stats }),
        }
    }

    async fn load_snapshot<T: serde::de::DeserializeOwned>(kv: &dyn KvPort, key: &str) -> Option<T> {
        match kv.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key, error = %e, "discarding corrupt session snapshot");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to load session snapshot");
                None
            }
        }
    }

    pub async fn create_single_player_game(&self, player_name: &str) -> GameState {
        let now = self.clock.now();
        let game = GameState {
            id: format!("solo_{}", now.timestamp_millis()),
            status: GameStatus::Active,
            current_turn: "player1".to_string(),
            players: vec![Player::new("player1", player_name)],
            winner: None,
            mode: GameMode::Single,
            current_category: None,
            current_question: None,
        };
        {
            let mut state = self.state.lock().await;
            state.game = Some(game.clone());
            state.stats = GameStats::new(now);
        }
        self.persist().await;
        game
    }

    pub async fn create_multiplayer_game(&self, host_name: &str, game_code: &str) -> GameState {
        let now = self.clock.now();
        let mut host = Player::new("host", host_name);
        host.is_host = true;
        let game = GameState {
            id: game_code.to_string(),
            status: GameStatus::Waiting,
            current_turn: "host".to_string(),
            players: vec![host],
            winner: None,
            mode: GameMode::Multiplayer,
            current_category: None,
            current_question: None,
        };
        {
            let mut state = self.state.lock().await;
            state.game = Some(game.clone());
            state.stats = GameStats::new(now);
        }
        self.persist().await;
        game
    }

    /// Join a waiting multiplayer game by code. Returns `None` when no such
    /// game is waiting; the caller creates one instead.
    pub async fn join_multiplayer_game(
        &self,
        player_name: &str,
        game_code: &str,
    ) -> Option<GameState> {
        let joined = {
            let mut state = self.state.lock().await;
            let game = state.game.as_mut()?;
            if game.id != game_code
                || game.mode != GameMode::Multiplayer
                || game.status != GameStatus::Waiting
            {
                return None;
            }
            game.players.push(Player::new("player2", player_name));
            game.status = GameStatus::Active;
            game.clone()
        };
        self.persist().await;
        Some(joined)
    }

    /// Fetch the next question, picking uniformly among the current
    /// player's incomplete categories when none is given. Returns `None`
    /// with no session, no current player, or all categories complete.
    pub async fn get_next_question(&self, category: Option<GameCategory>) -> Option<BankQuestion> {
        let chosen = {
            let mut state = self.state.lock().await;
            let game = state.game.as_mut()?;
            let player = game.current_player()?;
            let chosen = match category {
                Some(category) => category,
                None => {
                    let incomplete = player.incomplete_categories();
                    *incomplete.choose(&mut rand::thread_rng())?
                }
            };
            game.current_category = Some(chosen);
            chosen
        };

        let question = self.bank.get_next_question(chosen).await;
        if let Some(question) = &question {
            {
                let mut state = self.state.lock().await;
                if let Some(game) = state.game.as_mut() {
                    game.current_question = Some(question.clone());
                }
            }
            self.persist().await;
        }
        question
    }

    /// Score an answer against the current question.
    ///
    /// Missing session, question or player yield a safe no-op outcome
    /// rather than an error, keeping the surrounding UI resilient.
    pub async fn answer_question(&self, answer_index: usize) -> AnswerOutcome {
        let outcome = {
            let mut state = self.state.lock().await;
            let SessionState { game, stats } = &mut *state;
            let Some(game) = game.as_mut() else {
                return AnswerOutcome {
                    correct: false,
                    quip: NO_QUESTION_QUIP.to_string(),
                };
            };
            let Some(question) = game.current_question.clone() else {
                return AnswerOutcome {
                    correct: false,
                    quip: NO_QUESTION_QUIP.to_string(),
                };
            };
            let current_turn = game.current_turn.clone();
            let current_category = game.current_category;
            let Some(player) = game.players.iter_mut().find(|p| p.id == current_turn) else {
                return AnswerOutcome {
                    correct: false,
                    quip: NO_PLAYER_QUIP.to_string(),
                };
            };

            stats.total_questions += 1;
            let correct = answer_index == question.answer_index;

            if correct {
                player.score += 1;
                player.streak += 1;
                stats.correct_answers += 1;

                if let Some(category) = current_category {
                    if player.complete_category(category) {
                        stats.categories_completed += 1;
                    }
                }
                if player.streak > stats.longest_streak {
                    stats.longest_streak = player.streak;
                }
                if player.completed_categories.len() == GameCategory::ALL.len() {
                    let winner = player.id.clone();
                    game.status = GameStatus::Completed;
                    game.winner = Some(winner);
                }

                AnswerOutcome {
                    correct: true,
                    quip: question.correct_quip.clone(),
                }
            } else {
                player.streak = 0;
                game.advance_turn();
                AnswerOutcome {
                    correct: false,
                    quip: question
                        .wrong_quip(answer_index)
                        .unwrap_or(GENERIC_WRONG_QUIP)
                        .to_string(),
                }
            }
        };
        self.persist().await;
        outcome
    }

    /// True when the current player's streak has earned a category pick.
    pub async fn can_choose_category(&self) -> bool {
        let state = self.state.lock().await;
        state
            .game
            .as_ref()
            .and_then(|game| game.current_player())
            .is_some_and(|player| player.streak >= CHOOSE_CATEGORY_STREAK)
    }

    pub async fn game_state(&self) -> Option<GameState> {
        self.state.lock().await.game.clone()
    }

    pub async fn current_player(&self) -> Option<Player> {
        let state = self.state.lock().await;
        state
            .game
            .as_ref()
            .and_then(|game| game.current_player())
            .cloned()
    }

    /// Stats with accuracy and session time recomputed on read.
    pub async fn game_stats(&self) -> GameStats {
        let mut stats = self.state.lock().await.stats.clone();
        stats.refresh(self.clock.now());
        stats
    }

    /// Drop the session, stats, bank stock and persisted snapshots.
    pub async fn reset_game(&self) {
        {
            let mut state = self.state.lock().await;
            state.game = None;
            state.stats = GameStats::default();
        }
        self.bank.reset().await;
        for key in [STATE_KEY, STATS_KEY] {
            if let Err(e) = self.kv.remove(key).await {
                tracing::warn!(key, error = %e, "failed to clear session snapshot");
            }
        }
    }

    async fn persist(&self) {
        let (game_json, stats_json) = {
            let state = self.state.lock().await;
            let game_json = state
                .game
                .as_ref()
                .and_then(|game| serde_json::to_string(game).ok());
            let stats_json = serde_json::to_string(&state.stats).ok();
            (game_json, stats_json)
        };
        if let Some(json) = game_json {
            if let Err(e) = self.kv.set(STATE_KEY, &json).await {
                tracing::warn!(error = %e, "failed to persist game state");
            }
        }
        if let Some(json) = stats_json {
            if let Err(e) = self.kv.set(STATS_KEY, &json).await {
                tracing::warn!(error = %e, "failed to persist game stats");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::config::BankConfig;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::kv::MemoryKv;

    async fn service_with(kv: Arc<MemoryKv>) -> GameSessionService {
        let clock = Arc::new(FixedClock(Utc::now()));
        let bank = Arc::new(QuestionBank::new(None, clock.clone(), BankConfig::default()));
        GameSessionService::new(bank, kv, clock).await
    }

    async fn service() -> GameSessionService {
        service_with(Arc::new(MemoryKv::new())).await
    }

    /// Answer one question in `category` correctly.
    async fn answer_correctly(service: &GameSessionService, category: GameCategory) {
        let question = service
            .get_next_question(Some(category))
            .await
            .expect("bank never runs dry");
        let outcome = service.answer_question(question.answer_index).await;
        assert!(outcome.correct);
    }

    #[tokio::test]
    async fn single_player_game_starts_active() {
        let service = service().await;
        let game = service.create_single_player_game("Sam").await;
        assert_eq!(game.status, GameStatus::Active);
        assert_eq!(game.current_turn, "player1");
        assert_eq!(game.mode, GameMode::Single);
        assert_eq!(game.players.len(), 1);
    }

    #[tokio::test]
    async fn multiplayer_waits_for_a_second_player() {
        let service = service().await;
        let game = service.create_multiplayer_game("Host", "CODE42").await;
        assert_eq!(game.status, GameStatus::Waiting);
        assert!(game.players[0].is_host);

        assert!(service.join_multiplayer_game("Guest", "WRONG").await.is_none());

        let joined = service
            .join_multiplayer_game("Guest", "CODE42")
            .await
            .expect("joined");
        assert_eq!(joined.status, GameStatus::Active);
        assert_eq!(joined.players.len(), 2);

        // A game that is no longer waiting cannot be joined again.
        assert!(service
            .join_multiplayer_game("Third", "CODE42")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn correct_answer_updates_score_streak_and_category() {
        let service = service().await;
        service.create_single_player_game("Sam").await;
        answer_correctly(&service, GameCategory::Science).await;

        let player = service.current_player().await.expect("player");
        assert_eq!(player.score, 1);
        assert_eq!(player.streak, 1);
        assert_eq!(player.completed_categories, vec![GameCategory::Science]);

        let stats = service.game_stats().await;
        assert_eq!(stats.total_questions, 1);
        assert_eq!(stats.correct_answers, 1);
        assert_eq!(stats.accuracy, 100);
        assert_eq!(stats.categories_completed, 1);
    }

    #[tokio::test]
    async fn wrong_answer_resets_streak_and_returns_indexed_quip() {
        let service = service().await;
        service.create_single_player_game("Sam").await;
        let question = service
            .get_next_question(Some(GameCategory::History))
            .await
            .expect("question");
        let wrong_index = (0..4).find(|i| *i != question.answer_index).expect("wrong");
        let outcome = service.answer_question(wrong_index).await;
        assert!(!outcome.correct);
        assert_eq!(
            outcome.quip,
            question.wrong_quip(wrong_index).expect("quip")
        );

        let player = service.current_player().await.expect("player");
        assert_eq!(player.streak, 0);
        // Single-player keeps the turn.
        assert_eq!(player.id, "player1");
    }

    #[tokio::test]
    async fn wrong_answer_passes_the_turn_in_multiplayer() {
        let service = service().await;
        service.create_multiplayer_game("Host", "CODE").await;
        service.join_multiplayer_game("Guest", "CODE").await.expect("join");

        let question = service
            .get_next_question(Some(GameCategory::Sports))
            .await
            .expect("question");
        let wrong_index = (0..4).find(|i| *i != question.answer_index).expect("wrong");
        service.answer_question(wrong_index).await;

        let state = service.game_state().await.expect("state");
        assert_eq!(state.current_turn, "player2");
    }

    #[tokio::test]
    async fn completing_all_six_categories_wins_the_game() {
        let service = service().await;
        service.create_single_player_game("Sam").await;

        for category in [
            GameCategory::History,
            GameCategory::Science,
            GameCategory::PopCulture,
            GameCategory::ArtMusic,
            GameCategory::Sports,
        ] {
            answer_correctly(&service, category).await;
        }
        // Five down: still active.
        let state = service.game_state().await.expect("state");
        assert_eq!(state.status, GameStatus::Active);
        assert!(state.winner.is_none());

        answer_correctly(&service, GameCategory::Random).await;
        let state = service.game_state().await.expect("state");
        assert_eq!(state.status, GameStatus::Completed);
        assert_eq!(state.winner.as_deref(), Some("player1"));

        // Every category complete: nothing left to auto-pick.
        assert!(service.get_next_question(None).await.is_none());
    }

    #[tokio::test]
    async fn category_choice_unlocks_at_a_streak_of_three() {
        let service = service().await;
        service.create_single_player_game("Sam").await;

        answer_correctly(&service, GameCategory::Science).await;
        answer_correctly(&service, GameCategory::History).await;
        assert!(!service.can_choose_category().await);

        answer_correctly(&service, GameCategory::Sports).await;
        assert!(service.can_choose_category().await);
    }

    #[tokio::test]
    async fn answering_without_a_question_is_a_safe_no_op() {
        let service = service().await;
        let outcome = service.answer_question(0).await;
        assert!(!outcome.correct);
        assert_eq!(outcome.quip, NO_QUESTION_QUIP);

        service.create_single_player_game("Sam").await;
        let outcome = service.answer_question(0).await;
        assert_eq!(outcome.quip, NO_QUESTION_QUIP);

        let stats = service.game_stats().await;
        assert_eq!(stats.total_questions, 0);
    }

    #[tokio::test]
    async fn session_round_trips_through_the_kv_store() {
        let kv = Arc::new(MemoryKv::new());
        {
            let service = service_with(kv.clone()).await;
            service.create_single_player_game("Sam").await;
            answer_correctly(&service, GameCategory::Science).await;
        }

        let restored = service_with(kv).await;
        let state = restored.game_state().await.expect("restored");
        assert_eq!(state.players[0].name, "Sam");
        assert_eq!(state.players[0].score, 1);
        let stats = restored.game_stats().await;
        assert_eq!(stats.correct_answers, 1);
    }

    #[tokio::test]
    async fn corrupt_snapshots_degrade_to_a_fresh_session() {
        let kv = Arc::new(MemoryKv::new());
        kv.set(STATE_KEY, "definitely not json").await.expect("set");
        kv.set(STATS_KEY, "{\"broken\":").await.expect("set");

        let service = service_with(kv).await;
        assert!(service.game_state().await.is_none());
        assert_eq!(service.game_stats().await.total_questions, 0);
    }

    #[tokio::test]
    async fn reset_clears_session_stats_and_snapshots() {
        let kv = Arc::new(MemoryKv::new());
        let service = service_with(kv.clone()).await;
        service.create_single_player_game("Sam").await;
        answer_correctly(&service, GameCategory::Science).await;

        service.reset_game().await;
        assert!(service.game_state().await.is_none());
        assert_eq!(service.game_stats().await.total_questions, 0);
        assert_eq!(kv.get(STATE_KEY).await.expect("kv"), None);
        assert_eq!(kv.get(STATS_KEY).await.expect("kv"), None);
    }

    #[tokio::test]
    async fn accuracy_is_recomputed_on_read() {
        let service = service().await;
        service.create_single_player_game("Sam").await;

        answer_correctly(&service, GameCategory::Science).await;
        answer_correctly(&service, GameCategory::History).await;
        let question = service
            .get_next_question(Some(GameCategory::Random))
            .await
            .expect("question");
        let wrong_index = (0..4).find(|i| *i != question.answer_index).expect("wrong");
        service.answer_question(wrong_index).await;

        let stats = service.game_stats().await;
        assert_eq!(stats.total_questions, 3);
        assert_eq!(stats.correct_answers, 2);
        assert_eq!(stats.accuracy, 67);
        assert_eq!(stats.longest_streak, 2);
    }
}
