//! Composition root.
//!
//! Wires the adapters and services together from an [`EngineConfig`]. No
//! globals: callers hold the returned [`Engine`] and pass references down.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::bank::QuestionBank;
use crate::config::EngineConfig;
use crate::generate::filter::StandardContentFilter;
use crate::generate::QuestionProvider;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::kv::SqliteKv;
use crate::infrastructure::openrouter::OpenRouterClient;
use crate::infrastructure::ports::{
    ChatPort, ClockPort, KvError, MirrorPort, StoreError,
};
use crate::infrastructure::rest_mirror::RestMirror;
use crate::infrastructure::sqlite_store::SqliteQuestionStore;
use crate::library::fill::FillService;
use crate::library::LibraryService;
use crate::session::GameSessionService;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Kv(#[from] KvError),
}

/// The wired engine. Generation-dependent services are present only when a
/// credential is configured; the bank and sessions always work, degrading
/// to local stock.
pub struct Engine {
    pub bank: Arc<QuestionBank>,
    pub library: Arc<LibraryService>,
    pub sessions: Arc<GameSessionService>,
    pub provider: Option<Arc<QuestionProvider>>,
    pub fill: Option<Arc<FillService>>,
}

impl Engine {
    pub async fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());

        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.database_path))
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let store = Arc::new(SqliteQuestionStore::with_pool(pool.clone()).await?);
        let kv = Arc::new(SqliteKv::with_pool(pool).await?);

        let chat: Option<Arc<dyn ChatPort>> = OpenRouterClient::from_config(&config.generation)
            .map(|client| Arc::new(client) as Arc<dyn ChatPort>);
        let mirror: Option<Arc<dyn MirrorPort>> = RestMirror::from_config(config.mirror.as_ref())
            .map(|mirror| Arc::new(mirror) as Arc<dyn MirrorPort>);

        let library = Arc::new(LibraryService::new(store, mirror, clock.clone()));
        let bank = Arc::new(QuestionBank::new(
            chat.clone(),
            clock.clone(),
            config.bank.clone(),
        ));
        let sessions = Arc::new(GameSessionService::new(bank.clone(), kv.clone(), clock.clone()).await);

        let (provider, fill) = match chat {
            Some(chat) => {
                let provider = Arc::new(QuestionProvider::new(
                    chat,
                    kv,
                    clock,
                    Arc::new(StandardContentFilter::new()),
                    config.generation.clone(),
                ));
                let fill = Arc::new(FillService::new(provider.clone(), library.clone()));
                (Some(provider), Some(fill))
            }
            None => (None, None),
        };

        Ok(Self {
            bank,
            library,
            sessions,
            provider,
            fill,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizsmith_domain::GameCategory;

    #[tokio::test]
    async fn engine_without_credential_runs_on_local_stock() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.db");
        let config = EngineConfig {
            generation: crate::config::GenerationConfig::default(),
            mirror: None,
            bank: crate::config::BankConfig::default(),
            database_path: path.to_str().expect("utf8").to_string(),
        };

        let engine = Engine::from_config(config).await.expect("engine");
        assert!(engine.provider.is_none());
        assert!(engine.fill.is_none());

        engine.sessions.create_single_player_game("Sam").await;
        let question = engine
            .sessions
            .get_next_question(Some(GameCategory::Science))
            .await
            .expect("local stock");
        assert!(!question.question.is_empty());
    }

    #[tokio::test]
    async fn engine_with_credential_wires_generation_services() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.db");
        let mut config = EngineConfig {
            generation: crate::config::GenerationConfig::default(),
            mirror: None,
            bank: crate::config::BankConfig::default(),
            database_path: path.to_str().expect("utf8").to_string(),
        };
        config.generation.api_key = Some("sk-test".to_string());

        let engine = Engine::from_config(config).await.expect("engine");
        assert!(engine.provider.is_some());
        assert!(engine.fill.is_some());
    }
}
