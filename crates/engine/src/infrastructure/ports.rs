//! Port traits for infrastructure boundaries.
//!
//! These are the only abstractions in the engine. Ports exist for:
//! - The chat-completion backend (could swap OpenRouter -> any OpenAI-shaped API)
//! - The durable question library (could swap SQLite -> Postgres)
//! - The remote library mirror (best-effort, failures are non-fatal)
//! - Key-value snapshot storage (session state, generation cache)
//! - Clock (for testing rate limits and cooldowns)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use quizsmith_domain::{Difficulty, QuestionDoc, TriviaCategory};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    /// The backend answered with a non-2xx status.
    #[error("chat backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("chat request failed: {0}")]
    Transport(String),
    #[error("invalid chat response: {0}")]
    InvalidResponse(String),
}

impl ChatError {
    /// Transient failures worth a backoff-and-retry: 429, 5xx, and transport
    /// errors. Anything else is a caller bug or a hard rejection.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            ChatError::Transport(_) => true,
            ChatError::InvalidResponse(_) => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("library database error: {0}")]
    Database(String),
    #[error("library serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("kv storage error: {0}")]
    Storage(String),
}

// =============================================================================
// Chat backend
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ChatChoice {
    pub index: u32,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub id: String,
    pub choices: Vec<ChatChoice>,
    pub model: Option<String>,
}

impl ChatResponse {
    /// Content of the first assistant choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.content.as_str())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError>;
}

// =============================================================================
// Durable question library
// =============================================================================

/// Filter for drawing one ready-to-serve document.
#[derive(Debug, Clone)]
pub struct DrawFilter {
    pub category: TriviaCategory,
    pub difficulty: Difficulty,
    pub exclude_ids: Vec<String>,
}

/// Filter for counting/listing library contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryFilter {
    pub category: Option<TriviaCategory>,
    pub difficulty: Option<Difficulty>,
}

/// Batch insertion outcome. `duplicates` counts candidates whose stem hash
/// was already present (including collisions within the batch itself).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOutcome {
    pub inserted: u32,
    pub duplicates: u32,
}

#[async_trait]
pub trait QuestionStorePort: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<QuestionDoc>, StoreError>;

    async fn find_by_hash(&self, stem_hash: &str) -> Result<Option<QuestionDoc>, StoreError>;

    /// Insert a batch transactionally. A document whose stem hash collides
    /// with a stored one (or an earlier one in the same batch) is skipped and
    /// reported as a duplicate; it never overwrites.
    async fn insert_many(&self, docs: &[QuestionDoc]) -> Result<PutOutcome, StoreError>;

    /// Draw uniformly at random among unused documents matching category and
    /// difficulty, excluding `exclude_ids`; broadens to the whole category
    /// when the exact pool is dry. Returns `None` when nothing qualifies.
    async fn draw_one(&self, filter: &DrawFilter) -> Result<Option<QuestionDoc>, StoreError>;

    /// Record first use. Idempotent: a document already marked keeps its
    /// original timestamp.
    async fn mark_used(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn count(&self, filter: &LibraryFilter) -> Result<u64, StoreError>;

    async fn list(
        &self,
        filter: &LibraryFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<QuestionDoc>, StoreError>;
}

// =============================================================================
// Remote library mirror
// =============================================================================

#[derive(Debug, Clone)]
pub struct MirrorBatchQuery {
    pub category: TriviaCategory,
    pub difficulty: Difficulty,
    pub limit: Option<usize>,
    pub exclude_hashes: Vec<String>,
}

/// Best-effort mirror of the library against a shared backend.
///
/// Implementations never fail: an unreachable or misconfigured mirror
/// reports every pushed document as unconfirmed (`duplicates`) and fetches
/// nothing. Local persistence has already succeeded by the time these run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MirrorPort: Send + Sync {
    async fn upsert_many(&self, docs: &[QuestionDoc]) -> PutOutcome;

    async fn fetch_batch(&self, query: &MirrorBatchQuery) -> Vec<QuestionDoc>;
}

// =============================================================================
// Key-value snapshot storage
// =============================================================================

/// Minimal persistence surface for session snapshots and the generation
/// cache. Injected so tests can substitute an in-memory map.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KvPort: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
    async fn remove(&self, key: &str) -> Result<(), KvError>;
}

// =============================================================================
// Clock
// =============================================================================

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
