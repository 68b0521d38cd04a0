//! Engine configuration.
//!
//! Every component takes its configuration explicitly at construction time;
//! `from_env` helpers exist for callers that want the conventional
//! environment wiring, with the fallback precedence documented per field.

use std::time::Duration;

use quizsmith_domain::PersonalityFlags;

use crate::infrastructure::retry::RetryPolicy;

/// Default single-question generation model.
pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

/// Default chat-completions base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Models tried in order for batch refills until one yields parseable
/// content.
pub const DEFAULT_BATCH_MODELS: [&str; 3] = [
    "openrouter/anthropic/claude-3-haiku",
    "openrouter/openai/gpt-4o-mini",
    "openrouter/auto",
];

/// Settings for the generative question provider and chat client.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Credential for the chat backend. `None` disables generation; the bank
    /// then recycles local stock instead.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model for single-question generation.
    pub model: String,
    /// Optional attribution headers forwarded to the backend.
    pub referer: Option<String>,
    pub app_title: Option<String>,
    pub flags: PersonalityFlags,
    /// Minimum spacing between generation requests for the same
    /// (category, role) stream.
    pub min_interval: Duration,
    /// Pause between paired-role retry attempts, long enough to clear the
    /// rate-limit window.
    pub retry_pause: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            referer: None,
            app_title: None,
            flags: PersonalityFlags::default(),
            min_interval: Duration::from_secs(1),
            retry_pause: Duration::from_millis(1100),
        }
    }
}

impl GenerationConfig {
    /// Read configuration from the environment.
    ///
    /// Precedence: `OPENROUTER_API_KEY` for the credential (unset means
    /// generation is disabled); `OPENROUTER_MODEL` for the model, falling
    /// back to [`DEFAULT_MODEL`]; everything else takes its default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        config
    }
}

/// Settings for the optional remote library mirror.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub base_url: String,
    pub api_key: String,
}

impl MirrorConfig {
    /// Read mirror configuration from `MIRROR_URL` / `MIRROR_ANON_KEY`.
    /// Either one missing means no mirror, which every caller treats as a
    /// silent no-op.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("MIRROR_URL").ok()?;
        let api_key = std::env::var("MIRROR_ANON_KEY").ok()?;
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return None;
        }
        Some(Self { base_url, api_key })
    }
}

/// Settings for the question bank's refill orchestration.
#[derive(Debug, Clone)]
pub struct BankConfig {
    /// Fresh questions requested per refill.
    pub batch_size: usize,
    /// Consecutive failures before a category enters cooldown.
    pub fail_threshold: u32,
    /// How long a cooled-down category skips generation.
    pub cooldown: chrono::Duration,
    /// Models tried in order for batch refills.
    pub batch_models: Vec<String>,
    pub retry: RetryPolicy,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            batch_size: 6,
            fail_threshold: 3,
            cooldown: chrono::Duration::seconds(60),
            batch_models: DEFAULT_BATCH_MODELS.iter().map(|m| m.to_string()).collect(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Top-level configuration for [`crate::app::Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub generation: GenerationConfig,
    pub mirror: Option<MirrorConfig>,
    pub bank: BankConfig,
    /// Path of the SQLite database holding the question library and
    /// snapshots.
    pub database_path: String,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            generation: GenerationConfig::from_env(),
            mirror: MirrorConfig::from_env(),
            bank: BankConfig::default(),
            database_path: std::env::var("QUIZSMITH_DB")
                .unwrap_or_else(|_| "quizsmith.db".to_string()),
        }
    }
}
