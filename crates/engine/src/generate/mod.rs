//! Generative question provider.
//!
//! Wraps the chat backend with prompt construction, schema validation,
//! seed-echo verification, content-safety filtering, a per-stream rate
//! limit, and a persistent result cache. Transport failures are terminal
//! here; the question bank layers its own backoff and local fallback on top.

pub mod filter;
pub mod paired;
pub(crate) mod prompts;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use quizsmith_domain::{
    Difficulty, PersonalityFlags, RoundRole, Tone, TriviaCategory, TriviaQuestion,
};

use crate::config::GenerationConfig;
use crate::infrastructure::ports::{
    ChatError, ChatMessage, ChatPort, ChatRequest, ClockPort, KvPort,
};
use filter::ContentFilter;

/// Validation attempts per generation call, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Stricter regeneration calls allowed after a content-filter rejection.
pub const MAX_CONTENT_RETRIES: u32 = 2;

const NORMAL_TEMPERATURE: f32 = 0.7;
const CONTENT_RETRY_TEMPERATURE: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("rate limit for {0}: try again in a moment")]
    RateLimited(TriviaCategory),
    #[error("generated content failed schema validation: {0}")]
    Schema(String),
    #[error("seed echo mismatch: expected {expected}, got {got}")]
    SeedEchoMismatch { expected: String, got: String },
    #[error("content filter rejection")]
    ContentRejected,
    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl GenerateError {
    /// Validation-class failures: another attempt with the same inputs could
    /// plausibly succeed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GenerateError::Schema(_) | GenerateError::SeedEchoMismatch { .. }
        )
    }
}

/// Caller-facing generation request. Unset optional fields take their
/// defaults: fresh seed, configured flags, snark tone, role A, diff token =
/// seed.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub category: TriviaCategory,
    pub difficulty: Difficulty,
    pub seed: Option<String>,
    pub tone: Option<Tone>,
    pub flags: Option<PersonalityFlags>,
    pub role: Option<RoundRole>,
    pub diff_token: Option<String>,
}

impl GenerateParams {
    pub fn new(category: TriviaCategory, difficulty: Difficulty) -> Self {
        Self {
            category,
            difficulty,
            seed: None,
            tone: None,
            flags: None,
            role: None,
            diff_token: None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedParams {
    pub category: TriviaCategory,
    pub difficulty: Difficulty,
    pub seed: String,
    pub tone: Tone,
    pub flags: PersonalityFlags,
    pub role: RoundRole,
    pub diff_token: String,
}

/// Remove a Markdown code fence around a JSON payload, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag up to the first newline, then the closing fence.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

pub struct QuestionProvider {
    chat: Arc<dyn ChatPort>,
    cache: Arc<dyn KvPort>,
    clock: Arc<dyn ClockPort>,
    filter: Arc<dyn ContentFilter>,
    config: GenerationConfig,
    last_call: DashMap<(TriviaCategory, RoundRole), DateTime<Utc>>,
}

impl QuestionProvider {
    pub fn new(
        chat: Arc<dyn ChatPort>,
        cache: Arc<dyn KvPort>,
        clock: Arc<dyn ClockPort>,
        filter: Arc<dyn ContentFilter>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            chat,
            cache,
            clock,
            filter,
            config,
            last_call: DashMap::new(),
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate one validated question.
    ///
    /// Makes one or two network calls: the attempt itself, plus at most the
    /// bounded stricter regenerations after a content rejection. Schema and
    /// seed-echo failures are retried up to [`MAX_ATTEMPTS`]; the final error
    /// is returned once the budget is spent.
    pub async fn generate_question(
        &self,
        params: GenerateParams,
    ) -> Result<TriviaQuestion, GenerateError> {
        let p = self.resolve(params);
        self.enforce_rate_limit(&p)?;

        if let Some(hit) = self.load_cached(&p).await {
            return Ok(hit);
        }

        let system = prompts::system_prompt(&p.flags, p.tone);
        let example = prompts::schema_example();
        let mut last_err = GenerateError::Schema("empty response".to_string());

        for attempt in 1..=MAX_ATTEMPTS {
            let user = prompts::user_prompt(&p, &example, attempt > 1);
            let response = self
                .chat
                .chat(ChatRequest {
                    model: self.config.model.clone(),
                    messages: vec![ChatMessage::system(&system), ChatMessage::user(user)],
                    temperature: Some(NORMAL_TEMPERATURE),
                    max_tokens: None,
                })
                .await?;
            let text = strip_code_fences(response.first_content().unwrap_or_default());

            let question: TriviaQuestion = match serde_json::from_str(text) {
                Ok(question) => question,
                Err(e) => {
                    last_err = GenerateError::Schema(e.to_string());
                    continue;
                }
            };
            if let Err(e) = question.validate() {
                last_err = GenerateError::Schema(e.to_string());
                continue;
            }
            if question.seed_echo != p.seed {
                let err = GenerateError::SeedEchoMismatch {
                    expected: p.seed.clone(),
                    got: question.seed_echo.clone(),
                };
                if attempt < MAX_ATTEMPTS {
                    last_err = err;
                    continue;
                }
                return Err(err);
            }
            if !self.filter.allows(&question, &p.flags) {
                return self.regenerate_for_content(&p, &system, &example).await;
            }

            self.store_cached(&p, &question).await;
            return Ok(question);
        }

        Err(last_err)
    }

    fn resolve(&self, params: GenerateParams) -> ResolvedParams {
        let seed = params
            .seed
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let diff_token = params
            .diff_token
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| seed.clone());
        ResolvedParams {
            category: params.category,
            difficulty: params.difficulty,
            seed,
            tone: params.tone.unwrap_or(Tone::Snark),
            flags: params.flags.unwrap_or(self.config.flags),
            role: params.role.unwrap_or(RoundRole::A),
            diff_token,
        }
    }

    fn enforce_rate_limit(&self, p: &ResolvedParams) -> Result<(), GenerateError> {
        let now = self.clock.now();
        let key = (p.category, p.role);
        if let Some(last) = self.last_call.get(&key) {
            // A clock that went backwards counts as "too soon".
            let elapsed = (now - *last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < self.config.min_interval {
                return Err(GenerateError::RateLimited(p.category));
            }
        }
        self.last_call.insert(key, now);
        Ok(())
    }

    /// Bounded stricter regenerations after a content rejection; terminal
    /// [`GenerateError::ContentRejected`] when they run out.
    async fn regenerate_for_content(
        &self,
        p: &ResolvedParams,
        system: &str,
        example: &str,
    ) -> Result<TriviaQuestion, GenerateError> {
        for _ in 0..MAX_CONTENT_RETRIES {
            let stricter_system = format!(
                "{system} Reminder: You violated content constraints; \
                 rewrite within PG-13 and kindness rules."
            );
            let user = prompts::user_prompt(p, example, true);
            let response = self
                .chat
                .chat(ChatRequest {
                    model: self.config.model.clone(),
                    messages: vec![ChatMessage::system(stricter_system), ChatMessage::user(user)],
                    temperature: Some(CONTENT_RETRY_TEMPERATURE),
                    max_tokens: None,
                })
                .await?;
            let text = strip_code_fences(response.first_content().unwrap_or_default());
            let Ok(question) = serde_json::from_str::<TriviaQuestion>(text) else {
                continue;
            };
            if question.validate().is_err() {
                continue;
            }
            if self.filter.allows(&question, &p.flags) {
                tracing::info!(category = %p.category, "regeneration cleared the content filter");
                self.store_cached(p, &question).await;
                return Ok(question);
            }
        }
        Err(GenerateError::ContentRejected)
    }

    fn cache_key(p: &ResolvedParams) -> String {
        format!(
            "qgen::{}|{}|{}|{}|{}",
            p.category, p.difficulty, p.seed, p.role, p.diff_token
        )
    }

    async fn load_cached(&self, p: &ResolvedParams) -> Option<TriviaQuestion> {
        let raw = self.cache.get(&Self::cache_key(p)).await.ok()??;
        serde_json::from_str(&raw).ok()
    }

    async fn store_cached(&self, p: &ResolvedParams, question: &TriviaQuestion) {
        let Ok(raw) = serde_json::to_string(question) else {
            return;
        };
        if let Err(e) = self.cache.set(&Self::cache_key(p), &raw).await {
            tracing::warn!(error = %e, "generation cache save skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::kv::MemoryKv;
    use crate::infrastructure::ports::{ChatChoice, ChatResponse};
    use super::filter::StandardContentFilter;

    /// Chat fake that replays a script of responses and records requests.
    struct ScriptedChat {
        responses: Mutex<VecDeque<Result<ChatResponse, ChatError>>>,
        calls: AtomicU32,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedChat {
        fn new(script: Vec<Result<ChatResponse, ChatError>>) -> Self {
            Self {
                responses: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn replying(contents: &[&str]) -> Self {
            Self::new(contents.iter().map(|c| Ok(reply(c))).collect())
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatPort for ScriptedChat {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().expect("requests lock").push(request);
            self.responses
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::InvalidResponse("script exhausted".into())))
        }
    }

    fn reply(content: &str) -> ChatResponse {
        ChatResponse {
            id: "resp".to_string(),
            choices: vec![ChatChoice {
                index: 0,
                content: content.to_string(),
            }],
            model: Some("test-model".to_string()),
        }
    }

    fn payload(seed: &str) -> String {
        serde_json::json!({
            "category": "science",
            "difficulty": "easy",
            "seedEcho": seed,
            "question": "What gas do plants absorb during photosynthesis?",
            "options": ["Oxygen", "Hydrogen", "Carbon Dioxide", "Nitrogen"],
            "correctIndex": 2,
            "explanation": "Plants absorb carbon dioxide and release oxygen.",
            "quips": {
                "correct": "Photosynthetic perfection.",
                "incorrect": "Leaf that choice behind.",
            },
        })
        .to_string()
    }

    fn provider(chat: Arc<dyn ChatPort>, cache: Arc<MemoryKv>) -> QuestionProvider {
        let mut config = GenerationConfig::default();
        // Tests fire requests back to back; disable pacing.
        config.min_interval = Duration::ZERO;
        QuestionProvider::new(
            chat,
            cache,
            Arc::new(FixedClock(Utc::now())),
            Arc::new(StandardContentFilter::new()),
            config,
        )
    }

    fn params(seed: &str) -> GenerateParams {
        GenerateParams {
            seed: Some(seed.to_string()),
            ..GenerateParams::new(TriviaCategory::Science, Difficulty::Easy)
        }
    }

    #[tokio::test]
    async fn returns_validated_question_and_caches_it() {
        let body = payload("test-seed");
        let chat = Arc::new(ScriptedChat::replying(&[body.as_str()]));
        let cache = Arc::new(MemoryKv::new());
        let provider = provider(chat.clone(), cache.clone());

        let question = provider
            .generate_question(params("test-seed"))
            .await
            .expect("generated");
        assert_eq!(question.seed_echo, "test-seed");

        let key = "qgen::science|easy|test-seed|A|test-seed";
        assert!(cache.get(key).await.expect("kv").is_some());
    }

    #[tokio::test]
    async fn cached_question_skips_the_backend() {
        let body = payload("s1");
        let chat = Arc::new(ScriptedChat::replying(&[body.as_str()]));
        let cache = Arc::new(MemoryKv::new());
        let provider = provider(chat.clone(), cache);

        let first = provider.generate_question(params("s1")).await.expect("ok");
        let second = provider.generate_question(params("s1")).await.expect("ok");
        assert_eq!(first, second);
        assert_eq!(chat.calls(), 1);
    }

    #[tokio::test]
    async fn strips_code_fences_before_parsing() {
        let fenced = format!("```json\n{}\n```", payload("s2"));
        let chat = Arc::new(ScriptedChat::replying(&[fenced.as_str()]));
        let provider = provider(chat, Arc::new(MemoryKv::new()));

        let question = provider.generate_question(params("s2")).await.expect("ok");
        assert_eq!(question.correct_index, 2);
    }

    #[tokio::test]
    async fn malformed_json_fails_after_exactly_three_attempts() {
        let chat = Arc::new(ScriptedChat::replying(&[
            "not json",
            "still not json",
            "never json",
            "unreached",
        ]));
        let provider = provider(chat.clone(), Arc::new(MemoryKv::new()));

        let err = provider
            .generate_question(params("s3"))
            .await
            .expect_err("should fail");
        assert!(matches!(err, GenerateError::Schema(_)));
        assert_eq!(chat.calls(), 3);
    }

    #[tokio::test]
    async fn seed_echo_mismatch_retries_then_fails() {
        let wrong = payload("other-seed");
        let chat = Arc::new(ScriptedChat::replying(&[&wrong, &wrong, &wrong]));
        let provider = provider(chat.clone(), Arc::new(MemoryKv::new()));

        let err = provider
            .generate_question(params("s4"))
            .await
            .expect_err("should fail");
        assert!(matches!(err, GenerateError::SeedEchoMismatch { .. }));
        assert_eq!(chat.calls(), 3);
    }

    #[tokio::test]
    async fn seed_echo_mismatch_recovers_on_a_later_attempt() {
        let wrong = payload("other-seed");
        let right = payload("s5");
        let chat = Arc::new(ScriptedChat::replying(&[&wrong, &right]));
        let provider = provider(chat.clone(), Arc::new(MemoryKv::new()));

        let question = provider.generate_question(params("s5")).await.expect("ok");
        assert_eq!(question.seed_echo, "s5");
        assert_eq!(chat.calls(), 2);
    }

    #[tokio::test]
    async fn rate_limit_rejects_back_to_back_requests() {
        let body = payload("s6");
        let chat = Arc::new(ScriptedChat::replying(&[body.as_str()]));
        let cache = Arc::new(MemoryKv::new());
        let mut config = GenerationConfig::default();
        config.min_interval = Duration::from_secs(1);
        let provider = QuestionProvider::new(
            chat,
            cache,
            Arc::new(FixedClock(Utc::now())),
            Arc::new(StandardContentFilter::new()),
            config,
        );

        provider.generate_question(params("s6")).await.expect("ok");
        let err = provider
            .generate_question(params("s7"))
            .await
            .expect_err("limited");
        assert!(matches!(err, GenerateError::RateLimited(_)));
    }

    fn dirty_payload(seed: &str) -> String {
        serde_json::json!({
            "category": "science",
            "difficulty": "easy",
            "seedEcho": seed,
            "question": "Which case ended in the largest lawsuit payout ever?",
            "options": ["Case A", "Case B", "Case C", "Case D"],
            "correctIndex": 0,
            "explanation": "A question that trips the advice pattern.",
            "quips": { "correct": "Objection!", "incorrect": "Overruled." },
        })
        .to_string()
    }

    #[tokio::test]
    async fn content_rejection_regenerates_with_a_stricter_prompt() {
        let dirty = dirty_payload("s8");
        let clean = payload("s8");
        let chat = Arc::new(ScriptedChat::replying(&[&dirty, &clean]));
        let provider = provider(chat.clone(), Arc::new(MemoryKv::new()));

        let question = provider.generate_question(params("s8")).await.expect("ok");
        assert_eq!(question.correct_index, 2);
        assert_eq!(chat.calls(), 2);

        let requests = chat.requests.lock().expect("requests");
        assert_eq!(requests[1].temperature, Some(0.5));
        let retry_system = &requests[1].messages[0].content;
        assert!(retry_system.contains("You violated content constraints"));
    }

    #[tokio::test]
    async fn persistent_content_rejection_is_terminal() {
        let dirty = dirty_payload("s9");
        let chat = Arc::new(ScriptedChat::replying(&[&dirty, &dirty, &dirty]));
        let provider = provider(chat.clone(), Arc::new(MemoryKv::new()));

        let err = provider
            .generate_question(params("s9"))
            .await
            .expect_err("rejected");
        assert!(matches!(err, GenerateError::ContentRejected));
        // Initial attempt plus the two bounded content retries.
        assert_eq!(chat.calls(), 3);
    }

    #[tokio::test]
    async fn transport_errors_are_terminal_at_the_provider() {
        let chat = Arc::new(ScriptedChat::new(vec![Err(ChatError::Http {
            status: 503,
            body: "unavailable".to_string(),
        })]));
        let provider = provider(chat.clone(), Arc::new(MemoryKv::new()));

        let err = provider
            .generate_question(params("s10"))
            .await
            .expect_err("transport");
        assert!(matches!(err, GenerateError::Chat(_)));
        assert_eq!(chat.calls(), 1);
    }

    #[test]
    fn strip_code_fences_handles_plain_and_fenced_text() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```  "), "{\"a\":1}");
    }
}
