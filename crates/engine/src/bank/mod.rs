//! In-memory question bank with generative refill.
//!
//! Pools are seeded from a static fixture and replenished per category:
//! preferably with a fresh generated batch, otherwise by recycling the
//! existing pool's `used` flags. Repeated generation failures open a
//! cooldown window during which refills skip the network entirely, so a
//! category that has ever held stock never comes up empty.

pub mod coerce;
pub mod events;
pub mod fixture;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use tokio::sync::{broadcast, Mutex};

use quizsmith_domain::{BankQuestion, GameCategory};

use crate::config::BankConfig;
use crate::infrastructure::ports::{ChatError, ChatMessage, ChatPort, ChatRequest, ClockPort};
use events::{RefillEvent, RefillEvents, RefillSource};

const BATCH_TEMPERATURE: f32 = 0.7;
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("no model yielded parseable content")]
    NoContent,
}

#[derive(Debug, Default, Clone, Copy)]
struct FailureState {
    fails: u32,
    cooldown_until: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct BankState {
    pools: HashMap<GameCategory, Vec<BankQuestion>>,
    failures: HashMap<GameCategory, FailureState>,
}

struct FetchedBatch {
    items: Vec<BankQuestion>,
    model: String,
}

/// Per-session aggregate over all pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankStats {
    pub total: usize,
    pub used: usize,
    pub available: usize,
}

pub struct QuestionBank {
    /// `None` means no generation credential; refills recycle locally.
    chat: Option<Arc<dyn ChatPort>>,
    clock: Arc<dyn ClockPort>,
    config: BankConfig,
    state: Mutex<BankState>,
    /// Single-flight guard per category: the first caller refills, the rest
    /// wait on the same gate and then find fresh stock.
    refill_gates: DashMap<GameCategory, Arc<Mutex<()>>>,
    events: RefillEvents,
}

impl QuestionBank {
    pub fn new(
        chat: Option<Arc<dyn ChatPort>>,
        clock: Arc<dyn ClockPort>,
        config: BankConfig,
    ) -> Self {
        Self {
            chat,
            clock,
            config,
            state: Mutex::new(BankState {
                pools: fixture::starting_pools(),
                failures: HashMap::new(),
            }),
            refill_gates: DashMap::new(),
            events: RefillEvents::new(EVENT_CAPACITY),
        }
    }

    /// Listen for refill lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<RefillEvent> {
        self.events.subscribe()
    }

    /// Draw the next unused question for a category, refilling when the
    /// pool is exhausted. Returns `None` only if the pool is empty even
    /// after a refill.
    pub async fn get_next_question(&self, category: GameCategory) -> Option<BankQuestion> {
        if let Some(question) = self.draw_unused(category).await {
            return Some(question);
        }
        self.refill_category(category).await;
        self.draw_unused(category).await
    }

    /// Restore the fixture pools and clear failure tracking.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.pools = fixture::starting_pools();
        state.failures.clear();
    }

    pub async fn stats(&self) -> BankStats {
        let state = self.state.lock().await;
        let total = state.pools.values().map(Vec::len).sum();
        let used = state
            .pools
            .values()
            .flat_map(|pool| pool.iter())
            .filter(|q| q.used)
            .count();
        BankStats {
            total,
            used,
            available: total - used,
        }
    }

    async fn draw_unused(&self, category: GameCategory) -> Option<BankQuestion> {
        let mut state = self.state.lock().await;
        let pool = state.pools.get_mut(&category)?;
        let unused: Vec<usize> = pool
            .iter()
            .enumerate()
            .filter(|(_, q)| !q.used)
            .map(|(i, _)| i)
            .collect();
        if unused.is_empty() {
            return None;
        }
        let pick = unused[rand::thread_rng().gen_range(0..unused.len())];
        pool[pick].used = true;
        Some(pool[pick].clone())
    }

    async fn has_unused(&self, category: GameCategory) -> bool {
        let state = self.state.lock().await;
        state
            .pools
            .get(&category)
            .is_some_and(|pool| pool.iter().any(|q| !q.used))
    }

    async fn refill_category(&self, category: GameCategory) {
        let gate = self
            .refill_gates
            .entry(category)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = gate.lock().await;

        // Someone else refilled while we waited on the gate.
        if self.has_unused(category).await {
            return;
        }

        let now = self.clock.now();
        let in_cooldown = {
            let state = self.state.lock().await;
            state
                .failures
                .get(&category)
                .and_then(|f| f.cooldown_until)
                .is_some_and(|until| now < until)
        };

        tracing::info!(category = %category, cooldown = in_cooldown, "refilling question pool");
        self.events.emit(RefillEvent::start(category, in_cooldown));

        if self.chat.is_none() || in_cooldown {
            self.recycle(category).await;
            let source = if in_cooldown {
                RefillSource::LocalCooldown
            } else {
                RefillSource::Local
            };
            self.events.emit(RefillEvent::end(category, source, None));
            return;
        }

        match self.fetch_generated_batch(category).await {
            Ok(batch) if !batch.items.is_empty() => {
                let mut state = self.state.lock().await;
                state.pools.insert(category, batch.items);
                state.failures.insert(category, FailureState::default());
                drop(state);
                self.events.emit(RefillEvent::end(
                    category,
                    RefillSource::Generated,
                    Some(batch.model),
                ));
                return;
            }
            Ok(_) => {
                tracing::warn!(category = %category, "generated batch was empty, recycling");
            }
            Err(e) => {
                tracing::warn!(category = %category, error = %e, "batch fetch failed, recycling");
                self.events.emit(RefillEvent::error(category, e.to_string()));
                let mut state = self.state.lock().await;
                let entry = state.failures.entry(category).or_default();
                entry.fails += 1;
                if entry.fails >= self.config.fail_threshold {
                    entry.fails = 0;
                    entry.cooldown_until = Some(now + self.config.cooldown);
                }
            }
        }

        self.recycle(category).await;
        self.events
            .emit(RefillEvent::end(category, RefillSource::LocalFallback, None));
    }

    async fn recycle(&self, category: GameCategory) {
        let mut state = self.state.lock().await;
        if let Some(pool) = state.pools.get_mut(&category) {
            for question in pool.iter_mut() {
                question.used = false;
            }
        }
    }

    /// Ask the backend for a fresh batch, walking the configured model list
    /// until one yields parseable content.
    async fn fetch_generated_batch(&self, category: GameCategory) -> Result<FetchedBatch, FetchError> {
        let Some(chat) = &self.chat else {
            return Err(FetchError::NoContent);
        };

        let count = self.config.batch_size;
        let system = "You are a trivia generator. Output ONLY valid JSON of the shape \
                      {\"questions\": [{\"question\": string, \"choices\": [string, string, string, string], \
                      \"correctIndex\": number, \"wrongQuips\": {\"0\": string, \"1\": string, \"2\": string, \"3\": string}, \
                      \"correctQuip\": string}]}"
            .to_string();
        let user = format!(
            "Generate {count} short, clear, family-friendly multiple-choice trivia questions \
             for the category: {category}.\n\
             Rules:\n\
             - Exactly 4 choices per question.\n\
             - correctIndex must be 0..3.\n\
             - wrongQuips must include keys '0','1','2','3' with snappy, humorous one-liners.\n\
             - correctQuip is a single upbeat one-liner.\n\
             - Do not include explanations.\n\
             Return JSON only."
        );

        let mut last_err = FetchError::NoContent;
        for model in &self.config.batch_models {
            let content = match self
                .chat_with_retry(chat.as_ref(), model, &system, &user, category)
                .await
            {
                Ok(content) if !content.trim().is_empty() => content,
                Ok(_) => continue,
                Err(e) => {
                    last_err = FetchError::Chat(e);
                    continue;
                }
            };

            let raw = match coerce::parse_batch(&content) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "unparseable batch, trying next model");
                    continue;
                }
            };

            let stamp = self.clock.now().timestamp_millis();
            let items: Vec<BankQuestion> = raw
                .questions
                .into_iter()
                .take(count)
                .enumerate()
                .map(|(i, q)| coerce::sanitize(q, category, format!("{category}_{stamp}_{i}")))
                .collect();
            return Ok(FetchedBatch {
                items,
                model: model.clone(),
            });
        }
        Err(last_err)
    }

    /// One model's request with exponential backoff on 429/5xx/transport
    /// failures; a retry event goes out from the second attempt on.
    async fn chat_with_retry(
        &self,
        chat: &dyn ChatPort,
        model: &str,
        system: &str,
        user: &str,
        category: GameCategory,
    ) -> Result<String, ChatError> {
        let retry = &self.config.retry;
        let mut last_err = ChatError::Transport("retry budget exhausted".to_string());
        for attempt in 1..=retry.max_attempts {
            let request = ChatRequest {
                model: model.to_string(),
                messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
                temperature: Some(BATCH_TEMPERATURE),
                max_tokens: None,
            };
            match chat.chat(request).await {
                Ok(response) => {
                    return Ok(response.first_content().unwrap_or_default().to_string())
                }
                Err(e) if e.is_retryable() && attempt < retry.max_attempts => {
                    self.events
                        .emit(RefillEvent::retry(category, attempt + 1, retry.max_attempts));
                    tokio::time::sleep(retry.delay_after(attempt)).await;
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }
}
