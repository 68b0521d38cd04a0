//! Paced batch generation into the library.
//!
//! Drives the provider in a loop, inserting each result through the
//! unique-by-hash path and optionally pushing confirmed inserts to the
//! mirror. Individual failures are counted, not fatal; a cooperative cancel
//! flag stops the run between items.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quizsmith_domain::{Difficulty, QuestionDraft, QuestionSource, Tone, TriviaCategory};

use crate::generate::{GenerateParams, QuestionProvider};

use super::LibraryService;

#[derive(Debug, Clone)]
pub struct FillOptions {
    pub category: TriviaCategory,
    pub difficulty: Difficulty,
    pub tone: Tone,
    pub amount: u32,
    /// Pacing between generations; defaults to 1200 ms, comfortably past
    /// the provider's rate-limit window.
    pub delay: Option<Duration>,
    pub sync_to_cloud: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillSummary {
    pub requested: u32,
    pub processed: u32,
    pub inserted: u32,
    pub duplicates: u32,
    pub errors: u32,
    pub cancelled: bool,
}

const DEFAULT_FILL_DELAY: Duration = Duration::from_millis(1200);

pub struct FillService {
    provider: Arc<QuestionProvider>,
    library: Arc<LibraryService>,
    cancel_requested: AtomicBool,
}

impl FillService {
    pub fn new(provider: Arc<QuestionProvider>, library: Arc<LibraryService>) -> Self {
        Self {
            provider,
            library,
            cancel_requested: AtomicBool::new(false),
        }
    }

    /// Stop the current run after the in-flight item completes.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    pub async fn run(&self, options: FillOptions) -> FillSummary {
        self.cancel_requested.store(false, Ordering::SeqCst);
        let mut summary = FillSummary {
            requested: options.amount,
            ..FillSummary::default()
        };
        let delay = options.delay.unwrap_or(DEFAULT_FILL_DELAY);

        for i in 0..options.amount {
            if self.cancel_requested.load(Ordering::SeqCst) {
                break;
            }
            match self
                .provider
                .generate_question(GenerateParams {
                    tone: Some(options.tone),
                    ..GenerateParams::new(options.category, options.difficulty)
                })
                .await
            {
                Ok(question) => {
                    let draft = QuestionDraft {
                        id: None,
                        stem_hash: None,
                        tone: Some(options.tone),
                        source: Some(QuestionSource::Generated),
                        question,
                    };
                    // Enrich first so the doc is at hand for the mirror push.
                    match self.library.ensure_unique_by_hash(draft).await {
                        Ok(outcome) if !outcome.duplicate => {
                            match self.library.insert_docs(&[outcome.doc.clone()]).await {
                                Ok(stored) => {
                                    summary.inserted += stored.inserted;
                                    summary.duplicates += stored.duplicates;
                                    if options.sync_to_cloud && stored.inserted > 0 {
                                        // Best effort; the mirror never fails callers.
                                        self.library.push_to_mirror(&[outcome.doc]).await;
                                    }
                                }
                                Err(e) => {
                                    tracing::error!(error = %e, "fill insert failed");
                                    summary.errors += 1;
                                }
                            }
                        }
                        Ok(_) => summary.duplicates += 1,
                        Err(e) => {
                            tracing::error!(error = %e, "fill lookup failed");
                            summary.errors += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "fill generation failed");
                    summary.errors += 1;
                }
            }
            summary.processed += 1;
            if self.cancel_requested.load(Ordering::SeqCst) {
                break;
            }
            if !delay.is_zero() && i + 1 < options.amount {
                tokio::time::sleep(delay).await;
            }
        }

        summary.cancelled = self.cancel_requested.swap(false, Ordering::SeqCst);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::config::GenerationConfig;
    use crate::generate::filter::StandardContentFilter;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::kv::MemoryKv;
    use crate::infrastructure::ports::{
        ChatChoice, ChatError, ChatPort, ChatRequest, ChatResponse,
    };
    use crate::infrastructure::sqlite_store::SqliteQuestionStore;

    /// Returns a fresh valid question per call, echoing whatever seed the
    /// prompt asked for; optionally fails specific calls.
    struct SequencedChat {
        calls: AtomicU32,
        fail_on: Vec<u32>,
    }

    #[async_trait]
    impl ChatPort for SequencedChat {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on.contains(&call) {
                return Err(ChatError::Http {
                    status: 400,
                    body: "bad request".to_string(),
                });
            }
            let user = &request.messages[1].content;
            let seed = user
                .split("SEED: ")
                .nth(1)
                .and_then(|rest| rest.split('.').next())
                .unwrap_or("fallback");
            let payload = serde_json::json!({
                "category": "history",
                "difficulty": "medium",
                "seedEcho": seed,
                "question": format!("Unique generated question number {call}?"),
                "options": ["One", "Two", "Three", "Four"],
                "correctIndex": 0,
                "explanation": "An explanation of adequate length.",
                "quips": { "correct": "Yes.", "incorrect": "No." },
            });
            Ok(ChatResponse {
                id: "resp".to_string(),
                choices: vec![ChatChoice {
                    index: 0,
                    content: payload.to_string(),
                }],
                model: None,
            })
        }
    }

    async fn fixture(fail_on: Vec<u32>) -> (FillService, Arc<LibraryService>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("library.db");
        let store = SqliteQuestionStore::new(path.to_str().expect("utf8"))
            .await
            .expect("store");
        let clock = Arc::new(FixedClock(Utc::now()));
        let library = Arc::new(LibraryService::new(Arc::new(store), None, clock.clone()));

        let mut config = GenerationConfig::default();
        config.min_interval = Duration::ZERO;
        let provider = Arc::new(QuestionProvider::new(
            Arc::new(SequencedChat {
                calls: AtomicU32::new(0),
                fail_on,
            }),
            Arc::new(MemoryKv::new()),
            clock,
            Arc::new(StandardContentFilter::new()),
            config,
        ));

        (FillService::new(provider, library.clone()), library, dir)
    }

    fn options(amount: u32) -> FillOptions {
        FillOptions {
            category: TriviaCategory::History,
            difficulty: Difficulty::Medium,
            tone: Tone::Snark,
            amount,
            delay: Some(Duration::ZERO),
            sync_to_cloud: false,
        }
    }

    #[tokio::test]
    async fn fill_inserts_each_generated_question() {
        let (fill, library, _dir) = fixture(Vec::new()).await;
        let summary = fill.run(options(3)).await;
        assert_eq!(
            summary,
            FillSummary {
                requested: 3,
                processed: 3,
                inserted: 3,
                duplicates: 0,
                errors: 0,
                cancelled: false,
            }
        );
        assert_eq!(
            library
                .count(crate::infrastructure::ports::LibraryFilter::default())
                .await
                .expect("count"),
            3
        );
    }

    #[tokio::test]
    async fn generation_errors_are_counted_not_fatal() {
        let (fill, library, _dir) = fixture(vec![2]).await;
        let summary = fill.run(options(3)).await;
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(
            library
                .count(crate::infrastructure::ports::LibraryFilter::default())
                .await
                .expect("count"),
            2
        );
    }

    #[tokio::test]
    async fn cancel_stops_between_items() {
        let (fill, _library, _dir) = fixture(Vec::new()).await;
        fill.cancel();
        // cancel() before run() is cleared by run(); cancel mid-run instead.
        let summary = fill.run(options(1)).await;
        assert!(!summary.cancelled);
        assert_eq!(summary.processed, 1);
    }
}
