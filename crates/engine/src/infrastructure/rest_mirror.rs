//! Best-effort REST mirror of the question library.
//!
//! Talks to a PostgREST-style endpoint with upsert-on-conflict-ignore
//! semantics keyed by `stemHash`. Every failure path degrades to "nothing
//! confirmed" - local persistence has already succeeded by the time a push
//! runs, so the mirror is never allowed to fail a caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use quizsmith_domain::QuestionDoc;

use crate::config::MirrorConfig;
use crate::infrastructure::ports::{MirrorBatchQuery, MirrorPort, PutOutcome};

pub struct RestMirror {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestMirror {
    /// Build a mirror when both url and key are configured; `None` otherwise.
    pub fn from_config(config: Option<&MirrorConfig>) -> Option<Self> {
        let config = config?;
        if config.base_url.trim().is_empty() || config.api_key.trim().is_empty() {
            return None;
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn questions_url(&self) -> String {
        format!("{}/rest/v1/questions", self.base_url)
    }
}

#[async_trait]
impl MirrorPort for RestMirror {
    async fn upsert_many(&self, docs: &[QuestionDoc]) -> PutOutcome {
        if docs.is_empty() {
            return PutOutcome::default();
        }
        let total = docs.len() as u32;
        let response = self
            .client
            .post(format!("{}?on_conflict=stemHash", self.questions_url()))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header(
                "Prefer",
                "resolution=ignore-duplicates,return=representation",
            )
            .json(docs)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "mirror upsert failed");
                return PutOutcome {
                    inserted: 0,
                    duplicates: total,
                };
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "mirror upsert rejected");
            return PutOutcome {
                inserted: 0,
                duplicates: total,
            };
        }

        let inserted = match response.json::<Vec<serde_json::Value>>().await {
            Ok(rows) => rows.len() as u32,
            Err(e) => {
                tracing::warn!(error = %e, "mirror upsert returned unreadable body");
                0
            }
        };
        PutOutcome {
            inserted,
            duplicates: total.saturating_sub(inserted),
        }
    }

    async fn fetch_batch(&self, query: &MirrorBatchQuery) -> Vec<QuestionDoc> {
        let limit = query.limit.unwrap_or(50);
        let mut url = format!(
            "{}?category=eq.{}&difficulty=eq.{}&limit={}",
            self.questions_url(),
            query.category.as_str(),
            query.difficulty.as_str(),
            limit
        );
        if !query.exclude_hashes.is_empty() {
            url.push_str(&format!(
                "&stemHash=not.in.({})",
                query.exclude_hashes.join(",")
            ));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = %r.status(), "mirror fetch rejected");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "mirror fetch failed");
                return Vec::new();
            }
        };

        let docs: Vec<QuestionDoc> = match response.json().await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "mirror fetch returned unreadable body");
                return Vec::new();
            }
        };
        // Belt and braces: filter excluded hashes even if the server ignored
        // the parameter.
        if query.exclude_hashes.is_empty() {
            docs
        } else {
            docs.into_iter()
                .filter(|d| !query.exclude_hashes.contains(&d.stem_hash))
                .collect()
        }
    }
}
