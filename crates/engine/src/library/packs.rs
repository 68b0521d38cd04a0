//! Pack export/import and batch pack generation.
//!
//! A pack is a portable JSON document: creation timestamp, per-category and
//! per-difficulty counts, and the items themselves. Import re-validates
//! every item and routes through the same unique-by-hash path as live
//! generation, so re-importing an exported pack is a clean no-op.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quizsmith_domain::{
    Difficulty, QuestionDoc, QuestionDraft, QuestionSource, Tone, TriviaCategory, ValidationError,
};

use crate::generate::{GenerateError, GenerateParams, QuestionProvider};
use crate::infrastructure::ports::{ClockPort, StoreError};

use super::{stem, LibraryService};

/// Pacing between generations inside one pack build.
const PACK_GENERATION_DELAY: Duration = Duration::from_millis(1100);

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("pack is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("pack item {index} failed validation: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: ValidationError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackCounts {
    #[serde(rename = "byCategory")]
    pub by_category: BTreeMap<String, u32>,
    #[serde(rename = "byDifficulty")]
    pub by_difficulty: BTreeMap<String, u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pack {
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub counts: PackCounts,
    pub items: Vec<QuestionDoc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: u32,
    pub duplicates: u32,
    pub total: u32,
}

fn build_counts(items: &[QuestionDoc]) -> PackCounts {
    let mut counts = PackCounts::default();
    for doc in items {
        *counts
            .by_category
            .entry(doc.question.category.as_str().to_string())
            .or_insert(0) += 1;
        *counts
            .by_difficulty
            .entry(doc.question.difficulty.as_str().to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Serialize questions as a pack document.
pub fn export_pack(items: Vec<QuestionDoc>, created_at: DateTime<Utc>) -> String {
    let pack = Pack {
        created_at,
        counts: build_counts(&items),
        items,
    };
    serde_json::to_string_pretty(&pack).unwrap_or_else(|_| "{}".to_string())
}

impl LibraryService {
    /// Import a pack (either a bare item array or a full pack document),
    /// re-validating every item and inserting through the unique-by-hash
    /// path. Stem hashes are recomputed rather than trusted.
    pub async fn import_pack(&self, json: &str) -> Result<ImportSummary, PackError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let items_value = if value.is_array() {
            value
        } else {
            value.get("items").cloned().unwrap_or(serde_json::Value::Null)
        };
        let items: Vec<QuestionDoc> = serde_json::from_value(items_value)?;

        for (index, doc) in items.iter().enumerate() {
            doc.question
                .validate()
                .map_err(|source| PackError::Invalid { index, source })?;
        }

        let total = items.len() as u32;
        let drafts = items
            .into_iter()
            .map(|doc| QuestionDraft {
                id: Some(doc.id),
                // Recompute instead of trusting the pack's hash.
                stem_hash: None,
                tone: doc.tone,
                source: Some(match doc.source {
                    QuestionSource::Generated => QuestionSource::Imported,
                    other => other,
                }),
                question: doc.question,
            })
            .collect();
        let outcome = self.put_many(drafts).await?;
        Ok(ImportSummary {
            inserted: outcome.inserted,
            duplicates: outcome.duplicates,
            total,
        })
    }
}

/// Parameters for building a pack out of fresh generations.
#[derive(Debug, Clone)]
pub struct GeneratePackParams {
    pub count: u32,
    pub category: TriviaCategory,
    pub difficulty: Difficulty,
    pub tone: Tone,
    /// Seeds become `{seed_base}-1 .. {seed_base}-n`; `None` lets every
    /// generation pick a fresh seed.
    pub seed_base: Option<String>,
}

/// Generate `count` ready-to-store documents, paced to respect the
/// provider's rate limit.
pub async fn generate_pack(
    provider: &QuestionProvider,
    clock: &dyn ClockPort,
    params: GeneratePackParams,
) -> Result<Vec<QuestionDoc>, PackError> {
    let mut out = Vec::with_capacity(params.count as usize);
    for i in 0..params.count {
        if i > 0 {
            tokio::time::sleep(PACK_GENERATION_DELAY).await;
        }
        let seed = params
            .seed_base
            .as_ref()
            .map(|base| format!("{base}-{}", i + 1));
        let question = provider
            .generate_question(GenerateParams {
                seed,
                tone: Some(params.tone),
                ..GenerateParams::new(params.category, params.difficulty)
            })
            .await?;
        out.push(QuestionDoc {
            id: format!("{}-{}", params.category, uuid::Uuid::new_v4()),
            stem_hash: stem::stem_hash(&question),
            tone: Some(params.tone),
            created_at: clock.now(),
            source: QuestionSource::Generated,
            used_at: None,
            question,
        });
    }
    Ok(out)
}
