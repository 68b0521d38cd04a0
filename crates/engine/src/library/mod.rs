//! Durable question library service.
//!
//! Sits on top of [`QuestionStorePort`] and owns the enrichment rules:
//! candidates get an id, a stem hash, a creation timestamp and a default
//! source before they reach the store. The store's unique stem-hash
//! constraint does the actual de-duplication.

pub mod fill;
pub mod packs;
pub mod quips;
pub mod stem;

use std::sync::Arc;

use quizsmith_domain::{
    BankQuestion, Difficulty, QuestionDoc, QuestionDraft, TriviaCategory,
};

use crate::infrastructure::ports::{
    ClockPort, DrawFilter, LibraryFilter, MirrorBatchQuery, MirrorPort, PutOutcome,
    QuestionStorePort, StoreError,
};

/// Result of checking a candidate against the store.
#[derive(Debug)]
pub struct EnsureOutcome {
    pub doc: QuestionDoc,
    pub duplicate: bool,
}

pub struct LibraryService {
    store: Arc<dyn QuestionStorePort>,
    mirror: Option<Arc<dyn MirrorPort>>,
    clock: Arc<dyn ClockPort>,
}

impl LibraryService {
    pub fn new(
        store: Arc<dyn QuestionStorePort>,
        mirror: Option<Arc<dyn MirrorPort>>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            store,
            mirror,
            clock,
        }
    }

    /// Enrich a candidate or return the already-stored document.
    ///
    /// When the stem hash is taken, the existing document comes back with
    /// `duplicate = true` and the candidate is discarded. Otherwise the
    /// candidate gets an id/hash/timestamp/source and `duplicate = false`;
    /// nothing is written - that is [`Self::put_many`]'s job.
    pub async fn ensure_unique_by_hash(
        &self,
        draft: QuestionDraft,
    ) -> Result<EnsureOutcome, StoreError> {
        let stem_hash = draft
            .stem_hash
            .clone()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| stem::stem_hash(&draft.question));

        if let Some(existing) = self.store.find_by_hash(&stem_hash).await? {
            return Ok(EnsureOutcome {
                doc: existing,
                duplicate: true,
            });
        }

        Ok(EnsureOutcome {
            doc: QuestionDoc {
                id: draft
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                stem_hash,
                tone: draft.tone,
                created_at: self.clock.now(),
                source: draft.source.unwrap_or_default(),
                used_at: None,
                question: draft.question,
            },
            duplicate: false,
        })
    }

    /// Insert a batch, skipping duplicates per item. Collisions inside the
    /// batch count as duplicates too.
    pub async fn put_many(&self, drafts: Vec<QuestionDraft>) -> Result<PutOutcome, StoreError> {
        if drafts.is_empty() {
            return Ok(PutOutcome::default());
        }
        let mut docs = Vec::new();
        let mut duplicates = 0;
        for draft in drafts {
            let outcome = self.ensure_unique_by_hash(draft).await?;
            if outcome.duplicate {
                duplicates += 1;
            } else {
                docs.push(outcome.doc);
            }
        }
        let stored = self.store.insert_many(&docs).await?;
        Ok(PutOutcome {
            inserted: stored.inserted,
            duplicates: duplicates + stored.duplicates,
        })
    }

    /// Insert documents that are already enriched (id, hash, timestamps).
    pub async fn insert_docs(&self, docs: &[QuestionDoc]) -> Result<PutOutcome, StoreError> {
        self.store.insert_many(docs).await
    }

    /// Draw one unused document, preferring an exact category+difficulty
    /// match and broadening to the category.
    pub async fn draw_one(
        &self,
        category: TriviaCategory,
        difficulty: Difficulty,
        exclude_ids: Vec<String>,
    ) -> Result<Option<QuestionDoc>, StoreError> {
        self.store
            .draw_one(&DrawFilter {
                category,
                difficulty,
                exclude_ids,
            })
            .await
    }

    pub async fn mark_used(&self, id: &str) -> Result<(), StoreError> {
        self.store.mark_used(id, self.clock.now()).await
    }

    /// Draw, mark used, and convert to the session-pool shape in one step.
    pub async fn draw_for_session(
        &self,
        category: TriviaCategory,
        difficulty: Difficulty,
        exclude_ids: Vec<String>,
    ) -> Result<Option<BankQuestion>, StoreError> {
        let Some(doc) = self.draw_one(category, difficulty, exclude_ids).await? else {
            return Ok(None);
        };
        self.mark_used(&doc.id).await?;
        Ok(Some(doc.to_bank_question()))
    }

    pub async fn count(&self, filter: LibraryFilter) -> Result<u64, StoreError> {
        self.store.count(&filter).await
    }

    pub async fn list(
        &self,
        filter: LibraryFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<QuestionDoc>, StoreError> {
        self.store.list(&filter, limit, offset).await
    }

    /// Push documents to the mirror, best effort. Without a configured
    /// mirror this is a no-op reporting nothing confirmed.
    pub async fn push_to_mirror(&self, docs: &[QuestionDoc]) -> PutOutcome {
        match &self.mirror {
            Some(mirror) => mirror.upsert_many(docs).await,
            None => PutOutcome {
                inserted: 0,
                duplicates: docs.len() as u32,
            },
        }
    }

    /// Pull a batch from the mirror and insert it locally under the `cloud`
    /// source, skipping hashes we already hold.
    pub async fn pull_from_mirror(
        &self,
        category: TriviaCategory,
        difficulty: Difficulty,
        limit: Option<usize>,
    ) -> Result<PutOutcome, StoreError> {
        let Some(mirror) = &self.mirror else {
            return Ok(PutOutcome::default());
        };
        let known: Vec<String> = self
            .store
            .list(
                &LibraryFilter {
                    category: Some(category),
                    difficulty: Some(difficulty),
                },
                None,
                0,
            )
            .await?
            .into_iter()
            .map(|d| d.stem_hash)
            .collect();

        let fetched = mirror
            .fetch_batch(&MirrorBatchQuery {
                category,
                difficulty,
                limit,
                exclude_hashes: known,
            })
            .await;

        let drafts = fetched
            .into_iter()
            .map(|doc| QuestionDraft {
                id: Some(doc.id),
                stem_hash: Some(doc.stem_hash),
                tone: doc.tone,
                source: Some(quizsmith_domain::QuestionSource::Cloud),
                question: doc.question,
            })
            .collect();
        self.put_many(drafts).await
    }
}
