//! SQLite-backed durable question library.
//!
//! Documents are stored as JSON alongside the scalar columns the queries
//! need. The `stem_hash` UNIQUE constraint is what enforces the library's
//! one-record-per-semantic-question invariant; insertion conflicts are
//! reported, never resolved by overwrite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::{Row, SqlitePool};

use quizsmith_domain::QuestionDoc;

use crate::infrastructure::ports::{
    DrawFilter, LibraryFilter, PutOutcome, QuestionStorePort, StoreError,
};

pub struct SqliteQuestionStore {
    pool: SqlitePool,
}

impl SqliteQuestionStore {
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                stem_hash TEXT NOT NULL UNIQUE,
                doc_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                used_at TEXT
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        for ddl in [
            "CREATE INDEX IF NOT EXISTS idx_questions_category ON questions(category)",
            "CREATE INDEX IF NOT EXISTS idx_questions_cat_diff ON questions(category, difficulty)",
        ] {
            sqlx::query(ddl)
                .execute(&pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        Ok(Self { pool })
    }

    fn row_to_doc(row: &sqlx::sqlite::SqliteRow) -> Result<QuestionDoc, StoreError> {
        let json: String = row.get("doc_json");
        let mut doc: QuestionDoc =
            serde_json::from_str(&json).map_err(|e| StoreError::Serialization(e.to_string()))?;
        // The scalar columns are authoritative for timestamps; mark_used
        // touches only them.
        let created_at: String = row.get("created_at");
        doc.created_at = created_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let used_at: Option<String> = row.get("used_at");
        doc.used_at = match used_at {
            Some(raw) => Some(
                raw.parse::<DateTime<Utc>>()
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            ),
            None => None,
        };
        Ok(doc)
    }

    async fn fetch_pool(
        &self,
        filter: &DrawFilter,
        exact_difficulty: bool,
    ) -> Result<Vec<QuestionDoc>, StoreError> {
        let rows = if exact_difficulty {
            sqlx::query(
                "SELECT doc_json, created_at, used_at FROM questions \
                 WHERE category = ? AND difficulty = ? AND used_at IS NULL",
            )
            .bind(filter.category.as_str())
            .bind(filter.difficulty.as_str())
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                "SELECT doc_json, created_at, used_at FROM questions \
                 WHERE category = ? AND used_at IS NULL",
            )
            .bind(filter.category.as_str())
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in &rows {
            let doc = Self::row_to_doc(row)?;
            if !filter.exclude_ids.contains(&doc.id) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl QuestionStorePort for SqliteQuestionStore {
    async fn get(&self, id: &str) -> Result<Option<QuestionDoc>, StoreError> {
        let row = sqlx::query("SELECT doc_json, created_at, used_at FROM questions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        row.as_ref().map(Self::row_to_doc).transpose()
    }

    async fn find_by_hash(&self, stem_hash: &str) -> Result<Option<QuestionDoc>, StoreError> {
        let row =
            sqlx::query("SELECT doc_json, created_at, used_at FROM questions WHERE stem_hash = ?")
                .bind(stem_hash)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
        row.as_ref().map(Self::row_to_doc).transpose()
    }

    async fn insert_many(&self, docs: &[QuestionDoc]) -> Result<PutOutcome, StoreError> {
        if docs.is_empty() {
            return Ok(PutOutcome::default());
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let mut outcome = PutOutcome::default();
        for doc in docs {
            let json = serde_json::to_string(doc)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let result = sqlx::query(
                "INSERT INTO questions (id, category, difficulty, stem_hash, doc_json, created_at, used_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?) ON CONFLICT DO NOTHING",
            )
            .bind(&doc.id)
            .bind(doc.question.category.as_str())
            .bind(doc.question.difficulty.as_str())
            .bind(&doc.stem_hash)
            .bind(&json)
            .bind(doc.created_at.to_rfc3339())
            .bind(doc.used_at.map(|t| t.to_rfc3339()))
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

            if result.rows_affected() > 0 {
                outcome.inserted += 1;
            } else {
                outcome.duplicates += 1;
            }
        }
        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(outcome)
    }

    async fn draw_one(&self, filter: &DrawFilter) -> Result<Option<QuestionDoc>, StoreError> {
        let mut pool = self.fetch_pool(filter, true).await?;
        if pool.is_empty() {
            pool = self.fetch_pool(filter, false).await?;
        }
        if pool.is_empty() {
            return Ok(None);
        }
        let chosen = rand::thread_rng().gen_range(0..pool.len());
        Ok(Some(pool.swap_remove(chosen)))
    }

    async fn mark_used(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE questions SET used_at = ? WHERE id = ? AND used_at IS NULL")
            .bind(at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn count(&self, filter: &LibraryFilter) -> Result<u64, StoreError> {
        let count: i64 = match (filter.category, filter.difficulty) {
            (Some(category), Some(difficulty)) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM questions WHERE category = ? AND difficulty = ?",
                )
                .bind(category.as_str())
                .bind(difficulty.as_str())
                .fetch_one(&self.pool)
                .await
            }
            (Some(category), None) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE category = ?")
                    .bind(category.as_str())
                    .fetch_one(&self.pool)
                    .await
            }
            (None, Some(difficulty)) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE difficulty = ?")
                    .bind(difficulty.as_str())
                    .fetch_one(&self.pool)
                    .await
            }
            (None, None) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM questions")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn list(
        &self,
        filter: &LibraryFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<QuestionDoc>, StoreError> {
        let mut sql = String::from("SELECT doc_json, created_at, used_at FROM questions");
        let mut clauses = Vec::new();
        if filter.category.is_some() {
            clauses.push("category = ?");
        }
        if filter.difficulty.is_some() {
            clauses.push("difficulty = ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at, id LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(category) = filter.category {
            query = query.bind(category.as_str());
        }
        if let Some(difficulty) = filter.difficulty {
            query = query.bind(difficulty.as_str());
        }
        // SQLite treats a negative LIMIT as "no limit".
        let limit: i64 = limit.map_or(-1, |l| l as i64);
        let rows = query
            .bind(limit)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_doc).collect()
    }
}
