//! Difficulty-matched question pairs for symmetric multiplayer rounds.

use quizsmith_domain::{RoundMeta, RoundRole, TriviaPair, TriviaQuestion};

use super::{GenerateError, GenerateParams, QuestionProvider};

/// Attempts per role before the pair is declared failed.
pub const MAX_ATTEMPTS_PER_ROLE: u32 = 3;

impl QuestionProvider {
    /// Generate two fact-distinct, difficulty-matched questions sharing the
    /// round's seed and diff token. Both roles run concurrently; the call
    /// fails only if either role exhausts its retry budget.
    pub async fn generate_paired_round(
        &self,
        meta: &RoundMeta,
    ) -> Result<TriviaPair, GenerateError> {
        let diff_token = meta.diff_token();
        let (a, b) = tokio::try_join!(
            self.generate_for_role(meta, RoundRole::A, &diff_token),
            self.generate_for_role(meta, RoundRole::B, &diff_token),
        )?;
        Ok(TriviaPair { a, b })
    }

    async fn generate_for_role(
        &self,
        meta: &RoundMeta,
        role: RoundRole,
        diff_token: &str,
    ) -> Result<TriviaQuestion, GenerateError> {
        let mut last_err = GenerateError::Schema("no attempts made".to_string());
        for attempt in 1..=MAX_ATTEMPTS_PER_ROLE {
            if attempt > 1 {
                // Let the per-stream rate-limit window clear before retrying.
                tokio::time::sleep(self.config().retry_pause).await;
            }
            let params = GenerateParams {
                seed: Some(meta.round_seed.clone()),
                tone: meta.tone,
                role: Some(role),
                diff_token: Some(diff_token.to_string()),
                ..GenerateParams::new(meta.category, meta.difficulty)
            };
            match self.generate_question(params).await {
                Ok(question) => return Ok(question),
                Err(e) if e.is_validation() => {
                    tracing::warn!(role = %role, error = %e, "paired generation attempt failed");
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }
}
