use std::sync::Arc;

use ai_client::util::strip_wrapping_quotes;
use ai_client::{GuardedClient, Message};
use chrono::Utc;
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use replyscout_common::file_config::{BrandConfig, FileConfig, LearningConfig};
use replyscout_common::{ConfigError, DraftResult, DraftStatus, Post, ReplyExample};

use super::{prompts, DraftError};
use crate::traits::ExampleCorpus;
use crate::voice::ComplianceValidator;

/// With rotation on, examples are sampled from a pool this many times
/// larger than the number shown.
const ROTATION_POOL_FACTOR: usize = 3;

/// Drafts replies and keeps asking until one passes the voice rules.
pub struct DraftGenerator {
    client: Arc<GuardedClient>,
    validator: ComplianceValidator,
    brand: BrandConfig,
    learning: LearningConfig,
    corpus: Option<Arc<dyn ExampleCorpus>>,
}

impl DraftGenerator {
    pub fn new(client: Arc<GuardedClient>, config: &FileConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            validator: ComplianceValidator::new(&config.voice)?,
            brand: config.brand.clone(),
            learning: config.llm.learning.clone(),
            corpus: None,
        })
    }

    /// Source of well-performing past replies shown as examples.
    pub fn with_corpus(mut self, corpus: Arc<dyn ExampleCorpus>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    pub fn validator(&self) -> &ComplianceValidator {
        &self.validator
    }

    pub fn client(&self) -> &GuardedClient {
        &self.client
    }

    /// Generate a compliant reply in at most `max_attempts` LLM calls.
    ///
    /// After a non-compliant draft the user prompt is rebuilt with that
    /// draft and its violations appended. The returned cost covers every
    /// attempt, including the rejected ones.
    pub async fn generate(&self, post: &Post, max_attempts: u32) -> Result<DraftResult, DraftError> {
        let max_attempts = max_attempts.max(1);
        let voice = self.validator.config();
        let (preferred_max, _) = voice.limits_for(Some(post.platform));

        let examples = self.learning_examples().await;
        let system = prompts::system_prompt(&self.brand, voice, post.platform);
        let base = prompts::user_prompt(post, preferred_max, &examples);

        let mut user = base.clone();
        let mut total_cost = 0.0;
        let mut last_violations = Vec::new();

        for attempt in 1..=max_attempts {
            let messages = [Message::system(system.as_str()), Message::user(user.as_str())];
            let completion = self
                .client
                .complete(&messages, None, None)
                .await
                .map_err(|e| DraftError::from_llm(e, total_cost))?;
            total_cost += completion.cost_usd;

            let text = strip_wrapping_quotes(&completion.text).to_string();
            let compliance = self.validator.validate(&text, Some(post.platform));

            info!(
                item_id = post.id.as_str(),
                attempt,
                max_attempts,
                chars = compliance.char_count,
                score = compliance.score,
                "Draft generated"
            );

            if compliance.is_valid {
                return Ok(DraftResult {
                    text,
                    compliance_score: compliance.score,
                    violations: compliance.violations,
                    warnings: compliance.warnings,
                    attempt_number: attempt,
                    cost_usd: total_cost,
                    status: DraftStatus::Pending,
                    generated_at: Utc::now(),
                });
            }

            warn!(
                item_id = post.id.as_str(),
                attempt,
                violations = ?compliance.violations,
                "Draft failed voice validation"
            );
            user = prompts::feedback_prompt(
                &base,
                &text,
                &compliance.violations,
                &self.brand,
                preferred_max,
            );
            last_violations = compliance.violations;
        }

        Err(DraftError::ComplianceExhausted {
            attempts: max_attempts,
            violations: last_violations,
            cost_usd: total_cost,
        })
    }

    /// Examples are optional context. A corpus failure is logged and the
    /// draft proceeds without them.
    async fn learning_examples(&self) -> Vec<ReplyExample> {
        let learning = &self.learning;
        let Some(corpus) = self
            .corpus
            .as_ref()
            .filter(|_| learning.enabled && learning.corpus_size > 0)
        else {
            return Vec::new();
        };

        let pool = if learning.rotation {
            learning.corpus_size * ROTATION_POOL_FACTOR
        } else {
            learning.corpus_size
        };

        match corpus.good_examples(learning.min_engagement_rate, pool).await {
            Ok(candidates) if candidates.len() > learning.corpus_size => candidates
                .choose_multiple(&mut rand::rng(), learning.corpus_size)
                .cloned()
                .collect(),
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Learning corpus unavailable, drafting without examples");
                Vec::new()
            }
        }
    }
}
