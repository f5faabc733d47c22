use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use replyscout_common::file_config::DeduplicationConfig;
use replyscout_common::{EngagementRecord, Post, PriorityTier};

use crate::filtering::{BatchOutcome, Rejected};
use crate::traits::EngagementLog;

/// Outcome of a history check. `reason` is set iff `eligible` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupDecision {
    pub eligible: bool,
    pub reason: Option<String>,
}

impl DedupDecision {
    fn allow() -> Self {
        Self {
            eligible: true,
            reason: None,
        }
    }

    fn deny(reason: String) -> Self {
        Self {
            eligible: false,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementStats {
    pub hour_count: u64,
    pub hour_limit: u64,
    pub hour_remaining: u64,
    pub day_count: u64,
    pub day_limit: u64,
    pub day_remaining: u64,
    pub week_count: u64,
    pub unique_authors_7d: u64,
    pub total: u64,
}

/// Durable-history guard against replying twice to an item, pestering an
/// author inside the cooldown, or exceeding hourly/daily volume.
///
/// Checks only read the log. `record` and `cleanup` are the only writers
/// and are serialized behind one lock.
pub struct DedupGuard {
    log: Arc<dyn EngagementLog>,
    config: DeduplicationConfig,
    write_lock: Mutex<()>,
}

impl DedupGuard {
    pub fn new(log: Arc<dyn EngagementLog>, config: &DeduplicationConfig) -> Self {
        Self {
            log,
            config: config.clone(),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn check(&self, item_id: &str, author: &str) -> Result<DedupDecision> {
        self.check_at(item_id, author, Utc::now()).await
    }

    /// Already-engaged, then author cooldown, then hourly and daily caps.
    /// The first failing check decides.
    pub async fn check_at(
        &self,
        item_id: &str,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<DedupDecision> {
        if item_id.is_empty() || author.is_empty() {
            return Ok(DedupDecision::deny("Missing item id or author".to_string()));
        }

        let history_since = now - Duration::days(self.config.history_days);
        if self.log.item_engaged_since(item_id, history_since).await? {
            return Ok(DedupDecision::deny(format!(
                "Already engaged with item {item_id}"
            )));
        }

        let cooldown_since = now - Duration::hours(self.config.author_cooldown_hours);
        if self.log.author_engaged_since(author, cooldown_since).await? {
            return Ok(DedupDecision::deny(format!("Author @{author} on cooldown")));
        }

        let hour = self.log.count_since(now - Duration::hours(1)).await?;
        if hour >= self.config.max_per_hour {
            return Ok(DedupDecision::deny(format!(
                "Hourly limit reached: {hour}/{}",
                self.config.max_per_hour
            )));
        }

        let day = self.log.count_since(now - Duration::days(1)).await?;
        if day >= self.config.max_per_day {
            return Ok(DedupDecision::deny(format!(
                "Daily limit reached: {day}/{}",
                self.config.max_per_day
            )));
        }

        Ok(DedupDecision::allow())
    }

    pub async fn filter_batch(&self, posts: Vec<Post>) -> BatchOutcome {
        self.filter_batch_at(posts, Utc::now()).await
    }

    /// Partition posts by history. A failed lookup rejects only that post.
    pub async fn filter_batch_at(&self, posts: Vec<Post>, now: DateTime<Utc>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for post in posts {
            match self.check_at(&post.id, &post.author.username, now).await {
                Ok(decision) if decision.eligible => outcome.passed.push(post),
                Ok(decision) => outcome.rejected.push(Rejected {
                    post,
                    reason: decision.reason.unwrap_or_default(),
                }),
                Err(e) => {
                    warn!(item_id = post.id.as_str(), error = %e, "History lookup failed");
                    outcome.rejected.push(Rejected {
                        post,
                        reason: format!("History lookup failed: {e}"),
                    });
                }
            }
        }

        info!(
            passed = outcome.passed.len(),
            total = outcome.total(),
            "Deduplication complete"
        );
        outcome
    }

    pub async fn record(
        &self,
        item_id: &str,
        author: &str,
        reply_text: &str,
        priority_tier: PriorityTier,
        score: f64,
    ) -> Result<()> {
        self.record_at(item_id, author, reply_text, priority_tier, score, Utc::now())
            .await
    }

    /// Append one engagement. Callers record each item at most once.
    pub async fn record_at(
        &self,
        item_id: &str,
        author: &str,
        reply_text: &str,
        priority_tier: PriorityTier,
        score: f64,
        acted_at: DateTime<Utc>,
    ) -> Result<()> {
        let _write = self.write_lock.lock().await;
        self.log
            .append(&EngagementRecord {
                item_id: item_id.to_string(),
                author: author.to_string(),
                acted_at,
                reply_text: reply_text.to_string(),
                priority_tier,
                score,
            })
            .await?;
        info!(item_id, author, "Engagement recorded");
        Ok(())
    }

    pub async fn cleanup(&self) -> Result<u64> {
        self.cleanup_at(Utc::now()).await
    }

    /// Drop records older than the history window.
    pub async fn cleanup_at(&self, now: DateTime<Utc>) -> Result<u64> {
        let _write = self.write_lock.lock().await;
        let cutoff = now - Duration::days(self.config.history_days);
        let removed = self.log.delete_before(cutoff).await?;
        if removed > 0 {
            info!(removed, history_days = self.config.history_days, "Old engagement records removed");
        }
        Ok(removed)
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<EngagementStats> {
        let hour_count = self.log.count_since(now - Duration::hours(1)).await?;
        let day_count = self.log.count_since(now - Duration::days(1)).await?;
        let week_since = now - Duration::days(7);

        Ok(EngagementStats {
            hour_count,
            hour_limit: self.config.max_per_hour,
            hour_remaining: self.config.max_per_hour.saturating_sub(hour_count),
            day_count,
            day_limit: self.config.max_per_day,
            day_remaining: self.config.max_per_day.saturating_sub(day_count),
            week_count: self.log.count_since(week_since).await?,
            unique_authors_7d: self.log.unique_authors_since(week_since).await?,
            total: self.log.total().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use replyscout_common::{Author, Platform};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn config() -> DeduplicationConfig {
        DeduplicationConfig {
            history_days: 30,
            author_cooldown_hours: 24,
            max_per_hour: 2,
            max_per_day: 3,
        }
    }

    fn guard() -> (DedupGuard, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (DedupGuard::new(store.clone(), &config()), store)
    }

    async fn record(guard: &DedupGuard, item: &str, author: &str, at: DateTime<Utc>) {
        guard
            .record_at(item, author, "Rather lovely", PriorityTier::High, 70.0, at)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fresh_item_is_eligible() {
        let (guard, _) = guard();
        let decision = guard.check_at("1", "maker", now()).await.unwrap();
        assert_eq!(decision, DedupDecision::allow());
    }

    #[tokio::test]
    async fn recorded_item_and_author_are_blocked() {
        let (guard, store) = guard();
        record(&guard, "1", "maker", now() - Duration::hours(1)).await;
        assert_eq!(store.engagements().len(), 1);

        let same_item = guard.check_at("1", "someone_else", now()).await.unwrap();
        assert_eq!(same_item.reason.as_deref(), Some("Already engaged with item 1"));

        let same_author = guard.check_at("2", "maker", now()).await.unwrap();
        assert!(!same_author.eligible);
        assert_eq!(same_author.reason.as_deref(), Some("Author @maker on cooldown"));
    }

    #[tokio::test]
    async fn item_check_wins_over_cooldown() {
        let (guard, _) = guard();
        record(&guard, "1", "maker", now()).await;
        let decision = guard.check_at("1", "maker", now()).await.unwrap();
        assert!(decision.reason.unwrap().starts_with("Already engaged"));
    }

    #[tokio::test]
    async fn cooldown_expires() {
        let (guard, _) = guard();
        record(&guard, "1", "maker", now() - Duration::hours(25)).await;
        assert!(guard.check_at("2", "maker", now()).await.unwrap().eligible);
        // Item history outlives the author cooldown.
        assert!(!guard.check_at("1", "maker", now()).await.unwrap().eligible);
    }

    #[tokio::test]
    async fn hourly_then_daily_caps() {
        let (guard, _) = guard();
        record(&guard, "1", "a", now() - Duration::minutes(10)).await;
        record(&guard, "2", "b", now() - Duration::minutes(20)).await;
        let hourly = guard.check_at("9", "z", now()).await.unwrap();
        assert_eq!(hourly.reason.as_deref(), Some("Hourly limit reached: 2/2"));

        let later = now() + Duration::hours(2);
        record(&guard, "3", "c", later - Duration::minutes(5)).await;
        let daily = guard.check_at("9", "z", later).await.unwrap();
        assert_eq!(daily.reason.as_deref(), Some("Daily limit reached: 3/3"));
    }

    #[tokio::test]
    async fn checks_are_idempotent() {
        let (guard, store) = guard();
        record(&guard, "1", "maker", now()).await;
        let first = guard.check_at("2", "maker", now()).await.unwrap();
        let second = guard.check_at("2", "maker", now()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.engagements().len(), 1);
    }

    #[tokio::test]
    async fn batch_rejects_missing_author() {
        let (guard, _) = guard();
        record(&guard, "seen", "old_friend", now()).await;
        let post = |id: &str, author: &str| {
            Post::builder()
                .id(id)
                .platform(Platform::Twitter)
                .text("text")
                .author(Author::builder().username(author).build())
                .created_at(now())
                .build()
        };

        let outcome = guard
            .filter_batch_at(vec![post("new", "maker"), post("seen", "x"), post("3", "")], now())
            .await;
        assert_eq!(outcome.passed.len(), 1);
        let reasons: Vec<&str> = outcome.rejected.iter().map(|r| r.reason.as_str()).collect();
        assert_eq!(reasons, vec!["Already engaged with item seen", "Missing item id or author"]);
    }

    #[tokio::test]
    async fn cleanup_and_stats() {
        let (guard, _) = guard();
        record(&guard, "old", "a", now() - Duration::days(40)).await;
        record(&guard, "week", "b", now() - Duration::days(3)).await;
        record(&guard, "hour", "b", now() - Duration::minutes(5)).await;

        assert_eq!(guard.cleanup_at(now()).await.unwrap(), 1);

        let stats = guard.stats(now()).await.unwrap();
        assert_eq!(stats.hour_count, 1);
        assert_eq!(stats.hour_remaining, 1);
        assert_eq!(stats.day_count, 1);
        assert_eq!(stats.day_remaining, 2);
        assert_eq!(stats.week_count, 2);
        assert_eq!(stats.unique_authors_7d, 1);
        assert_eq!(stats.total, 2);
    }
}
