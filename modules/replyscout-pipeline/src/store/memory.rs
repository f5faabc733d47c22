use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use replyscout_common::{EngagementRecord, ItemStatus, QueueEntry, ReplyExample};

use super::AuditRow;
use crate::traits::{AuditUpdate, EngagementLog, ExampleCorpus, RunStore};

/// In-process store for dry runs and tests. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    engagements: Mutex<Vec<EngagementRecord>>,
    audit: Mutex<Vec<AuditRow>>,
    queue: Mutex<Vec<QueueEntry>>,
    examples: Mutex<Vec<ReplyExample>>,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the learning corpus.
    pub fn with_examples(self, examples: Vec<ReplyExample>) -> Self {
        *guard(&self.examples) = examples;
        self
    }

    pub fn engagements(&self) -> Vec<EngagementRecord> {
        guard(&self.engagements).clone()
    }

    pub fn audit_rows(&self) -> Vec<AuditRow> {
        guard(&self.audit).clone()
    }

    /// Audit row for one item in one run.
    pub fn audit_for(&self, run_id: Uuid, item_id: &str) -> Option<AuditRow> {
        guard(&self.audit)
            .iter()
            .find(|r| r.run_id == run_id && r.item_id == item_id)
            .cloned()
    }

    pub fn queued(&self) -> Vec<QueueEntry> {
        guard(&self.queue).clone()
    }
}

#[async_trait]
impl EngagementLog for MemoryStore {
    async fn item_engaged_since(&self, item_id: &str, since: DateTime<Utc>) -> Result<bool> {
        Ok(guard(&self.engagements)
            .iter()
            .any(|r| r.item_id == item_id && r.acted_at >= since))
    }

    async fn author_engaged_since(&self, author: &str, since: DateTime<Utc>) -> Result<bool> {
        Ok(guard(&self.engagements)
            .iter()
            .any(|r| r.author == author && r.acted_at >= since))
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<u64> {
        Ok(guard(&self.engagements)
            .iter()
            .filter(|r| r.acted_at >= since)
            .count() as u64)
    }

    async fn unique_authors_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let records = guard(&self.engagements);
        let mut authors: Vec<&str> = records
            .iter()
            .filter(|r| r.acted_at >= since)
            .map(|r| r.author.as_str())
            .collect();
        authors.sort_unstable();
        authors.dedup();
        Ok(authors.len() as u64)
    }

    async fn total(&self) -> Result<u64> {
        Ok(guard(&self.engagements).len() as u64)
    }

    async fn append(&self, record: &EngagementRecord) -> Result<()> {
        guard(&self.engagements).push(record.clone());
        Ok(())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut records = guard(&self.engagements);
        let before = records.len();
        records.retain(|r| r.acted_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn record_item(&self, update: AuditUpdate<'_>) -> Result<()> {
        let now = Utc::now();
        let mut rows = guard(&self.audit);
        let post = update.post;

        match rows
            .iter_mut()
            .find(|r| r.run_id == update.run_id && r.item_id == post.id)
        {
            Some(row) => {
                row.status = update.status;
                row.reason = update.reason;
                if update.details.is_some() {
                    row.details = update.details;
                }
                row.updated_at = now;
            }
            None => rows.push(AuditRow {
                run_id: update.run_id,
                item_id: post.id.clone(),
                platform: post.platform,
                author: post.author.username.clone(),
                text: post.text.clone(),
                search_term: post.search_term.clone(),
                status: update.status,
                reason: update.reason,
                details: update.details,
                created_at: now,
                updated_at: now,
            }),
        }
        Ok(())
    }

    async fn enqueue(&self, entry: &QueueEntry) -> Result<()> {
        guard(&self.queue).push(entry.clone());
        Ok(())
    }

    async fn prune_audit(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut rows = guard(&self.audit);
        let before = rows.len();
        rows.retain(|r| r.created_at >= cutoff || r.status == ItemStatus::Queued);
        Ok((before - rows.len()) as u64)
    }
}

#[async_trait]
impl ExampleCorpus for MemoryStore {
    async fn good_examples(
        &self,
        min_engagement_rate: f64,
        limit: usize,
    ) -> Result<Vec<ReplyExample>> {
        let mut examples: Vec<ReplyExample> = guard(&self.examples)
            .iter()
            .filter(|e| e.engagement_rate >= min_engagement_rate)
            .cloned()
            .collect();
        examples.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        examples.truncate(limit);
        Ok(examples)
    }
}
