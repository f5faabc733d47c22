// Seams between the pipeline and the outside world.
//
// PostSource: one platform's scraper, however it obtains posts.
// EngagementLog: durable history of replies, backing dedup and rate caps.
// RunStore: per-run audit trail plus the approval queue.
// ExampleCorpus: well-performing past replies used as prompt examples.
//
// PgStore implements the three storage traits against Postgres; MemoryStore
// implements them in-process for dry runs and tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use replyscout_common::{EngagementRecord, ItemStatus, Platform, Post, QueueEntry, ReplyExample};

// ---------------------------------------------------------------------------
// PostSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PostSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Up to `limit` posts matching one search query.
    async fn scrape(&self, query: &str, limit: usize) -> Result<Vec<Post>>;
}

// ---------------------------------------------------------------------------
// EngagementLog
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EngagementLog: Send + Sync {
    /// Whether `item_id` was replied to at or after `since`.
    async fn item_engaged_since(&self, item_id: &str, since: DateTime<Utc>) -> Result<bool>;

    /// Whether any post by `author` was replied to at or after `since`.
    async fn author_engaged_since(&self, author: &str, since: DateTime<Utc>) -> Result<bool>;

    /// Replies recorded at or after `since`.
    async fn count_since(&self, since: DateTime<Utc>) -> Result<u64>;

    /// Distinct authors replied to at or after `since`.
    async fn unique_authors_since(&self, since: DateTime<Utc>) -> Result<u64>;

    async fn total(&self) -> Result<u64>;

    async fn append(&self, record: &EngagementRecord) -> Result<()>;

    /// Delete records acted on before `cutoff`. Returns the number removed.
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// RunStore
// ---------------------------------------------------------------------------

/// One audit row: the furthest stage a post reached in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditUpdate<'a> {
    pub run_id: Uuid,
    pub post: &'a Post,
    pub status: ItemStatus,
    pub reason: Option<String>,
    pub details: Option<serde_json::Value>,
}

#[async_trait]
pub trait RunStore: Send + Sync {
    /// Create or advance the audit row for (run, post). Earlier details are
    /// kept when `details` is `None`.
    async fn record_item(&self, update: AuditUpdate<'_>) -> Result<()>;

    /// Persist a draft awaiting approval.
    async fn enqueue(&self, entry: &QueueEntry) -> Result<()>;

    /// Delete audit rows created before `cutoff`, except rows that reached
    /// the queue. Returns the number removed.
    async fn prune_audit(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// ExampleCorpus
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ExampleCorpus: Send + Sync {
    /// Most recent replies marked as good examples with at least
    /// `min_engagement_rate`, newest first.
    async fn good_examples(&self, min_engagement_rate: f64, limit: usize)
        -> Result<Vec<ReplyExample>>;
}
