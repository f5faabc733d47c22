use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use replyscout_common::{EngagementRecord, ItemStatus, QueueEntry, ReplyExample};

use crate::traits::{AuditUpdate, EngagementLog, ExampleCorpus, RunStore};

/// Postgres-backed engagement log, audit trail, queue and example corpus.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ExampleRow {
    original_text: String,
    reply_text: String,
    engagement_rate: f64,
    posted_at: DateTime<Utc>,
}

impl From<ExampleRow> for ReplyExample {
    fn from(row: ExampleRow) -> Self {
        Self {
            original_text: row.original_text,
            reply_text: row.reply_text,
            engagement_rate: row.engagement_rate,
            posted_at: row.posted_at,
        }
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl EngagementLog for PgStore {
    async fn item_engaged_since(&self, item_id: &str, since: DateTime<Utc>) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM engagement_records
                WHERE item_id = $1 AND acted_at >= $2
            )
            "#,
        )
        .bind(item_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn author_engaged_since(&self, author: &str, since: DateTime<Utc>) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM engagement_records
                WHERE author = $1 AND acted_at >= $2
            )
            "#,
        )
        .bind(author)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM engagement_records WHERE acted_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn unique_authors_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT author) FROM engagement_records WHERE acted_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn total(&self) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM engagement_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn append(&self, record: &EngagementRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO engagement_records
                (item_id, author, acted_at, reply_text, priority_tier, score)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&record.item_id)
        .bind(&record.author)
        .bind(record.acted_at)
        .bind(&record.reply_text)
        .bind(record.priority_tier.as_str())
        .bind(record.score)
        .execute(&self.pool)
        .await
        .context("Failed to append engagement record")?;
        Ok(())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM engagement_records WHERE acted_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RunStore for PgStore {
    async fn record_item(&self, update: AuditUpdate<'_>) -> Result<()> {
        let post = update.post;
        sqlx::query(
            r#"
            INSERT INTO post_audit
                (run_id, item_id, platform, author, text, search_term, status, reason, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (run_id, item_id) DO UPDATE SET
                status = EXCLUDED.status,
                reason = EXCLUDED.reason,
                details = COALESCE(EXCLUDED.details, post_audit.details),
                updated_at = now()
            "#,
        )
        .bind(update.run_id)
        .bind(&post.id)
        .bind(post.platform.as_str())
        .bind(&post.author.username)
        .bind(&post.text)
        .bind(&post.search_term)
        .bind(update.status.as_str())
        .bind(&update.reason)
        .bind(&update.details)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to audit item {}", post.id))?;
        Ok(())
    }

    async fn enqueue(&self, entry: &QueueEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reply_queue
                (id, item_id, platform, author, post_text, post_url, metrics,
                 reply_text, score, priority_tier, priority, compliance_score,
                 violations, attempt_number, cost_usd, run_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.item_id)
        .bind(entry.platform.as_str())
        .bind(&entry.author)
        .bind(&entry.post_text)
        .bind(&entry.post_url)
        .bind(serde_json::to_value(&entry.metrics)?)
        .bind(&entry.reply_text)
        .bind(entry.score)
        .bind(entry.priority_tier.as_str())
        .bind(entry.priority.as_ref().map(serde_json::to_value).transpose()?)
        .bind(entry.compliance_score as i32)
        .bind(serde_json::to_value(&entry.violations)?)
        .bind(entry.attempt_number as i32)
        .bind(entry.cost_usd)
        .bind(entry.run_id)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to enqueue draft for item {}", entry.item_id))?;
        Ok(())
    }

    async fn prune_audit(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM post_audit WHERE created_at < $1 AND status <> $2")
            .bind(cutoff)
            .bind(ItemStatus::Queued.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ExampleCorpus for PgStore {
    async fn good_examples(
        &self,
        min_engagement_rate: f64,
        limit: usize,
    ) -> Result<Vec<ReplyExample>> {
        let rows = sqlx::query_as::<_, ExampleRow>(
            r#"
            SELECT original_text, reply_text, engagement_rate, posted_at
            FROM reply_performance
            WHERE marked_as_good_example AND engagement_rate >= $1
            ORDER BY posted_at DESC
            LIMIT $2
            "#,
        )
        .bind(min_engagement_rate)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ReplyExample::from).collect())
    }
}
