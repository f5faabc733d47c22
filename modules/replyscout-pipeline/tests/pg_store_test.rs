//! PgStore against a real Postgres.
//!
//! Requirements:
//!   - DATABASE_TEST_URL pointing at a disposable database
//!
//! Every test skips when the variable is unset.

use chrono::{Duration, Utc};
use uuid::Uuid;

use replyscout_common::{DraftResult, DraftStatus, EngagementRecord, ItemStatus, PriorityTier, QueueEntry};
use replyscout_pipeline::store::PgStore;
use replyscout_pipeline::testing::post;
use replyscout_pipeline::traits::{AuditUpdate, EngagementLog, RunStore};

async fn store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let store = PgStore::connect(&url).await.expect("connect");
    store.migrate().await.expect("migrate");
    Some(store)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

#[tokio::test]
async fn engagement_lookups_respect_the_window() {
    let Some(store) = store().await else {
        eprintln!("Skipping: DATABASE_TEST_URL not set");
        return;
    };
    let item = unique("item");
    let author = unique("author");
    let now = Utc::now();

    store
        .append(&EngagementRecord {
            item_id: item.clone(),
            author: author.clone(),
            acted_at: now - Duration::hours(2),
            reply_text: "Rather lovely".into(),
            priority_tier: PriorityTier::High,
            score: 72.5,
        })
        .await
        .unwrap();

    assert!(store.item_engaged_since(&item, now - Duration::hours(3)).await.unwrap());
    assert!(!store.item_engaged_since(&item, now - Duration::hours(1)).await.unwrap());
    assert!(store.author_engaged_since(&author, now - Duration::days(1)).await.unwrap());
    assert!(store.count_since(now - Duration::hours(3)).await.unwrap() >= 1);
}

#[tokio::test]
async fn audit_upsert_advances_status_and_keeps_details() {
    let Some(store) = store().await else {
        eprintln!("Skipping: DATABASE_TEST_URL not set");
        return;
    };
    let run_id = Uuid::new_v4();
    let p = post(&unique("post"), "My startup needs its first customers");

    store
        .record_item(AuditUpdate {
            run_id,
            post: &p,
            status: ItemStatus::Analyzed,
            reason: None,
            details: Some(serde_json::json!({ "tier": "medium" })),
        })
        .await
        .unwrap();
    store
        .record_item(AuditUpdate {
            run_id,
            post: &p,
            status: ItemStatus::Deduplicated,
            reason: Some("Author @maker on cooldown".into()),
            details: None,
        })
        .await
        .unwrap();

    let (status, reason, details): (String, Option<String>, Option<serde_json::Value>) =
        sqlx::query_as(
            "SELECT status, reason, details FROM post_audit WHERE run_id = $1 AND item_id = $2",
        )
        .bind(run_id)
        .bind(&p.id)
        .fetch_one(store.pool())
        .await
        .unwrap();

    assert_eq!(status, "deduplicated");
    assert_eq!(reason.as_deref(), Some("Author @maker on cooldown"));
    assert_eq!(details.unwrap()["tier"], "medium");
}

#[tokio::test]
async fn enqueued_entry_is_pending() {
    let Some(store) = store().await else {
        eprintln!("Skipping: DATABASE_TEST_URL not set");
        return;
    };
    let p = post(&unique("post"), "My startup needs its first customers");
    let draft = DraftResult {
        text: "Perhaps start with one person you already help?".into(),
        compliance_score: 100,
        violations: vec![],
        warnings: vec![],
        attempt_number: 1,
        cost_usd: 0.0045,
        status: DraftStatus::Pending,
        generated_at: Utc::now(),
    };
    let entry = QueueEntry::from_drafted(&p, &draft, Uuid::new_v4());

    store.enqueue(&entry).await.unwrap();

    let (status, reply): (String, String) =
        sqlx::query_as("SELECT status, reply_text FROM reply_queue WHERE id = $1")
            .bind(entry.id)
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(status, "pending");
    assert_eq!(reply, draft.text);
}
