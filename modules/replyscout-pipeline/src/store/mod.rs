pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use replyscout_common::{ItemStatus, Platform};

/// One row of the per-run audit trail as the stores hold it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRow {
    pub run_id: Uuid,
    pub item_id: String,
    pub platform: Platform,
    pub author: String,
    pub text: String,
    pub search_term: String,
    pub status: ItemStatus,
    pub reason: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
