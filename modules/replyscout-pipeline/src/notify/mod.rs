pub mod noop;
pub mod telegram;

pub use noop::NoopNotifier;
pub use telegram::TelegramNotifier;

use async_trait::async_trait;

use replyscout_common::QueueEntry;

/// Where drafts go for a human decision.
#[async_trait]
pub trait ApprovalNotifier: Send + Sync {
    /// Announce a queued draft. The approve/reject round trip is handled
    /// outside this process.
    async fn send_approval_request(&self, entry: &QueueEntry) -> anyhow::Result<()>;

    async fn send_error_alert(&self, message: &str, context: Option<&str>) -> anyhow::Result<()>;
}
