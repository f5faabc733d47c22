use async_trait::async_trait;
use tracing::info;

use replyscout_common::QueueEntry;

use super::ApprovalNotifier;

/// Logs instead of notifying. Used for dry runs and when no chat is configured.
pub struct NoopNotifier;

#[async_trait]
impl ApprovalNotifier for NoopNotifier {
    async fn send_approval_request(&self, entry: &QueueEntry) -> anyhow::Result<()> {
        info!(queue_id = %entry.id, item_id = entry.item_id.as_str(), "Draft queued (no notifier)");
        Ok(())
    }

    async fn send_error_alert(&self, _message: &str, _context: Option<&str>) -> anyhow::Result<()> {
        Ok(())
    }
}
