pub mod coordinator;
pub mod stats;

pub use coordinator::Coordinator;
pub use stats::RunStats;

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

/// Furthest stage a run reached. A run stops early at whichever stage
/// leaves the working set empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Idle,
    Scraped,
    Filtered,
    Prioritized,
    Scored,
    Deduplicated,
    Drafted,
    Queued,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStage::Idle => "idle",
            RunStage::Scraped => "scraped",
            RunStage::Filtered => "filtered",
            RunStage::Prioritized => "prioritized",
            RunStage::Scored => "scored",
            RunStage::Deduplicated => "deduplicated",
            RunStage::Drafted => "drafted",
            RunStage::Queued => "queued",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Outside the active window; nothing was scraped.
    Skipped,
    Cancelled,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Completed => "completed",
            RunStatus::Skipped => "skipped",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub stage: RunStage,
    pub stats: RunStats,
    /// Set when skipped: how long until the active window opens.
    pub time_until_active: Option<Duration>,
    pub error: Option<String>,
}

impl RunReport {
    pub fn is_skipped(&self) -> bool {
        self.status == RunStatus::Skipped
    }
}
