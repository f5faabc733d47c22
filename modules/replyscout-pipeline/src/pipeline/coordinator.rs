use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use replyscout_common::{ConfigError, FileConfig, ItemStatus, Post, QueueEntry};

use super::{RunReport, RunStage, RunStats, RunStatus};
use crate::dedup::DedupGuard;
use crate::drafting::DraftGenerator;
use crate::filtering::{EligibilityFilter, PriorityFilter};
use crate::notify::ApprovalNotifier;
use crate::scheduling::ActiveWindow;
use crate::scoring::OpportunityScorer;
use crate::traits::{AuditUpdate, EngagementLog, PostSource, RunStore};

/// Runs the reply pipeline once: scrape, filter, prioritize, score,
/// deduplicate, draft, queue.
///
/// Per-item failures are audited and skipped. Storage failures while
/// auditing abort the run as `Failed` and raise an error alert.
pub struct Coordinator {
    config: Arc<FileConfig>,
    window: ActiveWindow,
    eligibility: EligibilityFilter,
    priority: PriorityFilter,
    scorer: OpportunityScorer,
    dedup: DedupGuard,
    drafter: DraftGenerator,
    sources: Vec<Arc<dyn PostSource>>,
    store: Arc<dyn RunStore>,
    notifier: Arc<dyn ApprovalNotifier>,
    cancelled: Arc<AtomicBool>,
}

/// Where a run got to, kept outside `run_inner` so a failed run still
/// reports its counters.
struct Progress {
    stage: RunStage,
    stats: RunStats,
}

impl Coordinator {
    pub fn new(
        config: Arc<FileConfig>,
        drafter: DraftGenerator,
        log: Arc<dyn EngagementLog>,
        store: Arc<dyn RunStore>,
        notifier: Arc<dyn ApprovalNotifier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let window = ActiveWindow::new(&config.schedule, &config.behavior)?;
        Ok(Self {
            eligibility: EligibilityFilter::new(&config.filters)?,
            priority: PriorityFilter::new(&config.priority),
            scorer: OpportunityScorer::new(&config.scoring, window.clone())?,
            dedup: DedupGuard::new(log, &config.deduplication),
            window,
            drafter,
            sources: Vec::new(),
            store,
            notifier,
            cancelled: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    pub fn with_source(mut self, source: Arc<dyn PostSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Setting this flag stops the run before the next item.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn window(&self) -> &ActiveWindow {
        &self.window
    }

    pub fn dedup(&self) -> &DedupGuard {
        &self.dedup
    }

    pub async fn run(&self) -> RunReport {
        self.run_at(Utc::now()).await
    }

    /// One run evaluated at `now`. Politeness delays still sleep in real time.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunReport {
        let run_id = Uuid::new_v4();

        if let Some(wait) = self.window.time_until_active(now) {
            info!(%run_id, wait_secs = wait.as_secs(), "Outside active window, skipping run");
            return RunReport {
                run_id,
                status: RunStatus::Skipped,
                stage: RunStage::Idle,
                stats: RunStats::default(),
                time_until_active: Some(wait),
                error: None,
            };
        }

        info!(%run_id, "Starting run");
        let mut progress = Progress {
            stage: RunStage::Idle,
            stats: RunStats::default(),
        };

        let (status, error) = match self.run_inner(run_id, now, &mut progress).await {
            Ok(status) => (status, None),
            Err(e) => {
                error!(%run_id, stage = %progress.stage, error = %e, "Run failed");
                let context = format!("Run {run_id}");
                if let Err(alert) = self
                    .notifier
                    .send_error_alert(&format!("{e:#}"), Some(&context))
                    .await
                {
                    warn!(error = %alert, "Failed to send error alert");
                }
                (RunStatus::Failed, Some(format!("{e:#}")))
            }
        };

        self.maintenance(now).await;

        info!(%run_id, status = %status, stage = %progress.stage, "{}", progress.stats);
        RunReport {
            run_id,
            status,
            stage: progress.stage,
            stats: progress.stats,
            time_until_active: None,
            error,
        }
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        now: DateTime<Utc>,
        progress: &mut Progress,
    ) -> Result<RunStatus> {
        // Scrape
        let posts = self.scrape_all(&mut progress.stats).await;
        progress.stage = RunStage::Scraped;
        progress.stats.posts_scraped = posts.len() as u32;
        for post in &posts {
            self.audit(run_id, post, ItemStatus::Scraped, None, None).await?;
        }
        if posts.is_empty() {
            info!(%run_id, "No posts scraped");
            return Ok(RunStatus::Completed);
        }

        // Eligibility
        let outcome = self.eligibility.filter_batch_at(posts, now);
        for rejected in &outcome.rejected {
            self.audit(
                run_id,
                &rejected.post,
                ItemStatus::Filtered,
                Some(rejected.reason.clone()),
                None,
            )
            .await?;
        }
        progress.stage = RunStage::Filtered;
        progress.stats.after_eligibility = outcome.passed.len() as u32;
        if outcome.passed.is_empty() {
            return Ok(RunStatus::Completed);
        }

        // Priority
        let outcome = self.priority.filter_batch(outcome.passed);
        for rejected in &outcome.rejected {
            self.audit(
                run_id,
                &rejected.post,
                ItemStatus::Filtered,
                Some(rejected.reason.clone()),
                json(&rejected.post.priority),
            )
            .await?;
        }
        for post in &outcome.passed {
            self.audit(run_id, post, ItemStatus::Analyzed, None, json(&post.priority))
                .await?;
        }
        let ranked = self.priority.rank(outcome.passed);
        progress.stage = RunStage::Prioritized;
        progress.stats.after_priority = ranked.len() as u32;
        if ranked.is_empty() {
            return Ok(RunStatus::Completed);
        }

        // Scoring
        let outcome = self.scorer.rank_at(ranked, true, now);
        for rejected in &outcome.rejected {
            self.audit(
                run_id,
                &rejected.post,
                ItemStatus::Filtered,
                Some(rejected.reason.clone()),
                json(&rejected.post.score),
            )
            .await?;
        }
        for post in &outcome.passed {
            self.audit(run_id, post, ItemStatus::Scored, None, json(&post.score))
                .await?;
        }
        progress.stage = RunStage::Scored;
        progress.stats.after_scoring = outcome.passed.len() as u32;
        if outcome.passed.is_empty() {
            return Ok(RunStatus::Completed);
        }

        // Dedup
        let outcome = self.dedup.filter_batch_at(outcome.passed, now).await;
        for rejected in &outcome.rejected {
            self.audit(
                run_id,
                &rejected.post,
                ItemStatus::Deduplicated,
                Some(rejected.reason.clone()),
                None,
            )
            .await?;
        }
        progress.stage = RunStage::Deduplicated;
        progress.stats.after_dedup = outcome.passed.len() as u32;
        if outcome.passed.is_empty() {
            return Ok(RunStatus::Completed);
        }

        // Draft
        let limit = self.config.behavior.max_replies_per_session;
        let candidates: Vec<Post> = outcome.passed.into_iter().take(limit).collect();
        let (drafted, cancelled) = self.draft_all(run_id, candidates, &mut progress.stats).await?;
        progress.stage = RunStage::Drafted;
        if cancelled {
            return Ok(RunStatus::Cancelled);
        }
        if drafted.is_empty() {
            return Ok(RunStatus::Completed);
        }

        // Queue
        let cancelled = self.queue_all(run_id, &drafted, &mut progress.stats).await?;
        progress.stage = RunStage::Queued;
        if cancelled {
            return Ok(RunStatus::Cancelled);
        }
        Ok(RunStatus::Completed)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    async fn scrape_all(&self, stats: &mut RunStats) -> Vec<Post> {
        let enabled = self
            .sources
            .iter()
            .filter(|s| self.config.platforms.is_enabled(s.platform()));
        let results = join_all(enabled.map(|s| self.scrape_source(s.as_ref()))).await;

        let mut all = Vec::new();
        for (posts, failures) in results {
            stats.scrape_failures += failures;
            all.extend(posts);
        }
        let unique = dedupe_by_id(all);
        info!(posts = unique.len(), "Scrape complete");
        unique
    }

    /// Queries for one platform, run in order with a pause between them.
    async fn scrape_source(&self, source: &dyn PostSource) -> (Vec<Post>, u32) {
        let platform = source.platform();
        let limit = self.config.targets.max_results_per_query;
        let mut posts = Vec::new();
        let mut failures = 0;

        for (i, query) in self.config.targets.queries_for(platform).iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(ActiveWindow::jittered_delay(self.config.behavior.scrape_delay))
                    .await;
            }
            match source.scrape(query, limit).await {
                Ok(found) => {
                    info!(platform = %platform, query = query.as_str(), found = found.len(), "Query scraped");
                    posts.extend(found);
                }
                Err(e) => {
                    warn!(platform = %platform, query = query.as_str(), error = %e, "Scrape failed");
                    failures += 1;
                }
            }
        }
        (posts, failures)
    }

    /// Draft replies in rank order. Returns the drafted posts and whether
    /// the run was cancelled part way.
    async fn draft_all(
        &self,
        run_id: Uuid,
        candidates: Vec<Post>,
        stats: &mut RunStats,
    ) -> Result<(Vec<Post>, bool)> {
        let attempts = self.config.llm.generation_attempts;
        let mut drafted = Vec::new();

        for (i, mut post) in candidates.into_iter().enumerate() {
            if self.is_cancelled() {
                info!(%run_id, "Run cancelled during drafting");
                return Ok((drafted, true));
            }
            if i > 0 {
                tokio::time::sleep(ActiveWindow::jittered_delay(self.config.behavior.draft_delay))
                    .await;
            }

            match self.drafter.generate(&post, attempts).await {
                Ok(draft) => {
                    stats.drafts_generated += 1;
                    stats.cost_usd += draft.cost_usd;
                    self.audit(run_id, &post, ItemStatus::ReplyGenerated, None, json(&draft))
                        .await?;
                    post.draft = Some(draft);
                    drafted.push(post);

                    if self.window.should_break(stats.drafts_generated) {
                        let pause = self.window.break_duration();
                        info!(minutes = pause.as_secs() / 60, "Taking a break");
                        tokio::time::sleep(pause).await;
                    }
                }
                Err(e) => {
                    stats.draft_errors += 1;
                    stats.cost_usd += e.cost_usd();
                    warn!(item_id = post.id.as_str(), error = %e, "Draft failed");
                    let details = serde_json::json!({ "cost_usd": e.cost_usd() });
                    self.audit(run_id, &post, ItemStatus::Error, Some(e.to_string()), Some(details))
                        .await?;
                    if e.is_budget() {
                        warn!(%run_id, "LLM budget exhausted, no more drafts this run");
                        break;
                    }
                }
            }
        }
        Ok((drafted, false))
    }

    /// Enqueue then notify. A notifier failure leaves the entry queued.
    async fn queue_all(&self, run_id: Uuid, drafted: &[Post], stats: &mut RunStats) -> Result<bool> {
        for (i, post) in drafted.iter().enumerate() {
            if self.is_cancelled() {
                info!(%run_id, "Run cancelled during queueing");
                return Ok(true);
            }
            let Some(draft) = post.draft.as_ref() else {
                continue;
            };
            if i > 0 {
                tokio::time::sleep(ActiveWindow::jittered_delay(self.config.behavior.notify_delay))
                    .await;
            }

            let entry = QueueEntry::from_drafted(post, draft, run_id);
            if let Err(e) = self.store.enqueue(&entry).await {
                stats.queue_failures += 1;
                warn!(item_id = post.id.as_str(), error = %e, "Failed to enqueue draft");
                self.audit(
                    run_id,
                    post,
                    ItemStatus::Error,
                    Some(format!("Enqueue failed: {e}")),
                    None,
                )
                .await?;
                continue;
            }
            stats.queued += 1;
            self.audit(
                run_id,
                post,
                ItemStatus::Queued,
                None,
                Some(serde_json::json!({ "queue_id": entry.id })),
            )
            .await?;

            if let Err(e) = self.notifier.send_approval_request(&entry).await {
                stats.notify_failures += 1;
                warn!(queue_id = %entry.id, error = %e, "Approval notification failed");
            }
        }
        Ok(false)
    }

    async fn audit(
        &self,
        run_id: Uuid,
        post: &Post,
        status: ItemStatus,
        reason: Option<String>,
        details: Option<serde_json::Value>,
    ) -> Result<()> {
        self.store
            .record_item(AuditUpdate {
                run_id,
                post,
                status,
                reason,
                details,
            })
            .await
            .with_context(|| format!("Failed to audit item {} as {status}", post.id))
    }

    /// Prune engagement history and old audit rows. Failures are logged only.
    async fn maintenance(&self, now: DateTime<Utc>) {
        if let Err(e) = self.dedup.cleanup_at(now).await {
            warn!(error = %e, "Engagement cleanup failed");
        }
        let cutoff = now - Duration::days(self.config.retention.audit_days);
        match self.store.prune_audit(cutoff).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Old audit rows removed"),
            Err(e) => warn!(error = %e, "Audit prune failed"),
        }
    }
}

fn json<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok().filter(|v| !v.is_null())
}

/// First occurrence of each id wins; order is kept.
fn dedupe_by_id(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::post;

    #[test]
    fn dedupe_keeps_first_occurrence_in_order() {
        let mut dup = post("a", "second copy");
        dup.search_term = "later".into();
        let posts = vec![post("a", "first copy"), post("b", "other"), dup];

        let unique = dedupe_by_id(posts);
        let ids: Vec<&str> = unique.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(unique[0].text, "first copy");
    }

    #[test]
    fn json_drops_missing_details() {
        let none: Option<u32> = None;
        assert_eq!(json(&none), None);
        assert_eq!(json(&Some(3)), Some(serde_json::json!(3)));
    }
}
