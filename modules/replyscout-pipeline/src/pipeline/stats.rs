use serde::Serialize;

/// Counters from one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub posts_scraped: u32,
    pub scrape_failures: u32,
    pub after_eligibility: u32,
    pub after_priority: u32,
    pub after_scoring: u32,
    pub after_dedup: u32,
    pub drafts_generated: u32,
    pub draft_errors: u32,
    pub queued: u32,
    pub queue_failures: u32,
    pub notify_failures: u32,
    pub cost_usd: f64,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== ReplyScout Run Complete ===")?;
        writeln!(f, "Posts scraped:      {}", self.posts_scraped)?;
        writeln!(f, "Scrape failures:    {}", self.scrape_failures)?;
        writeln!(f, "After eligibility:  {}", self.after_eligibility)?;
        writeln!(f, "After priority:     {}", self.after_priority)?;
        writeln!(f, "After scoring:      {}", self.after_scoring)?;
        writeln!(f, "After dedup:        {}", self.after_dedup)?;
        writeln!(f, "\nDrafting:")?;
        writeln!(f, "  Generated: {}", self.drafts_generated)?;
        writeln!(f, "  Errors:    {}", self.draft_errors)?;
        writeln!(f, "  Queued:    {}", self.queued)?;
        if self.queue_failures > 0 {
            writeln!(f, "  Queue failures:  {}", self.queue_failures)?;
        }
        if self.notify_failures > 0 {
            writeln!(f, "  Notify failures: {}", self.notify_failures)?;
        }
        writeln!(f, "\nLLM cost: ${:.4}", self.cost_usd)?;
        Ok(())
    }
}
