use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{info, warn};

/// Per-million-token prices in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_million: 3.0,
            output_per_million: 15.0,
        }
    }
}

impl Pricing {
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (completion_tokens as f64 / 1_000_000.0) * self.output_per_million
    }
}

#[derive(Debug, Clone, Default)]
pub struct BudgetState {
    pub total_cost_usd: f64,
    pub total_tokens: u64,
    pub last_call_at: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageStats {
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub daily_budget_usd: f64,
    pub remaining_usd: f64,
    pub used_percent: f64,
}

/// Spend ledger for one budget period. Every mutation goes through the
/// inner mutex, so concurrent callers never lose an update.
pub struct BudgetLedger {
    daily_budget_usd: f64,
    state: Mutex<BudgetState>,
}

impl BudgetLedger {
    pub fn new(daily_budget_usd: f64) -> Self {
        Self {
            daily_budget_usd,
            state: Mutex::new(BudgetState::default()),
        }
    }

    pub fn daily_budget(&self) -> f64 {
        self.daily_budget_usd
    }

    /// Lock the ledger. Held by the guarded client across the spacing check
    /// so two callers cannot both pass the ceiling test.
    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, BudgetState> {
        self.state.lock().await
    }

    pub async fn has_budget(&self) -> bool {
        self.state.lock().await.total_cost_usd < self.daily_budget_usd
    }

    /// Record the tokens and cost of a completed call.
    pub async fn spend(&self, tokens: u64, cost_usd: f64) {
        let mut state = self.state.lock().await;
        state.total_tokens += tokens;
        state.total_cost_usd += cost_usd;
        if state.total_cost_usd >= self.daily_budget_usd {
            warn!(
                spent_usd = state.total_cost_usd,
                budget_usd = self.daily_budget_usd,
                "LLM budget exhausted"
            );
        }
    }

    pub async fn total_spent(&self) -> f64 {
        self.state.lock().await.total_cost_usd
    }

    pub async fn usage(&self) -> UsageStats {
        let state = self.state.lock().await;
        let remaining = (self.daily_budget_usd - state.total_cost_usd).max(0.0);
        let used_percent = if self.daily_budget_usd > 0.0 {
            state.total_cost_usd / self.daily_budget_usd * 100.0
        } else {
            100.0
        };
        UsageStats {
            total_tokens: state.total_tokens,
            total_cost_usd: state.total_cost_usd,
            daily_budget_usd: self.daily_budget_usd,
            remaining_usd: remaining,
            used_percent,
        }
    }

    /// Start a new budget period.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.total_cost_usd = 0.0;
        state.total_tokens = 0;
        info!("LLM usage ledger reset");
    }

    pub async fn log_status(&self) {
        let usage = self.usage().await;
        info!(
            spent_usd = format!("{:.4}", usage.total_cost_usd),
            remaining_usd = format!("{:.4}", usage.remaining_usd),
            tokens = usage.total_tokens,
            "LLM budget status"
        );
    }
}
