pub mod generator;
pub mod prompts;

pub use generator::DraftGenerator;

use ai_client::LlmError;
use thiserror::Error;

/// Every variant carries the cost of the attempts made before it failed.
#[derive(Debug, Error)]
pub enum DraftError {
    /// The LLM budget for the period is spent. No further drafts can be
    /// produced until it resets.
    #[error("LLM budget exhausted: {source}")]
    Budget { source: LlmError, cost_usd: f64 },

    #[error("LLM call failed: {source}")]
    Llm { source: LlmError, cost_usd: f64 },

    /// Every attempt produced text that broke at least one voice rule.
    #[error("No compliant reply after {attempts} attempts: {}", violations.join("; "))]
    ComplianceExhausted {
        attempts: u32,
        violations: Vec<String>,
        cost_usd: f64,
    },
}

impl DraftError {
    /// Classify an LLM failure that happened after `cost_usd` was spent.
    pub fn from_llm(source: LlmError, cost_usd: f64) -> Self {
        if source.is_budget() {
            DraftError::Budget { source, cost_usd }
        } else {
            DraftError::Llm { source, cost_usd }
        }
    }

    pub fn is_budget(&self) -> bool {
        matches!(self, DraftError::Budget { .. })
    }

    pub fn cost_usd(&self) -> f64 {
        match self {
            DraftError::Budget { cost_usd, .. }
            | DraftError::Llm { cost_usd, .. }
            | DraftError::ComplianceExhausted { cost_usd, .. } => *cost_usd,
        }
    }
}
