use thiserror::Error;

/// Failure of a single chat completion.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The ledger already sits at or above the ceiling. No request was made.
    #[error("Daily budget exceeded: ${spent:.4} spent of ${budget:.2}")]
    BudgetExceeded { spent: f64, budget: f64 },

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("OpenRouter API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("No response content from LLM")]
    EmptyResponse,

    #[error("Failed to decode LLM response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl LlmError {
    /// Whether a retry of the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Timeout | LlmError::Transport(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_budget(&self) -> bool {
        matches!(self, LlmError::BudgetExceeded { .. })
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_decode() {
            LlmError::Decode(err.to_string())
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}
