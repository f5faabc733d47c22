//! Chat completion client with a hard spend ceiling.
//!
//! [`GuardedClient`] wraps any [`ChatBackend`] (in production the
//! [`OpenRouterClient`]) and enforces three things on every call: the
//! daily budget, a minimum spacing between requests, and bounded retry of
//! transient transport failures.

pub mod budget;
pub mod error;
pub mod guarded;
pub mod openrouter;
pub mod traits;
pub mod util;

pub use budget::{BudgetLedger, BudgetState, Pricing, UsageStats};
pub use error::LlmError;
pub use guarded::{Completion, GuardConfig, GuardedClient};
pub use openrouter::OpenRouterClient;
pub use traits::{ChatBackend, ChatParams, ChatReply, Message, MessageRole};
