use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::budget::{BudgetLedger, Pricing, UsageStats};
use crate::error::LlmError;
use crate::traits::{ChatBackend, ChatParams, Message};

#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub daily_budget_usd: f64,
    pub requests_per_minute: u32,
    /// Total attempts per completion, first try included.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub pricing: Pricing,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-3.5-sonnet".to_string(),
            temperature: 0.7,
            max_tokens: 200,
            top_p: 0.9,
            daily_budget_usd: 5.0,
            requests_per_minute: 20,
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(10),
            pricing: Pricing::default(),
        }
    }
}

impl GuardConfig {
    /// Minimum spacing between two calls. Zero when unthrottled.
    pub fn min_interval(&self) -> Duration {
        if self.requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(60.0 / self.requests_per_minute as f64)
        }
    }

    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }
}

/// A finished completion and what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
}

pub struct GuardedClient {
    backend: Arc<dyn ChatBackend>,
    config: GuardConfig,
    ledger: BudgetLedger,
}

impl GuardedClient {
    pub fn new(backend: Arc<dyn ChatBackend>, config: GuardConfig) -> Self {
        let ledger = BudgetLedger::new(config.daily_budget_usd);
        Self {
            backend,
            config,
            ledger,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }

    /// Run one chat completion.
    ///
    /// Fails with [`LlmError::BudgetExceeded`] before any network activity
    /// once the ledger reaches the daily ceiling. Otherwise waits out the
    /// request spacing, retries transient failures with exponential backoff
    /// and books the cost before returning.
    pub async fn complete(
        &self,
        messages: &[Message],
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<Completion, LlmError> {
        self.acquire_slot().await?;

        let params = ChatParams {
            model: self.config.model.clone(),
            temperature: temperature.unwrap_or(self.config.temperature),
            max_tokens: max_tokens.unwrap_or(self.config.max_tokens),
            top_p: self.config.top_p,
        };

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        let reply = loop {
            match self.backend.chat(messages, &params).await {
                Ok(reply) => break reply,
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.config.backoff(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient LLM failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let total_tokens = reply.prompt_tokens + reply.completion_tokens;
        let cost_usd = self
            .config
            .pricing
            .cost(reply.prompt_tokens, reply.completion_tokens);
        self.ledger.spend(total_tokens, cost_usd).await;

        debug!(
            tokens = total_tokens,
            cost_usd = format!("{cost_usd:.6}"),
            attempt,
            "LLM completion booked"
        );

        Ok(Completion {
            text: reply.text,
            prompt_tokens: reply.prompt_tokens,
            completion_tokens: reply.completion_tokens,
            total_tokens,
            cost_usd,
        })
    }

    /// Check the ceiling and claim the next request slot, sleeping out the
    /// remaining spacing while holding the ledger lock.
    async fn acquire_slot(&self) -> Result<(), LlmError> {
        let mut state = self.ledger.lock().await;
        if state.total_cost_usd >= self.config.daily_budget_usd {
            return Err(LlmError::BudgetExceeded {
                spent: state.total_cost_usd,
                budget: self.config.daily_budget_usd,
            });
        }

        let interval = self.config.min_interval();
        if let Some(last) = state.last_call_at {
            let elapsed = last.elapsed();
            if elapsed < interval {
                let wait = interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Spacing LLM request");
                tokio::time::sleep(wait).await;
            }
        }
        state.last_call_at = Some(Instant::now());
        Ok(())
    }

    pub async fn usage(&self) -> UsageStats {
        self.ledger.usage().await
    }

    pub async fn reset_period(&self) {
        self.ledger.reset().await;
        info!(budget_usd = self.config.daily_budget_usd, "New LLM budget period");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openrouter::OpenRouterClient;
    use crate::traits::ChatReply;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Scripted {
        replies: Mutex<VecDeque<Result<ChatReply, LlmError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(replies: Vec<Result<ChatReply, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        async fn chat(&self, _: &[Message], _: &ChatParams) -> Result<ChatReply, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }

    fn reply(text: &str, prompt: u64, completion: u64) -> Result<ChatReply, LlmError> {
        Ok(ChatReply {
            text: text.into(),
            prompt_tokens: prompt,
            completion_tokens: completion,
        })
    }

    fn fast_config() -> GuardConfig {
        GuardConfig {
            requests_per_minute: 0,
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(5),
            ..GuardConfig::default()
        }
    }

    #[tokio::test]
    async fn books_cost_of_successful_call() {
        let backend = Scripted::new(vec![reply("ok", 1_000, 100)]);
        let client = GuardedClient::new(backend.clone(), fast_config());

        let completion = client.complete(&[Message::user("hi")], None, None).await.unwrap();

        assert_eq!(completion.text, "ok");
        assert_eq!(completion.total_tokens, 1_100);
        // 1000/1e6*3 + 100/1e6*15
        assert!((completion.cost_usd - 0.0045).abs() < 1e-12);
        let usage = client.usage().await;
        assert_eq!(usage.total_tokens, 1_100);
        assert!((usage.total_cost_usd - 0.0045).abs() < 1e-12);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let backend = Scripted::new(vec![
            Err(LlmError::Timeout),
            Err(LlmError::Api { status: 502, body: String::new() }),
            reply("third time", 10, 10),
        ]);
        let client = GuardedClient::new(backend.clone(), fast_config());

        let completion = client.complete(&[Message::user("hi")], None, None).await.unwrap();
        assert_eq!(completion.text, "third time");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let backend = Scripted::new(vec![
            Err(LlmError::Timeout),
            Err(LlmError::Timeout),
            Err(LlmError::Timeout),
            reply("never reached", 1, 1),
        ]);
        let client = GuardedClient::new(backend.clone(), fast_config());

        let err = client.complete(&[Message::user("hi")], None, None).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(client.usage().await.total_tokens, 0);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let backend = Scripted::new(vec![
            Err(LlmError::Api { status: 400, body: "bad".into() }),
            reply("unused", 1, 1),
        ]);
        let client = GuardedClient::new(backend.clone(), fast_config());

        let err = client.complete(&[Message::user("hi")], None, None).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 400, .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_fails_without_calling_backend() {
        let backend = Scripted::new(vec![reply("unused", 1, 1)]);
        let client = GuardedClient::new(
            backend.clone(),
            GuardConfig {
                daily_budget_usd: 0.01,
                ..fast_config()
            },
        );
        client.ledger().spend(0, 0.01).await;

        let err = client.complete(&[Message::user("hi")], None, None).await.unwrap_err();
        assert!(err.is_budget());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_budget_makes_no_http_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let backend = OpenRouterClient::new("sk-test").unwrap().with_base_url(&server.uri());
        let client = GuardedClient::new(
            Arc::new(backend),
            GuardConfig {
                daily_budget_usd: 1.0,
                ..fast_config()
            },
        );
        client.ledger().spend(0, 1.5).await;

        let started = Instant::now();
        let err = client.complete(&[Message::user("hi")], None, None).await.unwrap_err();
        assert!(matches!(err, LlmError::BudgetExceeded { .. }));
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn spaces_consecutive_calls() {
        let backend = Scripted::new(vec![reply("a", 1, 1), reply("b", 1, 1)]);
        let client = GuardedClient::new(
            backend,
            GuardConfig {
                requests_per_minute: 600,
                ..fast_config()
            },
        );
        assert_eq!(client.config().min_interval(), Duration::from_millis(100));

        let started = Instant::now();
        client.complete(&[Message::user("a")], None, None).await.unwrap();
        client.complete(&[Message::user("b")], None, None).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(90));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = GuardConfig::default();
        assert_eq!(config.backoff(0), Duration::from_secs(2));
        assert_eq!(config.backoff(1), Duration::from_secs(4));
        assert_eq!(config.backoff(2), Duration::from_secs(8));
        assert_eq!(config.backoff(3), Duration::from_secs(10));
    }
}
