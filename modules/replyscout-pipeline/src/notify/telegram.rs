use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use replyscout_common::file_config::NotifyConfig;
use replyscout_common::{
    Platform, PriorityTier, QueueEntry, RateLimiter, ReplyScoutError, SlidingWindowLimiter,
};

use super::ApprovalNotifier;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram Bot API notifier. Approval requests carry inline approve and
/// reject buttons whose callback data names the queue entry.
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    api_base: String,
    excerpt_chars: usize,
    limiter: Arc<dyn RateLimiter>,
    http: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str, config: &NotifyConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            excerpt_chars: config.excerpt_chars,
            limiter: Arc::new(SlidingWindowLimiter::new(
                config.max_messages,
                Duration::from_secs(config.window_seconds),
            )),
            http,
        })
    }

    pub fn with_api_base(mut self, url: &str) -> Self {
        self.api_base = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Wait out the limiter once. A second refusal fails the send.
    async fn throttle(&self) -> anyhow::Result<()> {
        let (limited, retry_after) = self.limiter.is_limited(&self.chat_id);
        if !limited {
            return Ok(());
        }
        let wait = retry_after.unwrap_or(Duration::from_secs(1));
        warn!(wait_ms = wait.as_millis() as u64, "Telegram send throttled");
        tokio::time::sleep(wait).await;

        if self.limiter.is_limited(&self.chat_id).0 {
            return Err(ReplyScoutError::Notification("Telegram rate limit exceeded".into()).into());
        }
        Ok(())
    }

    async fn send_message(&self, text: &str, reply_markup: Option<serde_json::Value>) -> anyhow::Result<()> {
        self.throttle().await?;

        let mut payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] = markup;
        }

        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let resp = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ReplyScoutError::Notification(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Telegram returned non-success");
            return Err(
                ReplyScoutError::Notification(format!("Telegram returned {status}")).into(),
            );
        }
        Ok(())
    }
}

fn priority_emoji(tier: PriorityTier) -> &'static str {
    match tier {
        PriorityTier::Critical => "🔴",
        PriorityTier::High => "🟠",
        PriorityTier::MediumHigh => "🟡",
        PriorityTier::Medium => "🟢",
        PriorityTier::Baseline => "⚪",
    }
}

/// Escape the characters legacy Telegram Markdown treats as markup.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn post_link(entry: &QueueEntry) -> Option<String> {
    if !entry.post_url.is_empty() {
        return Some(entry.post_url.clone());
    }
    match entry.platform {
        Platform::Twitter => Some(format!(
            "https://twitter.com/{}/status/{}",
            entry.author, entry.item_id
        )),
        Platform::Reddit => None,
    }
}

/// Approval message body for a queued draft.
pub fn approval_message(entry: &QueueEntry, excerpt_chars: usize) -> String {
    let mut excerpt: String = entry.post_text.chars().take(excerpt_chars).collect();
    if entry.post_text.chars().count() > excerpt_chars {
        excerpt.push_str("...");
    }

    let mut message = format!(
        "{emoji} *New Reply Ready for Approval*\n\n\
         *Original Post ({platform}):*\n\
         @{author}: \"{excerpt}\"\n\n\
         *Proposed Reply:*\n\
         \"{reply}\"\n\n\
         *Metrics:*\n\
         • Score: {score:.1}\n\
         • Priority: {tier}\n\
         • Voice score: {voice}\n\
         • Characters: {chars}\n",
        emoji = priority_emoji(entry.priority_tier),
        platform = entry.platform,
        author = escape_markdown(&entry.author),
        excerpt = escape_markdown(&excerpt),
        reply = escape_markdown(&entry.reply_text),
        score = entry.score,
        tier = escape_markdown(entry.priority_tier.as_str()),
        voice = entry.compliance_score,
        chars = entry.reply_text.chars().count(),
    );

    if let Some(link) = post_link(entry) {
        message.push_str(&format!("\n*Link:*\n{link}\n"));
    }
    message
}

#[async_trait]
impl ApprovalNotifier for TelegramNotifier {
    async fn send_approval_request(&self, entry: &QueueEntry) -> anyhow::Result<()> {
        let keyboard = json!({
            "inline_keyboard": [[
                {"text": "✅ Approve", "callback_data": format!("approve_{}", entry.id)},
                {"text": "❌ Reject", "callback_data": format!("reject_{}", entry.id)},
            ]]
        });

        self.send_message(&approval_message(entry, self.excerpt_chars), Some(keyboard))
            .await?;
        info!(queue_id = %entry.id, "Sent approval request to Telegram");
        Ok(())
    }

    async fn send_error_alert(&self, message: &str, context: Option<&str>) -> anyhow::Result<()> {
        let mut text = format!("🚨 *Error Alert*\n\n{}", escape_markdown(message));
        if let Some(context) = context {
            text.push_str(&format!("\n\n*Context:*\n{}", escape_markdown(context)));
        }
        self.send_message(&text, None).await?;
        warn!(error = message, "Sent error alert to Telegram");
        Ok(())
    }
}
