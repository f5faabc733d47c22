// Test doubles for the pipeline.
//
// One per trait boundary:
// - ScriptedBackend (ChatBackend): replays queued replies or errors in order
// - StaticSource (PostSource): fixed posts for every query, or a fixed failure
// - RecordingNotifier (ApprovalNotifier): records what would have been sent
// - MemoryStore (EngagementLog + RunStore + ExampleCorpus): re-exported
//
// Plus builders for posts, a guarded client and an always-active config.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ai_client::{
    ChatBackend, ChatParams, ChatReply, GuardConfig, GuardedClient, LlmError, Message, Pricing,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use replyscout_common::file_config::{DelayRange, ScheduleConfig};
use replyscout_common::{Author, FileConfig, Metrics, Platform, Post, QueueEntry};

use crate::notify::ApprovalNotifier;
use crate::traits::PostSource;

pub use crate::store::MemoryStore;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// ScriptedBackend
// ---------------------------------------------------------------------------

/// Prompt tokens reported for every scripted reply.
pub const SCRIPTED_PROMPT_TOKENS: u64 = 1_000;
/// Completion tokens reported for every scripted reply.
pub const SCRIPTED_COMPLETION_TOKENS: u64 = 100;
/// Cost of one scripted reply at the default pricing (3 / 15 USD per million).
pub const SCRIPTED_COST_USD: f64 = 0.0045;

/// Chat backend that replays a script. Once the script runs out every
/// call fails with `EmptyResponse`.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<ChatReply, LlmError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: &str) -> Self {
        lock(&self.script).push_back(Ok(ChatReply {
            text: text.to_string(),
            prompt_tokens: SCRIPTED_PROMPT_TOKENS,
            completion_tokens: SCRIPTED_COMPLETION_TOKENS,
        }));
        self
    }

    pub fn fail(self, error: LlmError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Number of calls that reached the backend.
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        lock(&self.requests).clone()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat(&self, messages: &[Message], _params: &ChatParams) -> Result<ChatReply, LlmError> {
        lock(&self.requests).push(messages.to_vec());
        lock(&self.script)
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

/// Unthrottled client with no retry backoff and the given daily budget.
pub fn guarded_client(backend: Arc<ScriptedBackend>, daily_budget_usd: f64) -> Arc<GuardedClient> {
    let config = GuardConfig {
        daily_budget_usd,
        requests_per_minute: 0,
        backoff_base: Duration::ZERO,
        backoff_max: Duration::ZERO,
        pricing: Pricing::default(),
        ..GuardConfig::default()
    };
    Arc::new(GuardedClient::new(backend, config))
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

/// Serves the same posts for every query, up to the limit.
pub struct StaticSource {
    platform: Platform,
    posts: Vec<Post>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn new(platform: Platform, posts: Vec<Post>) -> Self {
        Self {
            platform,
            posts,
            failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// A source whose every scrape fails with `message`.
    pub fn failing(platform: Platform, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(platform, Vec::new())
        }
    }

    /// Queries received, in call order.
    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl PostSource for StaticSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn scrape(&self, query: &str, limit: usize) -> Result<Vec<Post>> {
        lock(&self.queries).push(query.to_string());
        if let Some(message) = &self.failure {
            bail!("{message}");
        }
        Ok(self.posts.iter().take(limit).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

/// Keeps every approval request and alert. Optionally fails approval sends.
#[derive(Default)]
pub struct RecordingNotifier {
    fail_approvals: bool,
    approvals: Mutex<Vec<QueueEntry>>,
    alerts: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_approvals: true,
            ..Self::default()
        }
    }

    pub fn approvals(&self) -> Vec<QueueEntry> {
        lock(&self.approvals).clone()
    }

    pub fn alerts(&self) -> Vec<(String, Option<String>)> {
        lock(&self.alerts).clone()
    }
}

#[async_trait]
impl ApprovalNotifier for RecordingNotifier {
    async fn send_approval_request(&self, entry: &QueueEntry) -> Result<()> {
        if self.fail_approvals {
            bail!("chat unavailable");
        }
        lock(&self.approvals).push(entry.clone());
        Ok(())
    }

    async fn send_error_alert(&self, message: &str, context: Option<&str>) -> Result<()> {
        lock(&self.alerts).push((message.to_string(), context.map(str::to_string)));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// An eligible-looking Twitter post: 1000 followers, 3 hours old,
/// 20 likes and 5 replies.
pub fn post(id: &str, text: &str) -> Post {
    Post::builder()
        .id(id)
        .platform(Platform::Twitter)
        .text(text)
        .author(
            Author::builder()
                .username("maker")
                .followers_count(1_000)
                .build(),
        )
        .created_at(Utc::now() - ChronoDuration::hours(3))
        .url(format!("https://x.com/maker/status/{id}"))
        .metrics(Metrics {
            likes: 20,
            replies: 5,
            shares: 1,
            impressions: None,
        })
        .build()
}

/// Default config with the window always open, no pacing delays, one
/// Twitter query and Reddit disabled.
pub fn test_config() -> FileConfig {
    let mut config = FileConfig::default();
    config.schedule = ScheduleConfig {
        timezone: "UTC".into(),
        active_start: "00:00".into(),
        active_end: "00:00".into(),
    };
    config.behavior.scrape_delay = DelayRange::new(0, 0);
    config.behavior.draft_delay = DelayRange::new(0, 0);
    config.behavior.notify_delay = DelayRange::new(0, 0);
    config.behavior.break_after_replies = 0;
    config.targets.keywords = vec!["startup".into()];
    config.platforms.reddit = false;
    config.filters.engagement.min_followers = 100;
    config.filters.engagement.min_likes = 5;
    config.filters.engagement.min_replies = 0;
    config.filters.recency.min_age_hours = 0.0;
    config.scoring.minimum_score = 0.0;
    config
}
