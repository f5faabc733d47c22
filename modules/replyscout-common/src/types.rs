use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

// --- Platform ---

/// Where a post was found. Closed set: every platform-specific rule in the
/// pipeline is a method here rather than a string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Twitter,
    Reddit,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Twitter, Platform::Reddit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Reddit => "reddit",
        }
    }

    /// Reddit exposes no follower counts; engagement and authority rules
    /// that need them are skipped or substituted.
    pub fn omits_follower_counts(&self) -> bool {
        matches!(self, Platform::Reddit)
    }

    /// Long-form platforms get the long length limits and the depth-oriented
    /// prompt guidance.
    pub fn is_long_form(&self) -> bool {
        matches!(self, Platform::Reddit)
    }

    /// Post age range, in hours, in which a reply still gets attention.
    pub fn golden_window_hours(&self) -> (f64, f64) {
        match self {
            Platform::Twitter => (2.0, 6.0),
            Platform::Reddit => (0.5, 12.0),
        }
    }

    /// Secondary window that still earns partial timing credit.
    pub fn silver_window_hours(&self) -> (f64, f64) {
        match self {
            Platform::Twitter => (6.0, 12.0),
            Platform::Reddit => (12.0, 24.0),
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Some(Self::Twitter),
            "reddit" => Some(Self::Reddit),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s).ok_or_else(|| format!("unknown platform: {s}"))
    }
}

// --- Post ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TypedBuilder)]
pub struct Author {
    #[builder(setter(into))]
    pub username: String,
    #[builder(default, setter(into))]
    #[serde(default)]
    pub display_name: String,
    #[builder(default)]
    #[serde(default)]
    pub followers_count: u64,
    #[builder(default)]
    #[serde(default)]
    pub is_verified: bool,
    #[builder(default, setter(into))]
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metrics {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub shares: u64,
    /// Not every platform reports views.
    #[serde(default)]
    pub impressions: Option<u64>,
}

/// A scraped post. Pipeline stages attach their results to the optional
/// side-channel fields as the post moves through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TypedBuilder)]
pub struct Post {
    #[builder(setter(into))]
    pub id: String,
    pub platform: Platform,
    #[builder(setter(into))]
    pub text: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    #[builder(default, setter(into))]
    #[serde(default)]
    pub url: String,
    #[builder(default)]
    #[serde(default)]
    pub metrics: Metrics,
    #[builder(default, setter(into))]
    #[serde(default)]
    pub search_term: String,
    #[builder(default = "en".to_string(), setter(into))]
    #[serde(default = "default_language")]
    pub language: String,
    #[builder(default = Utc::now())]
    #[serde(default = "Utc::now")]
    pub scraped_at: DateTime<Utc>,

    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityResult>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreResult>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<DraftResult>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Post {
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_seconds() as f64 / 3600.0
    }

    /// Length in characters, not bytes.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn priority_tier(&self) -> PriorityTier {
        self.priority
            .as_ref()
            .map(|p| p.tier)
            .unwrap_or(PriorityTier::Baseline)
    }

    pub fn multiplier(&self) -> f64 {
        self.priority.as_ref().map(|p| p.multiplier).unwrap_or(1.0)
    }

    /// Flat JSON view with the field names older consumers (exports, the
    /// dashboard) expect.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("id".into(), self.id.clone().into());
        map.insert("platform".into(), self.platform.as_str().into());
        map.insert("text".into(), self.text.clone().into());
        map.insert("url".into(), self.url.clone().into());
        map.insert("created_at".into(), self.created_at.to_rfc3339().into());
        map.insert("scraped_at".into(), self.scraped_at.to_rfc3339().into());
        map.insert("search_term".into(), self.search_term.clone().into());
        map.insert("language".into(), self.language.clone().into());
        map.insert(
            "author".into(),
            serde_json::to_value(&self.author).unwrap_or_default(),
        );
        map.insert(
            "metrics".into(),
            serde_json::to_value(&self.metrics).unwrap_or_default(),
        );
        if let Some(ref priority) = self.priority {
            map.insert(
                "commercial_signals".into(),
                serde_json::to_value(priority).unwrap_or_default(),
            );
        }
        if let Some(ref score) = self.score {
            map.insert("score".into(), score.total.into());
            map.insert(
                "score_breakdown".into(),
                serde_json::to_value(score).unwrap_or_default(),
            );
        }
        if let Some(ref draft) = self.draft {
            map.insert(
                "generated_reply".into(),
                serde_json::to_value(draft).unwrap_or_default(),
            );
        }
        map
    }
}

// --- Priority ---

/// Commercial priority tier. Declaration order is rank order: `Critical`
/// sorts first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Critical,
    High,
    MediumHigh,
    Medium,
    Baseline,
}

impl PriorityTier {
    pub const ALL: [PriorityTier; 5] = [
        PriorityTier::Critical,
        PriorityTier::High,
        PriorityTier::MediumHigh,
        PriorityTier::Medium,
        PriorityTier::Baseline,
    ];

    pub fn multiplier(&self) -> f64 {
        match self {
            PriorityTier::Critical => 3.0,
            PriorityTier::High => 2.0,
            PriorityTier::MediumHigh => 1.5,
            PriorityTier::Medium => 1.2,
            PriorityTier::Baseline => 1.0,
        }
    }

    /// 0 for critical, 4 for baseline.
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Whether this tier is at least as important as `floor`.
    pub fn meets(&self, floor: PriorityTier) -> bool {
        *self <= floor
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Critical => "critical",
            PriorityTier::High => "high",
            PriorityTier::MediumHigh => "medium_high",
            PriorityTier::Medium => "medium",
            PriorityTier::Baseline => "baseline",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium_high" => Some(Self::MediumHigh),
            "medium" => Some(Self::Medium),
            "baseline" => Some(Self::Baseline),
            _ => None,
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PriorityResult {
    pub tier: PriorityTier,
    pub multiplier: f64,
    pub matched_keywords: Vec<String>,
    pub profile_indicators: Vec<String>,
    pub commercial_score: f64,
}

impl PriorityResult {
    pub fn matched_signals(&self) -> Vec<String> {
        self.matched_keywords
            .iter()
            .chain(self.profile_indicators.iter())
            .cloned()
            .collect()
    }
}

// --- Score ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreResult {
    pub velocity: f64,
    pub authority: f64,
    pub timing: f64,
    pub discussion: f64,
    pub multiplier: f64,
    pub total: f64,
    pub meets_threshold: bool,
}

impl ScoreResult {
    pub fn reasoning(&self) -> String {
        format!(
            "velocity {:.1}, authority {:.1}, timing {:.1}, discussion {:.1} (x{:.1}) = {:.1}",
            self.velocity, self.authority, self.timing, self.discussion, self.multiplier, self.total
        )
    }
}

// --- Draft ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Pending,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DraftResult {
    pub text: String,
    pub compliance_score: u32,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
    pub attempt_number: u32,
    pub cost_usd: f64,
    pub status: DraftStatus,
    pub generated_at: DateTime<Utc>,
}

// --- Audit status ---

/// Furthest stage an item reached in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Scraped,
    Filtered,
    Analyzed,
    Scored,
    Deduplicated,
    ReplyGenerated,
    Queued,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Scraped => "scraped",
            ItemStatus::Filtered => "filtered",
            ItemStatus::Analyzed => "analyzed",
            ItemStatus::Scored => "scored",
            ItemStatus::Deduplicated => "deduplicated",
            ItemStatus::ReplyGenerated => "reply_generated",
            ItemStatus::Queued => "queued",
            ItemStatus::Error => "error",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Persistence records ---

/// One reply the system acted on. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub item_id: String,
    pub author: String,
    pub acted_at: DateTime<Utc>,
    pub reply_text: String,
    pub priority_tier: PriorityTier,
    pub score: f64,
}

/// Draft waiting for human approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub item_id: String,
    pub platform: Platform,
    pub author: String,
    pub post_text: String,
    pub post_url: String,
    pub metrics: Metrics,
    pub reply_text: String,
    pub score: f64,
    pub priority_tier: PriorityTier,
    pub priority: Option<PriorityResult>,
    pub compliance_score: u32,
    pub violations: Vec<String>,
    pub attempt_number: u32,
    pub cost_usd: f64,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Build the approval record for a drafted post.
    pub fn from_drafted(post: &Post, draft: &DraftResult, run_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id: post.id.clone(),
            platform: post.platform,
            author: post.author.username.clone(),
            post_text: post.text.clone(),
            post_url: post.url.clone(),
            metrics: post.metrics.clone(),
            reply_text: draft.text.clone(),
            score: post.score.as_ref().map(|s| s.total).unwrap_or(0.0),
            priority_tier: post.priority_tier(),
            priority: post.priority.clone(),
            compliance_score: draft.compliance_score,
            violations: draft.violations.clone(),
            attempt_number: draft.attempt_number,
            cost_usd: draft.cost_usd,
            run_id,
            created_at: Utc::now(),
        }
    }
}

/// A past reply that performed well, used as a prompt example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyExample {
    pub original_text: String,
    pub reply_text: String,
    pub engagement_rate: f64,
    pub posted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Post {
        Post::builder()
            .id("t1")
            .platform(Platform::Twitter)
            .text("Anyone else fighting imposter syndrome?")
            .author(Author::builder().username("founder").followers_count(1200).build())
            .created_at(Utc::now() - Duration::hours(3))
            .build()
    }

    #[test]
    fn platform_capabilities() {
        assert!(Platform::Reddit.omits_follower_counts());
        assert!(!Platform::Twitter.omits_follower_counts());
        assert!(Platform::Reddit.is_long_form());
        assert_eq!(Platform::Twitter.golden_window_hours(), (2.0, 6.0));
        assert_eq!("X".parse::<Platform>().unwrap(), Platform::Twitter);
        assert!("mastodon".parse::<Platform>().is_err());
    }

    #[test]
    fn tiers_order_by_importance() {
        assert!(PriorityTier::Critical < PriorityTier::High);
        assert!(PriorityTier::High.meets(PriorityTier::Medium));
        assert!(!PriorityTier::Baseline.meets(PriorityTier::Medium));
        assert_eq!(PriorityTier::Baseline.rank(), 4);
        let multipliers: Vec<f64> = PriorityTier::ALL.iter().map(|t| t.multiplier()).collect();
        assert_eq!(multipliers, vec![3.0, 2.0, 1.5, 1.2, 1.0]);
        assert_eq!(PriorityTier::from_str_loose("medium-high"), Some(PriorityTier::MediumHigh));
    }

    #[test]
    fn post_defaults_and_map_view() {
        let post = sample();
        assert_eq!(post.language, "en");
        assert_eq!(post.priority_tier(), PriorityTier::Baseline);
        assert_eq!(post.multiplier(), 1.0);

        let map = post.to_map();
        assert_eq!(map["id"], "t1");
        assert_eq!(map["platform"], "twitter");
        assert_eq!(map["author"]["followers_count"], 1200);
        assert!(!map.contains_key("score"));
    }

    #[test]
    fn post_deserializes_with_missing_optionals() {
        let json = r#"{
            "id": "abc",
            "platform": "reddit",
            "text": "How do I price my first product?",
            "author": {"username": "maker"},
            "created_at": "2026-10-18T09:00:00Z"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.platform, Platform::Reddit);
        assert_eq!(post.metrics.likes, 0);
        assert_eq!(post.metrics.impressions, None);
        assert_eq!(post.language, "en");
        assert!(post.priority.is_none());
    }

    #[test]
    fn char_count_counts_characters() {
        let mut post = sample();
        post.text = "café".into();
        assert_eq!(post.char_count(), 4);
    }
}
