use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::{Platform, PriorityTier};

/// TOML-backed configuration loaded once at startup and shared read-only.
/// Secrets (API keys, DB URL) stay as env vars.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileConfig {
    pub targets: TargetsConfig,
    pub platforms: PlatformsConfig,
    pub filters: FiltersConfig,
    pub priority: PriorityConfig,
    pub scoring: ScoringConfig,
    pub llm: LlmConfig,
    pub voice: VoiceConfig,
    pub brand: BrandConfig,
    pub deduplication: DeduplicationConfig,
    pub schedule: ScheduleConfig,
    pub behavior: BehaviorConfig,
    pub notify: NotifyConfig,
    pub retention: RetentionConfig,
}

// --- Targets ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TargetsConfig {
    pub hashtags: Vec<String>,
    pub keywords: Vec<String>,
    pub lists: Vec<String>,
    pub subreddits: Vec<String>,
    pub max_results_per_query: usize,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            hashtags: Vec::new(),
            keywords: Vec::new(),
            lists: Vec::new(),
            subreddits: Vec::new(),
            max_results_per_query: 20,
        }
    }
}

impl TargetsConfig {
    /// Search queries for one platform, in scrape order.
    pub fn queries_for(&self, platform: Platform) -> Vec<String> {
        match platform {
            Platform::Twitter => self
                .hashtags
                .iter()
                .chain(self.keywords.iter())
                .chain(self.lists.iter())
                .cloned()
                .collect(),
            Platform::Reddit => self.subreddits.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PlatformsConfig {
    pub twitter: bool,
    pub reddit: bool,
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            twitter: true,
            reddit: true,
        }
    }
}

impl PlatformsConfig {
    pub fn is_enabled(&self, platform: Platform) -> bool {
        match platform {
            Platform::Twitter => self.twitter,
            Platform::Reddit => self.reddit,
        }
    }
}

// --- Filters ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FiltersConfig {
    pub engagement: EngagementConfig,
    pub recency: RecencyConfig,
    pub language: LanguageConfig,
    pub content: ContentConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngagementConfig {
    pub min_followers: u64,
    pub max_followers: u64,
    pub min_likes: u64,
    pub min_replies: u64,
    pub max_replies: u64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            min_followers: 200,
            max_followers: 50_000,
            min_likes: 5,
            min_replies: 0,
            max_replies: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RecencyConfig {
    pub min_age_hours: f64,
    pub max_age_hours: f64,
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            min_age_hours: 0.5,
            max_age_hours: 24.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LanguageConfig {
    pub required: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            required: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ContentConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub long_form_max_length: usize,
    pub banned_keywords: Vec<String>,
    pub banned_patterns: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_length: 30,
            max_length: 280,
            long_form_max_length: 10_000,
            banned_keywords: vec![
                "giveaway".to_string(),
                "airdrop".to_string(),
                "crypto".to_string(),
                "nft".to_string(),
            ],
            banned_patterns: vec![r"follow\s+for\s+follow".to_string(), r"\bf4f\b".to_string()],
        }
    }
}

impl ContentConfig {
    pub fn max_length_for(&self, platform: Platform) -> usize {
        if platform.is_long_form() {
            self.long_form_max_length
        } else {
            self.max_length
        }
    }
}

// --- Priority ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PriorityConfig {
    pub critical: Vec<String>,
    pub high: Vec<String>,
    pub medium_high: Vec<String>,
    pub medium: Vec<String>,
    pub entrepreneur_keywords: Vec<String>,
    pub target_stage: Vec<String>,
    /// Posts in a less important tier than this are dropped.
    pub min_tier: PriorityTier,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            critical: list(&["imposter syndrome", "self-doubt", "feel like a fraud"]),
            high: list(&["brand clarity", "positioning", "confidence"]),
            medium_high: list(&["first customers", "pricing", "niche"]),
            medium: list(&["startup", "small business", "side project"]),
            entrepreneur_keywords: list(&["founder", "entrepreneur", "solopreneur", "ceo"]),
            target_stage: list(&["just started", "first year", "pre-revenue", "launching"]),
            min_tier: PriorityTier::Medium,
        }
    }
}

impl PriorityConfig {
    /// Keyword lists for the tiers that have keywords, in check order.
    pub fn tiers(&self) -> [(PriorityTier, &[String]); 4] {
        [
            (PriorityTier::Critical, self.critical.as_slice()),
            (PriorityTier::High, self.high.as_slice()),
            (PriorityTier::MediumHigh, self.medium_high.as_slice()),
            (PriorityTier::Medium, self.medium.as_slice()),
        ]
    }
}

// --- Scoring ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub minimum_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            minimum_score: 50.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScoringWeights {
    pub velocity: f64,
    pub authority: f64,
    pub timing: f64,
    pub discussion: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            velocity: 0.4,
            authority: 0.3,
            timing: 0.2,
            discussion: 0.1,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.velocity + self.authority + self.timing + self.discussion
    }
}

// --- LLM ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub daily_budget_usd: f64,
    pub requests_per_minute: u32,
    /// Transport attempts per completion, first try included.
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub input_cost_per_million: f64,
    pub output_cost_per_million: f64,
    /// Draft attempts per post before giving up on compliance.
    pub generation_attempts: u32,
    pub learning: LearningConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-3.5-sonnet".to_string(),
            temperature: 0.7,
            max_tokens: 200,
            top_p: 0.9,
            daily_budget_usd: 5.0,
            requests_per_minute: 20,
            max_attempts: 3,
            timeout_secs: 60,
            input_cost_per_million: 3.0,
            output_cost_per_million: 15.0,
            generation_attempts: 3,
            learning: LearningConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LearningConfig {
    pub enabled: bool,
    pub corpus_size: usize,
    pub min_engagement_rate: f64,
    pub rotation: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            corpus_size: 5,
            min_engagement_rate: 0.02,
            rotation: true,
        }
    }
}

// --- Voice ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VoiceConfig {
    pub tone: String,
    pub language: String,
    pub preferred_max: usize,
    pub absolute_max: usize,
    pub long_form_preferred_max: usize,
    pub long_form_max: usize,
    pub required_patterns: Vec<String>,
    pub strict_avoidance: Vec<String>,
    pub forbidden_punctuation: Vec<String>,
    pub spelling_rules: Vec<SpellingRule>,
    /// Words that match a spelling rule but are spelled the same everywhere.
    pub spelling_exemptions: Vec<String>,
    pub jargon_terms: Vec<String>,
    pub promotional_patterns: Vec<String>,
    pub max_emoji: usize,
    pub max_hashtags: usize,
    pub max_spaced_hyphens: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpellingRule {
    pub pattern: String,
    pub suggestion: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        fn rule(pattern: &str, suggestion: &str) -> SpellingRule {
            SpellingRule {
                pattern: pattern.to_string(),
                suggestion: suggestion.to_string(),
            }
        }
        Self {
            tone: "Warm, gentle and reflective. Curious rather than prescriptive.".to_string(),
            language: "British English".to_string(),
            preferred_max: 100,
            absolute_max: 280,
            long_form_preferred_max: 1000,
            long_form_max: 5000,
            required_patterns: list(&[
                "Gentle qualifiers (quite, rather, perhaps, might)",
                "One clear point or question",
            ]),
            strict_avoidance: list(&[
                "Exclamation marks",
                "American spellings",
                "Corporate jargon",
                "Sales or promotional language",
            ]),
            forbidden_punctuation: list(&["!"]),
            spelling_rules: vec![
                rule(r"\b\w+ization\b", "isation"),
                rule(r"\b\w+ize\b", "ise"),
                rule(r"\bcolor\b", "colour"),
                rule(r"\bfavor\b", "favour"),
                rule(r"\bhonor\b", "honour"),
                rule(r"\blabor\b", "labour"),
                rule(r"\bcenter\b", "centre"),
                rule(r"\bfiber\b", "fibre"),
                rule(r"\bmeter\b", "metre"),
                rule(r"\btheater\b", "theatre"),
                rule(r"\bdefense\b", "defence"),
                rule(r"\boffense\b", "offence"),
                rule(r"\blicense\b", "licence"),
                rule(r"\bpractice\b", "practise"),
                rule(r"\b(?:while|among)\b", "whilst/amongst"),
            ],
            spelling_exemptions: list(&["size", "prize", "seize", "capsize", "downsize", "resize"]),
            jargon_terms: list(&[
                "synergy",
                "synergies",
                "leverage",
                "leveraging",
                "disrupt",
                "disruptive",
                "disruption",
                "game-changer",
                "game changer",
                "crushing it",
                "crush it",
                "ninja",
                "guru",
                "rockstar",
                "hustle",
                "hustling",
                "grind",
                "grinding",
                "move the needle",
                "circle back",
                "low-hanging fruit",
                "think outside the box",
                "paradigm shift",
                "best in class",
                "cutting edge",
                "bleeding edge",
                "growth hack",
                "growth hacking",
            ]),
            promotional_patterns: list(&[
                r"\bbuy now\b",
                r"\blimited time\b",
                r"\bDM me\b",
                r"\bcheck out my\b",
                r"\blink in bio\b",
                r"\bdiscount code\b",
                r"\bspecial offer\b",
                r"\bfree trial\b",
                r"\bsign up now\b",
            ]),
            max_emoji: 1,
            max_hashtags: 0,
            max_spaced_hyphens: 1,
        }
    }
}

impl VoiceConfig {
    /// (preferred, absolute) character limits for a platform.
    pub fn limits_for(&self, platform: Option<Platform>) -> (usize, usize) {
        match platform {
            Some(p) if p.is_long_form() => (self.long_form_preferred_max, self.long_form_max),
            _ => (self.preferred_max, self.absolute_max),
        }
    }
}

// --- Brand ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BrandConfig {
    pub name: String,
    pub context: String,
    pub guidelines: Vec<String>,
    pub example_replies: Vec<String>,
    pub reminders: Vec<String>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            name: "Belief Forge".to_string(),
            context: "Belief Forge helps entrepreneurs overcome belief-based barriers \
                      (imposter syndrome, self-doubt, brand clarity struggles) to build \
                      authentic, purpose-driven businesses."
                .to_string(),
            guidelines: list(&[
                "Be genuinely helpful, not promotional",
                "Share relatable insights from experience",
                "Ask thoughtful questions to deepen conversation",
                "Use gentle qualifiers (quite, rather, perhaps, might)",
                "Write as if texting a friend you respect",
                "Focus on ONE clear point or question",
            ]),
            example_replies: list(&[
                "I've found that naming the imposter syndrome actually helps. What specific doubt shows up most for you?",
                "For my fellow founders: the clarity comes through doing, not just thinking. Which first step feels right?",
            ]),
            reminders: list(&[
                "NO exclamation marks",
                "British English only",
                "Warm and authentic, never corporate",
            ]),
        }
    }
}

// --- Deduplication ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DeduplicationConfig {
    pub history_days: i64,
    pub author_cooldown_hours: i64,
    pub max_per_hour: u64,
    pub max_per_day: u64,
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            history_days: 30,
            author_cooldown_hours: 24,
            max_per_hour: 5,
            max_per_day: 30,
        }
    }
}

// --- Schedule / behaviour ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScheduleConfig {
    pub timezone: String,
    pub active_start: String,
    pub active_end: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/London".to_string(),
            active_start: "07:00".to_string(),
            active_end: "23:00".to_string(),
        }
    }
}

/// Millisecond bounds of a randomized pause.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BehaviorConfig {
    pub scrape_delay: DelayRange,
    pub draft_delay: DelayRange,
    pub notify_delay: DelayRange,
    pub break_after_replies: u32,
    pub break_min_minutes: u64,
    pub break_max_minutes: u64,
    pub max_replies_per_session: usize,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            scrape_delay: DelayRange::new(3_000, 5_000),
            draft_delay: DelayRange::new(2_000, 4_000),
            notify_delay: DelayRange::new(1_000, 2_000),
            break_after_replies: 3,
            break_min_minutes: 5,
            break_max_minutes: 10,
            max_replies_per_session: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NotifyConfig {
    pub max_messages: usize,
    pub window_seconds: u64,
    pub excerpt_chars: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_messages: 20,
            window_seconds: 60,
            excerpt_chars: 150,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RetentionConfig {
    pub audit_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { audit_days: 14 }
    }
}

// --- Validation ---

pub fn parse_time_of_day(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::TimeOfDay {
        field,
        value: value.to_string(),
    })
}

pub fn parse_timezone(value: &str) -> Result<chrono_tz::Tz, ConfigError> {
    chrono_tz::Tz::from_str(value.trim()).map_err(|_| ConfigError::Timezone(value.to_string()))
}

fn check_regexes<'a>(
    field: &'static str,
    patterns: impl IntoIterator<Item = &'a String>,
) -> Result<(), ConfigError> {
    for pattern in patterns {
        regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::Regex {
                field,
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
    }
    Ok(())
}

fn check_range(field: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::Range { field, min, max });
    }
    Ok(())
}

fn check_span(field: &'static str, value: i64, max: i64) -> Result<(), ConfigError> {
    if !(1..=max).contains(&value) {
        return Err(ConfigError::Invalid {
            field,
            message: format!("{value} is outside 1..={max}"),
        });
    }
    Ok(())
}

impl FileConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = self.scoring.weights.sum();
        if (weights - 1.0).abs() > 0.001 {
            return Err(ConfigError::Weights(weights));
        }
        if !(0.0..=100.0).contains(&self.scoring.minimum_score) {
            return Err(ConfigError::Invalid {
                field: "scoring.minimum_score",
                message: format!("{} is outside 0..=100", self.scoring.minimum_score),
            });
        }

        parse_timezone(&self.schedule.timezone)?;
        parse_time_of_day("schedule.active_start", &self.schedule.active_start)?;
        parse_time_of_day("schedule.active_end", &self.schedule.active_end)?;

        check_regexes("filters.content.banned_patterns", &self.filters.content.banned_patterns)?;
        check_regexes(
            "voice.spelling_rules",
            self.voice.spelling_rules.iter().map(|r| &r.pattern),
        )?;
        check_regexes("voice.promotional_patterns", &self.voice.promotional_patterns)?;

        let e = &self.filters.engagement;
        check_range("filters.engagement.followers", e.min_followers as f64, e.max_followers as f64)?;
        check_range("filters.engagement.replies", e.min_replies as f64, e.max_replies as f64)?;
        let r = &self.filters.recency;
        check_range("filters.recency.age_hours", r.min_age_hours, r.max_age_hours)?;
        let c = &self.filters.content;
        check_range("filters.content.length", c.min_length as f64, c.max_length as f64)?;
        check_range(
            "voice.length",
            self.voice.preferred_max as f64,
            self.voice.absolute_max as f64,
        )?;
        check_range(
            "voice.long_form_length",
            self.voice.long_form_preferred_max as f64,
            self.voice.long_form_max as f64,
        )?;

        let b = &self.behavior;
        for (field, range) in [
            ("behavior.scrape_delay", b.scrape_delay),
            ("behavior.draft_delay", b.draft_delay),
            ("behavior.notify_delay", b.notify_delay),
        ] {
            check_range(field, range.min_ms as f64, range.max_ms as f64)?;
        }
        check_range(
            "behavior.break_minutes",
            b.break_min_minutes as f64,
            b.break_max_minutes as f64,
        )?;

        // Subtracted from `now`: must stay positive and representable.
        let d = &self.deduplication;
        check_span("deduplication.history_days", d.history_days, 3_650)?;
        check_span("deduplication.author_cooldown_hours", d.author_cooldown_hours, 8_760)?;
        check_span("retention.audit_days", self.retention.audit_days, 3_650)?;

        if self.llm.daily_budget_usd < 0.0 {
            return Err(ConfigError::Invalid {
                field: "llm.daily_budget_usd",
                message: "must not be negative".to_string(),
            });
        }
        if self.llm.generation_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "llm.generation_attempts",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Load, parse and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(content).context("Failed to parse config TOML")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        FileConfig::default().validate().unwrap();
    }

    #[test]
    fn reference_config_parses() {
        let config = parse_config(include_str!("../../../config/replyscout.toml")).unwrap();
        assert_eq!(config.brand.name, "Belief Forge");
        assert_eq!(config.behavior.scrape_delay, DelayRange::new(3_000, 5_000));
        assert_eq!(config.notify.excerpt_chars, 200);
        assert!(!config.voice.spelling_rules.is_empty());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config = parse_config(
            r##"
            [targets]
            hashtags = ["#buildinpublic"]
            subreddits = ["Entrepreneur"]

            [schedule]
            timezone = "America/New_York"

            [deduplication]
            max_per_hour = 2
            "##,
        )
        .unwrap();

        assert_eq!(config.targets.max_results_per_query, 20);
        assert_eq!(config.schedule.active_start, "07:00");
        assert_eq!(config.deduplication.max_per_hour, 2);
        assert_eq!(config.deduplication.max_per_day, 30);
        assert_eq!(config.priority.min_tier, PriorityTier::Medium);
        assert_eq!(
            config.targets.queries_for(Platform::Reddit),
            vec!["Entrepreneur".to_string()]
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config("[scoring]\nweightz = 1\n").unwrap_err();
        assert!(format!("{err:#}").contains("weightz"));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = FileConfig::default();
        config.scoring.weights.velocity = 0.5;
        assert!(matches!(config.validate(), Err(ConfigError::Weights(_))));
    }

    #[test]
    fn bad_timezone_and_time_are_fatal() {
        let mut config = FileConfig::default();
        config.schedule.timezone = "Mars/Olympus".into();
        assert_eq!(
            config.validate(),
            Err(ConfigError::Timezone("Mars/Olympus".into()))
        );

        let mut config = FileConfig::default();
        config.schedule.active_end = "25:99".into();
        assert!(matches!(config.validate(), Err(ConfigError::TimeOfDay { .. })));
    }

    #[test]
    fn bad_regex_is_fatal() {
        let mut config = FileConfig::default();
        config.filters.content.banned_patterns.push("(unclosed".into());
        assert!(matches!(config.validate(), Err(ConfigError::Regex { .. })));
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let mut config = FileConfig::default();
        config.filters.recency.min_age_hours = 48.0;
        config.filters.recency.max_age_hours = 24.0;
        assert!(matches!(config.validate(), Err(ConfigError::Range { .. })));
    }

    #[test]
    fn history_windows_must_be_positive_and_bounded() {
        let mut config = FileConfig::default();
        config.deduplication.history_days = -1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "deduplication.history_days", .. })
        ));

        let mut config = FileConfig::default();
        config.deduplication.author_cooldown_hours = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "deduplication.author_cooldown_hours", .. })
        ));

        let mut config = FileConfig::default();
        config.retention.audit_days = i64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "retention.audit_days", .. })
        ));

        let err = parse_config("[deduplication]\nhistory_days = -1\n").unwrap_err();
        assert!(format!("{err:#}").contains("history_days"));
    }

    #[test]
    fn twitter_queries_concatenate_in_order() {
        let targets = TargetsConfig {
            hashtags: vec!["#a".into()],
            keywords: vec!["k".into()],
            lists: vec!["l".into()],
            ..TargetsConfig::default()
        };
        assert_eq!(targets.queries_for(Platform::Twitter), vec!["#a", "k", "l"]);
    }
}
