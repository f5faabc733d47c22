use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::info;

use replyscout_common::file_config::FiltersConfig;
use replyscout_common::{ConfigError, Post};

use super::{compile_patterns, BatchOutcome, Rejected};

/// Posts dated further than this into the future are treated as clock skew.
const FUTURE_SKEW_SECS: i64 = 300;

/// Hard eligibility checks. First failing check wins, in this order:
/// engagement, recency, language, content quality.
pub struct EligibilityFilter {
    config: FiltersConfig,
    banned_patterns: Vec<(String, Regex)>,
}

impl EligibilityFilter {
    pub fn new(config: &FiltersConfig) -> Result<Self, ConfigError> {
        let banned_patterns =
            compile_patterns("filters.content.banned_patterns", &config.content.banned_patterns)?;
        Ok(Self {
            config: config.clone(),
            banned_patterns,
        })
    }

    pub fn evaluate(&self, post: &Post) -> (bool, Option<String>) {
        self.evaluate_at(post, Utc::now())
    }

    pub fn evaluate_at(&self, post: &Post, now: DateTime<Utc>) -> (bool, Option<String>) {
        let result = self
            .check_engagement(post)
            .and_then(|_| self.check_recency(post, now))
            .and_then(|_| self.check_language(post))
            .and_then(|_| self.check_content(post));

        match result {
            Ok(()) => (true, None),
            Err(reason) => (false, Some(reason)),
        }
    }

    fn check_engagement(&self, post: &Post) -> Result<(), String> {
        let e = &self.config.engagement;

        if !post.platform.omits_follower_counts() {
            let followers = post.author.followers_count;
            if followers < e.min_followers {
                return Err(format!("Too few followers: {followers} < {}", e.min_followers));
            }
            if followers > e.max_followers {
                return Err(format!("Too many followers: {followers} > {}", e.max_followers));
            }
        }

        let likes = post.metrics.likes;
        if likes < e.min_likes {
            return Err(format!("Too few likes: {likes} < {}", e.min_likes));
        }

        let replies = post.metrics.replies;
        if replies < e.min_replies {
            return Err(format!("Too few replies: {replies} < {}", e.min_replies));
        }
        if replies > e.max_replies {
            return Err(format!("Too many replies: {replies} > {}", e.max_replies));
        }

        Ok(())
    }

    fn check_recency(&self, post: &Post, now: DateTime<Utc>) -> Result<(), String> {
        let r = &self.config.recency;
        let age_secs = (now - post.created_at).num_seconds();
        if age_secs < -FUTURE_SKEW_SECS {
            return Err(format!("Future timestamp: {}", post.created_at.to_rfc3339()));
        }

        let age_hours = (age_secs.max(0) as f64) / 3600.0;
        if age_hours < r.min_age_hours {
            return Err(format!("Too recent: {age_hours:.1}h < {}h", r.min_age_hours));
        }
        if age_hours > r.max_age_hours {
            return Err(format!("Too old: {age_hours:.1}h > {}h", r.max_age_hours));
        }
        Ok(())
    }

    fn check_language(&self, post: &Post) -> Result<(), String> {
        let required = &self.config.language.required;
        if &post.language != required {
            return Err(format!("Wrong language: {} != {required}", post.language));
        }
        Ok(())
    }

    fn check_content(&self, post: &Post) -> Result<(), String> {
        let c = &self.config.content;
        let len = post.char_count();
        let max_len = c.max_length_for(post.platform);

        if len < c.min_length {
            return Err(format!("Too short: {len} < {}", c.min_length));
        }
        if len > max_len {
            return Err(format!("Too long: {len} > {max_len}"));
        }

        let lower = post.text.to_lowercase();
        if let Some(keyword) = c
            .banned_keywords
            .iter()
            .find(|k| lower.contains(&k.to_lowercase()))
        {
            return Err(format!("Banned keyword: '{keyword}'"));
        }

        if let Some((pattern, _)) = self
            .banned_patterns
            .iter()
            .find(|(_, re)| re.is_match(&post.text))
        {
            return Err(format!("Banned pattern: '{pattern}'"));
        }

        Ok(())
    }

    /// Partition a batch into eligible and rejected posts, preserving order.
    pub fn filter_batch(&self, posts: Vec<Post>) -> BatchOutcome {
        self.filter_batch_at(posts, Utc::now())
    }

    pub fn filter_batch_at(&self, posts: Vec<Post>, now: DateTime<Utc>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for post in posts {
            match self.evaluate_at(&post, now) {
                (true, _) => outcome.passed.push(post),
                (false, reason) => outcome.rejected.push(Rejected {
                    post,
                    reason: reason.unwrap_or_default(),
                }),
            }
        }

        info!(
            passed = outcome.passed.len(),
            total = outcome.total(),
            "Eligibility filter complete"
        );
        outcome
    }

    /// Count of rejections per reason.
    pub fn rejection_stats(&self, posts: &[Post], now: DateTime<Utc>) -> BTreeMap<String, usize> {
        let mut stats = BTreeMap::new();
        for post in posts {
            if let (false, Some(reason)) = self.evaluate_at(post, now) {
                *stats.entry(reason).or_insert(0) += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use replyscout_common::{Author, Metrics, Platform};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn config() -> FiltersConfig {
        let mut c = FiltersConfig::default();
        c.engagement.min_followers = 100;
        c.engagement.max_followers = 10_000;
        c.engagement.min_likes = 10;
        c.engagement.min_replies = 0;
        c.engagement.max_replies = 50;
        c.recency.min_age_hours = 1.0;
        c.recency.max_age_hours = 72.0;
        c.content.min_length = 20;
        c.content.max_length = 280;
        c.content.long_form_max_length = 2_000;
        c.content.banned_keywords = vec!["Giveaway".into()];
        c.content.banned_patterns = vec![r"follow\s+back".into()];
        c
    }

    fn post() -> Post {
        Post::builder()
            .id("1")
            .platform(Platform::Twitter)
            .text("Building in public is hard. Anyone else fighting self-doubt?")
            .author(Author::builder().username("maker").followers_count(1_000).build())
            .created_at(now() - Duration::hours(6))
            .metrics(Metrics {
                likes: 15,
                replies: 5,
                shares: 2,
                impressions: None,
            })
            .build()
    }

    fn reason(post: &Post) -> Option<String> {
        let filter = EligibilityFilter::new(&config()).unwrap();
        filter.evaluate_at(post, now()).1
    }

    #[test]
    fn eligible_post_passes() {
        assert_eq!(reason(&post()), None);
    }

    #[test]
    fn too_few_likes_names_the_check() {
        let mut p = post();
        p.metrics.likes = 1;
        assert_eq!(reason(&p).as_deref(), Some("Too few likes: 1 < 10"));
    }

    #[test]
    fn follower_bounds_apply_to_short_form() {
        let mut p = post();
        p.author.followers_count = 50;
        assert_eq!(reason(&p).as_deref(), Some("Too few followers: 50 < 100"));
        p.author.followers_count = 20_000;
        assert_eq!(reason(&p).as_deref(), Some("Too many followers: 20000 > 10000"));
    }

    #[test]
    fn reddit_skips_follower_check() {
        let mut p = post();
        p.platform = Platform::Reddit;
        p.author.followers_count = 0;
        assert_eq!(reason(&p), None);
    }

    #[test]
    fn engagement_is_checked_before_recency() {
        let mut p = post();
        p.metrics.likes = 0;
        p.created_at = now() - Duration::hours(500);
        assert!(reason(&p).unwrap().starts_with("Too few likes"));
    }

    #[test]
    fn recency_window() {
        let mut p = post();
        p.created_at = now() - Duration::minutes(30);
        assert_eq!(reason(&p).as_deref(), Some("Too recent: 0.5h < 1h"));

        p.created_at = now() - Duration::hours(80);
        assert_eq!(reason(&p).as_deref(), Some("Too old: 80.0h > 72h"));

        p.created_at = now() + Duration::minutes(10);
        assert!(reason(&p).unwrap().starts_with("Future timestamp"));
    }

    #[test]
    fn small_future_skew_counts_as_brand_new() {
        let mut c = config();
        c.recency.min_age_hours = 0.0;
        let filter = EligibilityFilter::new(&c).unwrap();
        let mut p = post();
        p.created_at = now() + Duration::minutes(2);
        assert_eq!(filter.evaluate_at(&p, now()), (true, None));
    }

    #[test]
    fn language_must_match() {
        let mut p = post();
        p.language = "de".into();
        assert_eq!(reason(&p).as_deref(), Some("Wrong language: de != en"));
    }

    #[test]
    fn length_limits_depend_on_platform() {
        let mut p = post();
        p.text = "x".repeat(300);
        assert_eq!(reason(&p).as_deref(), Some("Too long: 300 > 280"));

        p.platform = Platform::Reddit;
        assert_eq!(reason(&p), None);

        p.text = "short".into();
        assert_eq!(reason(&p).as_deref(), Some("Too short: 5 < 20"));
    }

    #[test]
    fn banned_keywords_and_patterns_are_case_insensitive() {
        let mut p = post();
        p.text = "Huge GIVEAWAY for founders this week, reply to enter".into();
        assert_eq!(reason(&p).as_deref(), Some("Banned keyword: 'Giveaway'"));

        p.text = "Founders: FOLLOW   BACK and let's grow together".into();
        assert_eq!(reason(&p).as_deref(), Some(r"Banned pattern: 'follow\s+back'"));
    }

    #[test]
    fn batch_partitions_and_keeps_reasons() {
        let filter = EligibilityFilter::new(&config()).unwrap();
        let mut low = post();
        low.id = "2".into();
        low.metrics.likes = 1;

        let outcome = filter.filter_batch_at(vec![post(), low], now());
        assert_eq!(outcome.passed.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].post.id, "2");
        assert_eq!(outcome.rejected[0].reason, "Too few likes: 1 < 10");

        let stats = filter.rejection_stats(&[outcome.rejected[0].post.clone()], now());
        assert_eq!(stats.get("Too few likes: 1 < 10"), Some(&1));
    }

    #[test]
    fn invalid_banned_pattern_is_config_error() {
        let mut c = config();
        c.content.banned_patterns = vec!["[".into()];
        assert!(matches!(
            EligibilityFilter::new(&c),
            Err(ConfigError::Regex { .. })
        ));
    }
}
