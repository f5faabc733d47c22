use tracing::info;

use replyscout_common::file_config::PriorityConfig;
use replyscout_common::{Post, PriorityResult, PriorityTier};

use super::{BatchOutcome, Rejected};

/// Keyword-tier commercial classification.
///
/// Tiers are checked from critical down to medium and the first tier with
/// any case-insensitive keyword hit wins. Profile indicators are collected
/// independently of the tier and only feed the commercial score.
pub struct PriorityFilter {
    config: PriorityConfig,
}

impl PriorityFilter {
    pub fn new(config: &PriorityConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Classify a post and attach the result to it.
    pub fn analyze(&self, post: &mut Post) -> PriorityResult {
        let result = self.classify(post);
        post.priority = Some(result.clone());
        result
    }

    pub fn classify(&self, post: &Post) -> PriorityResult {
        let text = post.text.to_lowercase();
        let (tier, matched_keywords) = self.match_tier(&text);
        let profile_indicators = self.profile_indicators(post, &text);
        let multiplier = tier.multiplier();

        PriorityResult {
            tier,
            multiplier,
            commercial_score: commercial_score(
                multiplier,
                matched_keywords.len(),
                profile_indicators.len(),
            ),
            matched_keywords,
            profile_indicators,
        }
    }

    fn match_tier(&self, text: &str) -> (PriorityTier, Vec<String>) {
        for (tier, keywords) in self.config.tiers() {
            let matched: Vec<String> = keywords
                .iter()
                .filter(|k| text.contains(&k.to_lowercase()))
                .cloned()
                .collect();
            if !matched.is_empty() {
                return (tier, matched);
            }
        }
        (PriorityTier::Baseline, Vec::new())
    }

    fn profile_indicators(&self, post: &Post, text_lower: &str) -> Vec<String> {
        let author = &post.author;
        let haystack = format!(
            "{} {} {} {}",
            author.display_name, author.username, author.bio, post.text
        )
        .to_lowercase();

        let roles = self
            .config
            .entrepreneur_keywords
            .iter()
            .filter(|k| haystack.contains(&k.to_lowercase()))
            .map(|k| format!("entrepreneur:{k}"));

        let stages = self
            .config
            .target_stage
            .iter()
            .filter(|s| text_lower.contains(&s.to_lowercase()))
            .map(|s| format!("stage:{s}"));

        roles.chain(stages).collect()
    }

    /// Sort by tier (most important first), then commercial score
    /// descending. Stable, so ties keep their input order.
    pub fn rank(&self, mut posts: Vec<Post>) -> Vec<Post> {
        for post in posts.iter_mut().filter(|p| p.priority.is_none()) {
            self.analyze(post);
        }
        posts.sort_by(|a, b| {
            let (ta, sa) = tier_and_score(a);
            let (tb, sb) = tier_and_score(b);
            ta.cmp(&tb).then_with(|| sb.total_cmp(&sa))
        });
        posts
    }

    /// Classify every post and drop those less important than the
    /// configured floor tier.
    pub fn filter_batch(&self, posts: Vec<Post>) -> BatchOutcome {
        let floor = self.config.min_tier;
        let mut outcome = BatchOutcome::default();

        for mut post in posts {
            let result = self.analyze(&mut post);
            if result.tier.meets(floor) {
                outcome.passed.push(post);
            } else {
                outcome.rejected.push(Rejected {
                    post,
                    reason: format!("Priority {} below minimum {floor}", result.tier),
                });
            }
        }

        info!(
            passed = outcome.passed.len(),
            total = outcome.total(),
            min_tier = %floor,
            "Priority filter complete"
        );
        outcome
    }
}

fn tier_and_score(post: &Post) -> (PriorityTier, f64) {
    post.priority
        .as_ref()
        .map(|p| (p.tier, p.commercial_score))
        .unwrap_or((PriorityTier::Baseline, 0.0))
}

/// `multiplier*20 + min(5*keywords, 20) + min(3*indicators, 15)`, capped at 100.
pub fn commercial_score(multiplier: f64, keywords: usize, indicators: usize) -> f64 {
    let base = multiplier * 20.0;
    let keyword_bonus = (keywords as f64 * 5.0).min(20.0);
    let indicator_bonus = (indicators as f64 * 3.0).min(15.0);
    let score = (base + keyword_bonus + indicator_bonus).min(100.0);
    (score * 100.0).round() / 100.0
}
