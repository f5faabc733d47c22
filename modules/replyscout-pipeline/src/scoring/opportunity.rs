use chrono::{DateTime, Utc};
use tracing::info;

use replyscout_common::file_config::{ScoringConfig, ScoringWeights};
use replyscout_common::{ConfigError, Platform, Post, ScoreResult};

use crate::filtering::{BatchOutcome, Rejected};
use crate::scheduling::ActiveWindow;

/// Baseline authority for platforms without follower semantics.
const NO_FOLLOWER_AUTHORITY: f64 = 30.0;

/// Weighted opportunity score in [0, 100]. Pure given `now`.
pub struct OpportunityScorer {
    weights: ScoringWeights,
    minimum_score: f64,
    window: ActiveWindow,
}

impl OpportunityScorer {
    pub fn new(config: &ScoringConfig, window: ActiveWindow) -> Result<Self, ConfigError> {
        let sum = config.weights.sum();
        if (sum - 1.0).abs() > 0.001 {
            return Err(ConfigError::Weights(sum));
        }
        Ok(Self {
            weights: config.weights.clone(),
            minimum_score: config.minimum_score,
            window,
        })
    }

    pub fn minimum_score(&self) -> f64 {
        self.minimum_score
    }

    pub fn score(&self, post: &Post) -> ScoreResult {
        self.score_at(post, Utc::now())
    }

    pub fn score_at(&self, post: &Post, now: DateTime<Utc>) -> ScoreResult {
        let age = post.age_hours(now).max(0.0);

        let velocity = velocity(post, age);
        let authority = authority(post);
        let timing = self.timing(post, age);
        let discussion = discussion(post);

        let weighted = velocity * self.weights.velocity
            + authority * self.weights.authority
            + timing * self.weights.timing
            + discussion * self.weights.discussion;
        let multiplier = post.multiplier();
        // The threshold compares the reported total.
        let total = round2((weighted * multiplier).clamp(0.0, 100.0));

        ScoreResult {
            velocity: round2(velocity),
            authority: round2(authority),
            timing: round2(timing),
            discussion: round2(discussion),
            multiplier,
            total,
            meets_threshold: total >= self.minimum_score,
        }
    }

    fn timing(&self, post: &Post, age: f64) -> f64 {
        let (golden_lo, golden_hi) = post.platform.golden_window_hours();
        let (_, silver_hi) = post.platform.silver_window_hours();

        let mut score: f64 = if age >= golden_lo && age <= golden_hi {
            60.0
        } else if age > golden_hi && age <= silver_hi {
            40.0
        } else {
            20.0
        };

        let local = post.created_at.with_timezone(&self.window.timezone()).time();
        score += if self.window.contains_time(local) { 30.0 } else { 5.0 };
        score.min(100.0)
    }

    /// Score every post and sort descending by total. With
    /// `apply_threshold`, posts under the minimum are rejected.
    pub fn rank_at(&self, posts: Vec<Post>, apply_threshold: bool, now: DateTime<Utc>) -> BatchOutcome {
        let total = posts.len();
        let mut outcome = BatchOutcome::default();

        for mut post in posts {
            let score = self.score_at(&post, now);
            let meets = score.meets_threshold;
            let value = score.total;
            post.score = Some(score);

            if apply_threshold && !meets {
                outcome.rejected.push(Rejected {
                    post,
                    reason: format!("Score {value:.2} below minimum {}", self.minimum_score),
                });
            } else {
                outcome.passed.push(post);
            }
        }

        outcome.passed.sort_by(|a, b| total_of(b).total_cmp(&total_of(a)));

        info!(
            passed = outcome.passed.len(),
            total,
            minimum = self.minimum_score,
            "Scoring complete"
        );
        outcome
    }

    pub fn rank(&self, posts: Vec<Post>, apply_threshold: bool) -> Vec<Post> {
        self.rank_at(posts, apply_threshold, Utc::now()).passed
    }
}

fn total_of(post: &Post) -> f64 {
    post.score.as_ref().map(|s| s.total).unwrap_or(0.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn velocity(post: &Post, age: f64) -> f64 {
    let m = &post.metrics;
    let likes = m.likes as f64;
    let mut score: f64 = 0.0;

    match m.impressions {
        Some(impressions) if impressions > 0 => {
            score += (likes / impressions as f64 * 1000.0).min(40.0);
        }
        _ => {
            if m.likes > 0 {
                score += ((likes + 1.0).log10() * 15.0).min(40.0);
            }
        }
    }

    if m.likes > 0 {
        score += (m.replies as f64 / likes * 100.0).min(30.0);
    }

    score += if (2.0..=6.0).contains(&age) {
        30.0
    } else if age > 6.0 && age <= 12.0 {
        20.0
    } else if age < 2.0 {
        10.0
    } else {
        5.0
    };

    score.min(100.0)
}

fn authority(post: &Post) -> f64 {
    let author = &post.author;
    let mut score = if post.platform.omits_follower_counts() {
        NO_FOLLOWER_AUTHORITY
    } else if author.followers_count > 0 {
        ((author.followers_count as f64 + 1.0).log10() * 10.0).min(60.0)
    } else {
        0.0
    };

    if author.is_verified {
        score += 20.0;
    }
    score.min(100.0)
}

fn discussion(post: &Post) -> f64 {
    let mut score: f64 = 0.0;
    if post.text.contains('?') {
        score += 30.0;
    }

    let len = post.char_count();
    score += match post.platform {
        Platform::Reddit if len > 200 => 25.0,
        Platform::Reddit if len > 50 => 15.0,
        Platform::Twitter if (100..=280).contains(&len) => 25.0,
        _ => 0.0,
    };

    let replies = post.metrics.replies;
    score += if (3..=20).contains(&replies) {
        25.0
    } else if replies < 3 {
        10.0
    } else {
        5.0
    };

    score.min(100.0)
}
