use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;

use replyscout_common::file_config::VoiceConfig;
use replyscout_common::{ConfigError, Platform};

use crate::filtering::compile_patterns;

const VIOLATION_PENALTY: u32 = 15;
const WARNING_PENALTY: u32 = 5;

/// Result of checking a draft against the voice rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compliance {
    /// True iff there are no violations. Warnings never invalidate.
    pub is_valid: bool,
    /// `100 - 15*violations - 5*warnings`, floored at zero.
    pub score: u32,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
    pub char_count: usize,
    pub preferred_max: usize,
    pub absolute_max: usize,
}

struct SpellingCheck {
    pattern: Regex,
    suggestion: String,
}

/// Deterministic brand-voice checker. All patterns are compiled once here.
pub struct ComplianceValidator {
    config: VoiceConfig,
    spelling: Vec<SpellingCheck>,
    promotional: Vec<(String, Regex)>,
}

impl ComplianceValidator {
    pub fn new(config: &VoiceConfig) -> Result<Self, ConfigError> {
        let patterns: Vec<String> = config
            .spelling_rules
            .iter()
            .map(|r| r.pattern.clone())
            .collect();
        let spelling = compile_patterns("voice.spelling_rules", &patterns)?
            .into_iter()
            .zip(&config.spelling_rules)
            .map(|((_, pattern), rule)| SpellingCheck {
                pattern,
                suggestion: rule.suggestion.clone(),
            })
            .collect();
        let promotional =
            compile_patterns("voice.promotional_patterns", &config.promotional_patterns)?;

        Ok(Self {
            config: config.clone(),
            spelling,
            promotional,
        })
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn validate(&self, text: &str, platform: Option<Platform>) -> Compliance {
        let c = &self.config;
        let (preferred_max, absolute_max) = c.limits_for(platform);
        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        let char_count = text.chars().count();
        if char_count > absolute_max {
            violations.push(format!(
                "Exceeds absolute max ({char_count} > {absolute_max} chars)"
            ));
        } else if char_count > preferred_max {
            warnings.push(format!(
                "Exceeds preferred max ({char_count} > {preferred_max} chars)"
            ));
        }

        for mark in c.forbidden_punctuation.iter().filter(|m| text.contains(m.as_str())) {
            violations.push(format!("Contains forbidden punctuation '{mark}'"));
        }

        let spaced_hyphens = text.matches(" - ").count();
        if spaced_hyphens > c.max_spaced_hyphens {
            warnings.push(format!("Multiple hyphens used ({spaced_hyphens})"));
        }

        for (word, _) in self.spelling_hits(text) {
            violations.push(format!("American spelling: '{word}'"));
        }

        let lower = text.to_lowercase();
        let mut seen = HashSet::new();
        let jargon = c
            .jargon_terms
            .iter()
            .filter(|term| lower.contains(&term.to_lowercase()))
            .filter(|term| seen.insert(term.to_lowercase()));
        for term in jargon {
            violations.push(format!("Corporate jargon: '{term}'"));
        }

        for (pattern, _) in self.promotional.iter().filter(|(_, re)| re.is_match(text)) {
            violations.push(format!("Salesy language: '{pattern}'"));
        }

        let emoji = count_emoji(text);
        if emoji > c.max_emoji {
            warnings.push(format!("Too many emoji ({emoji})"));
        }

        let hashtags = text.matches('#').count();
        if hashtags > c.max_hashtags {
            warnings.push(format!(
                "Too many hashtags ({hashtags} > {})",
                c.max_hashtags
            ));
        }

        let penalty = VIOLATION_PENALTY * violations.len() as u32
            + WARNING_PENALTY * warnings.len() as u32;

        Compliance {
            is_valid: violations.is_empty(),
            score: 100u32.saturating_sub(penalty),
            violations,
            warnings,
            char_count,
            preferred_max,
            absolute_max,
        }
    }

    /// Distinct lower-cased words hit by a spelling rule, in first-seen
    /// order, each with the suggested form. Exempt words are skipped.
    fn spelling_hits(&self, text: &str) -> Vec<(String, String)> {
        let lower = text.to_lowercase();
        let mut hits: Vec<(String, String)> = Vec::new();

        for check in &self.spelling {
            for m in check.pattern.find_iter(&lower) {
                let word = m.as_str().to_string();
                if self.is_exempt(&word) || hits.iter().any(|(w, _)| *w == word) {
                    continue;
                }
                hits.push((word, check.suggestion.clone()));
            }
        }
        hits
    }

    fn is_exempt(&self, word: &str) -> bool {
        self.config
            .spelling_exemptions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(word))
    }

    /// Concrete edits that would fix the problems in `compliance`.
    pub fn suggest_improvements(&self, text: &str, compliance: &Compliance) -> Vec<String> {
        let mut suggestions = Vec::new();
        let count = compliance.char_count;

        if count > compliance.absolute_max {
            suggestions.push(format!(
                "Reduce by {} characters",
                count - compliance.absolute_max
            ));
        } else if count > compliance.preferred_max {
            suggestions.push(format!(
                "Consider reducing by {} characters",
                count - compliance.preferred_max
            ));
        }

        if self
            .config
            .forbidden_punctuation
            .iter()
            .any(|m| m == "!" && text.contains('!'))
        {
            suggestions.push("Remove exclamation marks".to_string());
        }

        for (word, suggestion) in self.spelling_hits(text) {
            suggestions.push(format!(
                "Replace '{word}' with British spelling: '{suggestion}'"
            ));
        }

        let has = |prefix: &str| compliance.violations.iter().any(|v| v.starts_with(prefix));
        if has("Corporate jargon") {
            suggestions
                .push("Remove corporate jargon - use authentic, conversational language".to_string());
        }
        if has("Salesy language") {
            suggestions.push("Remove promotional language - be helpful, not salesy".to_string());
        }

        suggestions
    }
}

fn count_emoji(text: &str) -> usize {
    text.chars()
        .filter(|c| {
            matches!(
                *c as u32,
                0x1F600..=0x1F64F | 0x1F300..=0x1F5FF | 0x1F680..=0x1F6FF | 0x1F1E0..=0x1F1FF
            )
        })
        .count()
}
