pub mod eligibility;
pub mod priority;

pub use eligibility::EligibilityFilter;
pub use priority::PriorityFilter;

use replyscout_common::Post;

/// A post dropped by a pipeline stage, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub post: Post,
    pub reason: String,
}

/// Outcome of running a batch through a stage.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub passed: Vec<Post>,
    pub rejected: Vec<Rejected>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.passed.len() + self.rejected.len()
    }
}

/// Compile a list of case-insensitive patterns. Each compiled regex keeps
/// its source text for reason strings.
pub(crate) fn compile_patterns(
    field: &'static str,
    patterns: &[String],
) -> Result<Vec<(String, regex::Regex)>, replyscout_common::ConfigError> {
    patterns
        .iter()
        .map(|p| {
            regex::RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map(|re| (p.clone(), re))
                .map_err(|e| replyscout_common::ConfigError::Regex {
                    field,
                    pattern: p.clone(),
                    message: e.to_string(),
                })
        })
        .collect()
}
