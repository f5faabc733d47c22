use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplyScoutError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Invalid startup configuration. Always fatal: reported before any run.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Unknown timezone: {0}")]
    Timezone(String),

    #[error("Invalid time of day '{value}' for {field} (expected HH:MM)")]
    TimeOfDay { field: &'static str, value: String },

    #[error("Invalid regex for {field}: '{pattern}': {message}")]
    Regex {
        field: &'static str,
        pattern: String,
        message: String,
    },

    #[error("Scoring weights must sum to 1.0 (got {0:.3})")]
    Weights(f64),

    #[error("Invalid range for {field}: {min} > {max}")]
    Range {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("Invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}
