use anyhow::{Context, Result};

/// Secrets and environment-specific values. Everything else lives in the
/// TOML [`crate::FileConfig`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database
    pub database_url: String,

    // LLM
    pub openrouter_api_key: String,
    pub app_site_url: Option<String>,

    // Approval notifications
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY")
                .context("OPENROUTER_API_KEY is required")?,
            app_site_url: std::env::var("APP_SITE_URL").ok(),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: std::env::var("TELEGRAM_CHAT_ID").ok(),
        };

        config.log_keys();
        Ok(config)
    }

    /// Telegram credentials, when both halves are present.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => {
                Some((token.as_str(), chat.as_str()))
            }
            _ => None,
        }
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.chars().take(5).map(char::len_utf8).sum();
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  OPENROUTER_API_KEY: {}", preview(&self.openrouter_api_key));
        tracing::info!("  TELEGRAM_BOT_TOKEN: {}", preview_opt(&self.telegram_bot_token));
        tracing::info!("  TELEGRAM_CHAT_ID: {}", preview_opt(&self.telegram_chat_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telegram_requires_both_values() {
        let mut config = AppConfig {
            database_url: "postgres://localhost/replyscout".into(),
            openrouter_api_key: "sk-or-123".into(),
            app_site_url: None,
            telegram_bot_token: Some("123:abc".into()),
            telegram_chat_id: None,
        };
        assert!(config.telegram().is_none());

        config.telegram_chat_id = Some("-100200".into());
        assert_eq!(config.telegram(), Some(("123:abc", "-100200")));
    }
}
