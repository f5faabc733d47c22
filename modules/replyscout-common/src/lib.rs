pub mod config;
pub mod error;
pub mod file_config;
pub mod rate_limit;
pub mod types;

pub use config::AppConfig;
pub use error::{ConfigError, ReplyScoutError};
pub use file_config::{load_config, FileConfig};
pub use rate_limit::{RateLimiter, SlidingWindowLimiter};
pub use types::*;
