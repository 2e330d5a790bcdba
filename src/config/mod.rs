//! Configuration module for the forum backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// A configuration variable held a value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {var}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Public base URL, used to build absolute upload paths
    pub app_url: String,
    /// Directory uploaded files are written to and served from
    pub upload_dir: PathBuf,
    /// Upload size ceiling in KiB
    pub upload_max_kb: u64,
    /// Uploaded images wider than this are scaled down
    pub upload_max_width: u32,
    /// Topics per list page
    pub topics_per_page: u32,
    /// How long the site link list stays cached
    pub link_cache_secs: u64,
    /// Number of fake topics to seed into an empty database
    pub seed_topics: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("FORUM_DB_PATH")
            .unwrap_or_else(|_| "./data/forum.sqlite".to_string())
            .into();

        let bind_addr = parse_var("FORUM_BIND_ADDR", "127.0.0.1:8080")?;

        let log_level = env::var("FORUM_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let app_url = env::var("FORUM_APP_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        let upload_dir = env::var("FORUM_UPLOAD_DIR")
            .unwrap_or_else(|_| "./public/uploads".to_string())
            .into();

        let upload_max_kb = parse_var("FORUM_UPLOAD_MAX_KB", "1024")?;
        let upload_max_width = parse_var("FORUM_UPLOAD_MAX_WIDTH", "1024")?;
        let topics_per_page = parse_var("FORUM_TOPICS_PER_PAGE", "20")?;
        let link_cache_secs = parse_var("FORUM_LINK_CACHE_SECS", "1440")?;

        let seed_topics = match env::var("FORUM_SEED_TOPICS") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError {
                var: "FORUM_SEED_TOPICS",
                value: raw,
            })?),
            Err(_) => None,
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            app_url,
            upload_dir,
            upload_max_kb,
            upload_max_width,
            topics_per_page,
            link_cache_secs,
            seed_topics,
        })
    }
}

fn parse_var<T: FromStr>(var: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|_| ConfigError { var, value: raw })
}
