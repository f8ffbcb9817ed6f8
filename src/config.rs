use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    pub board_id: String,
    pub posts_api_url: String,
    pub posts_api_key: Option<String>,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub session_ttl: Duration,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("Failed to load {}: not set", key))
        };

        Ok(Config {
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            max_file_size: parse_or(&lookup, "MAX_FILE_SIZE", default_max_file_size())?,
            board_id: required("BOARD_ID")?,
            posts_api_url: required("POSTS_API_URL")?,
            posts_api_key: lookup("POSTS_API_KEY").filter(|v| !v.is_empty()),
            batch_size: parse_or(&lookup, "IMPORT_BATCH_SIZE", 10usize)?.max(1),
            batch_delay: Duration::from_millis(parse_or(&lookup, "IMPORT_BATCH_DELAY_MS", 100u64)?),
            session_ttl: Duration::from_secs(parse_or(&lookup, "SESSION_TTL_SECS", 3600u64)?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} value: {}", key, raw)),
        None => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::new()?;
    tracing::info!(
        "Loaded config: board {}, posts API {}, batches of {} every {:?}",
        config.board_id,
        config.posts_api_url,
        config.batch_size,
        config.batch_delay
    );
    Ok(config)
}
