//! Runtime configuration parsed from environment variables.
//!
//! Values that fail to parse fall back to their defaults rather than
//! aborting startup. `main` loads `.env` through `dotenvy` before calling
//! `Config::from_env`.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BOARD_SAVE_DIR: &str = "uploaded/boards";
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Postgres URL for board records. `None` keeps records in memory.
    pub database_url: Option<String>,
    /// Pool size for the board record database.
    pub db_max_connections: u32,
    /// Directory holding `<link>.json` board snapshots.
    pub board_save_dir: PathBuf,
    /// Outbound queue depth per websocket client.
    pub client_queue_capacity: usize,
    /// Upper bound on a single websocket write.
    pub send_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            board_save_dir: PathBuf::from(DEFAULT_BOARD_SAVE_DIR),
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
        }
    }
}

impl Config {
    /// Build config from environment variables.
    ///
    /// - `PORT`: default 3000
    /// - `DATABASE_URL`: optional
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `BOARD_SAVE_DIR`: default `uploaded/boards`
    /// - `WS_CLIENT_QUEUE_CAPACITY`: default 256, minimum 1
    /// - `WS_SEND_TIMEOUT_MS`: default 5000
    #[must_use]
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let board_save_dir = std::env::var("BOARD_SAVE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_BOARD_SAVE_DIR));

        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            board_save_dir,
            // mpsc::channel panics on zero capacity.
            client_queue_capacity: env_parse("WS_CLIENT_QUEUE_CAPACITY", DEFAULT_CLIENT_QUEUE_CAPACITY).max(1),
            send_timeout: Duration::from_millis(env_parse("WS_SEND_TIMEOUT_MS", DEFAULT_SEND_TIMEOUT_MS)),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
