//! Board record backend selection.
//!
//! SYSTEM CONTEXT
//! ==============
//! Board records (`lesson_boards` rows mapping a session id to its snapshot
//! link) live in Postgres when `DATABASE_URL` is set, and the table's
//! migration runs before the server accepts traffic. Without a URL the
//! records are process-local and lost on restart; snapshot files still land
//! in the save directory either way.

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::Config;
use crate::services::persistence::{BoardRecords, MemoryBoardRecords, PgBoardRecords};

pub static MIGRATOR: Migrator = sqlx::migrate!("src/db/migrations");

/// Open the board record store described by `config`.
///
/// # Errors
///
/// Returns an error if a configured database is unreachable or its
/// migrations fail. An unset `DATABASE_URL` never errors.
pub async fn open_board_records(config: &Config) -> Result<Arc<dyn BoardRecords>, sqlx::Error> {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("db: DATABASE_URL not set, board records kept in memory");
        return Ok(Arc::new(MemoryBoardRecords::new()));
    };

    let pool = init_pool(database_url, config.db_max_connections).await?;
    info!(max_connections = config.db_max_connections, "db: board records in postgres");
    Ok(Arc::new(PgBoardRecords::new(pool)))
}

async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
