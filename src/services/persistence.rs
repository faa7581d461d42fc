//! Persistence: durable board snapshots keyed by session id.
//!
//! DESIGN
//! ======
//! A saved board is two things: a record `{ id, title, link }` and a JSON
//! file `<link>.json` holding the element array. Records live behind the
//! `BoardRecords` trait (Postgres in production, in-memory when no database
//! is configured); files live under the configured save directory.
//!
//! Save creates the record on first use (`insert_if_absent`, so a racing
//! first save still yields one record) and then writes the file through a
//! temporary name plus rename, so a concurrent load never reads a torn file.
//! Load requires both the record and the file; either missing is a
//! not-found condition, never an empty board.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here retries. Every failure is surfaced to the save/load caller.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::state::Element;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("board record not found for session {0}")]
    RecordNotFound(i64),
    #[error("board state file not found for session {0}")]
    StateNotFound(i64),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("board state encoding error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PersistenceError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound(_) | Self::StateNotFound(_))
    }
}

/// Row of the `lesson_boards` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRecord {
    pub id: i64,
    pub title: String,
    /// Opaque storage name; the snapshot file is `<link>.json`.
    pub link: String,
}

impl BoardRecord {
    /// Fresh record with a timestamped title and a unique link.
    #[must_use]
    pub fn generate(session_id: i64) -> Self {
        Self {
            id: session_id,
            title: format!("Lesson {}", OffsetDateTime::now_utc()),
            link: format!("{session_id}_{}", Uuid::new_v4()),
        }
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBoard {
    pub record: BoardRecord,
    pub element_count: usize,
}

// =============================================================================
// TRAITS
// =============================================================================

/// Durable snapshot storage consumed by the save/load flows.
#[async_trait::async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn save(&self, session_id: i64, elements: &[Element]) -> Result<PersistedBoard, PersistenceError>;

    async fn load(&self, session_id: i64) -> Result<Vec<Element>, PersistenceError>;
}

/// Directory of board records.
#[async_trait::async_trait]
pub trait BoardRecords: Send + Sync {
    async fn find(&self, session_id: i64) -> Result<Option<BoardRecord>, PersistenceError>;

    /// Store `record` unless one already exists for its id. Returns the
    /// record that is stored afterwards.
    async fn insert_if_absent(&self, record: BoardRecord) -> Result<BoardRecord, PersistenceError>;
}

// =============================================================================
// POSTGRES RECORDS
// =============================================================================

pub struct PgBoardRecords {
    pool: PgPool,
}

impl PgBoardRecords {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BoardRecords for PgBoardRecords {
    async fn find(&self, session_id: i64) -> Result<Option<BoardRecord>, PersistenceError> {
        let row = sqlx::query_as::<_, (i64, String, String)>("SELECT id, title, link FROM lesson_boards WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, title, link)| BoardRecord { id, title, link }))
    }

    async fn insert_if_absent(&self, record: BoardRecord) -> Result<BoardRecord, PersistenceError> {
        sqlx::query("INSERT INTO lesson_boards (id, title, link) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING")
            .bind(record.id)
            .bind(&record.title)
            .bind(&record.link)
            .execute(&self.pool)
            .await?;

        // EDGE: a concurrent first save may have won; return whatever is stored.
        self.find(record.id)
            .await?
            .ok_or(PersistenceError::RecordNotFound(record.id))
    }
}

// =============================================================================
// IN-MEMORY RECORDS
// =============================================================================

/// Records kept for the process lifetime only.
#[derive(Default)]
pub struct MemoryBoardRecords {
    records: RwLock<HashMap<i64, BoardRecord>>,
}

impl MemoryBoardRecords {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BoardRecords for MemoryBoardRecords {
    async fn find(&self, session_id: i64) -> Result<Option<BoardRecord>, PersistenceError> {
        Ok(self.records.read().await.get(&session_id).cloned())
    }

    async fn insert_if_absent(&self, record: BoardRecord) -> Result<BoardRecord, PersistenceError> {
        let mut records = self.records.write().await;
        Ok(records.entry(record.id).or_insert(record).clone())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

pub struct FileStore {
    records: Arc<dyn BoardRecords>,
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(records: Arc<dyn BoardRecords>, dir: impl Into<PathBuf>) -> Self {
        Self { records, dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn state_path(&self, record: &BoardRecord) -> PathBuf {
        self.dir.join(format!("{}.json", record.link))
    }
}

#[async_trait::async_trait]
impl PersistenceStore for FileStore {
    async fn save(&self, session_id: i64, elements: &[Element]) -> Result<PersistedBoard, PersistenceError> {
        let record = match self.records.find(session_id).await? {
            Some(record) => record,
            None => {
                let record = self.records.insert_if_absent(BoardRecord::generate(session_id)).await?;
                info!(session_id, link = %record.link, "persistence: board record created");
                record
            }
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec(elements)?;
        let path = self.state_path(&record);
        let tmp = self.dir.join(format!(".{}.{}.tmp", record.link, Uuid::new_v4()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        info!(session_id, path = %path.display(), elements = elements.len(), "persistence: board saved");
        Ok(PersistedBoard { record, element_count: elements.len() })
    }

    async fn load(&self, session_id: i64) -> Result<Vec<Element>, PersistenceError> {
        let record = self
            .records
            .find(session_id)
            .await?
            .ok_or(PersistenceError::RecordNotFound(session_id))?;

        let path = self.state_path(&record);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(PersistenceError::StateNotFound(session_id)),
            Err(e) => return Err(e.into()),
        };
        let elements: Vec<Element> = serde_json::from_slice(&bytes)?;

        info!(session_id, path = %path.display(), elements = elements.len(), "persistence: board loaded");
        Ok(elements)
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
