//! SQLite backend
//!
//! Holds separate reader/writer connections behind mutexes so every store
//! built on top is `Send + Sync` and works through `&self`. Migrations run
//! on the writer at open; FTS5 objects are created best-effort and their
//! availability is recorded as a capability.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{EngineError, Result};

/// Shared SQLite backend for all stores of one engine instance
pub struct SqliteBackend {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
    fts5: bool,
}

impl SqliteBackend {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (or create) the backend at `db_path`, defaulting to the
    /// platform data directory
    pub fn open(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("ai", "credo", "core").ok_or_else(|| {
                    EngineError::BackendUnavailable(
                        "could not determine project directories".to_string(),
                    )
                })?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                // Restrict directory permissions to owner-only on Unix
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(data_dir, perms);
                }
                data_dir.join("credo.db")
            }
        };

        let writer = Connection::open(&path)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer)?;
        super::migrations::apply_migrations(&writer)?;
        let fts5 = super::migrations::ensure_fts(&writer);

        let reader = Connection::open(&path)?;
        Self::configure_connection(&reader)?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            path,
            fts5,
        })
    }

    /// Database file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the FTS5 objects were created successfully
    pub fn supports_fts5(&self) -> bool {
        self.fts5
    }

    /// Run a closure against the reader connection
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .reader
            .lock()
            .map_err(|_| EngineError::BackendUnavailable("reader lock poisoned".to_string()))?;
        f(&conn)
    }

    /// Run a closure against the writer connection
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self
            .writer
            .lock()
            .map_err(|_| EngineError::BackendUnavailable("writer lock poisoned".to_string()))?;
        f(&mut conn)
    }

    /// Run `f` inside a writer-side savepoint. Every store write issued by
    /// `f` goes through the same writer connection and therefore joins the
    /// savepoint; an error rolls the whole unit back.
    pub fn with_unit<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.write(|conn| {
            conn.execute_batch("SAVEPOINT unit")?;
            Ok(())
        })?;

        match f() {
            Ok(value) => {
                self.write(|conn| {
                    conn.execute_batch("RELEASE unit")?;
                    Ok(())
                })?;
                Ok(value)
            }
            Err(e) => {
                let rollback = self.write(|conn| {
                    conn.execute_batch("ROLLBACK TO unit; RELEASE unit")?;
                    Ok(())
                });
                if let Err(rollback_err) = rollback {
                    tracing::warn!("savepoint rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

// ============================================================================
// EMBEDDING BLOBS
// ============================================================================

/// Serialize an embedding as little-endian f32 bytes
pub(crate) fn embedding_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode an embedding blob; `None` when the byte length is not a multiple
/// of four
pub(crate) fn embedding_from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
