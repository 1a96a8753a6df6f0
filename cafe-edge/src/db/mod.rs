//! 嵌入式数据库 (redb)
//!
//! One redb file (`{WORK_DIR}/cafe.redb`) holds every table of the edge node:
//! active table orders, order history, sales, customers and the catalog.
//! Each storage type opens its own tables on a shared [`Database`] handle.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate` by default: once `commit()`
//! returns the data survives a power loss. Edge devices get unplugged.

use redb::Database;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Database file name inside the work dir
pub const DATABASE_FILE: &str = "cafe.redb";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Open or create the database file
pub fn open(path: impl AsRef<Path>) -> StorageResult<Arc<Database>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::create(path)?;
    tracing::info!(path = %path.display(), "Database opened");
    Ok(Arc::new(db))
}

/// Open an in-memory database (tests and ephemeral runs)
pub fn open_in_memory() -> StorageResult<Arc<Database>> {
    let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
    Ok(Arc::new(db))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DATABASE_FILE);
        let db = open(&path).unwrap();
        assert!(path.exists());
        drop(db);
        // reopen the same file
        open(&path).unwrap();
    }

    #[test]
    fn test_open_in_memory() {
        let db = open_in_memory().unwrap();
        let txn = db.begin_write().unwrap();
        txn.commit().unwrap();
    }
}
