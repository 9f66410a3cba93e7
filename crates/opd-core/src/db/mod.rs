//! Database layer for clinic visit records.

mod records;
mod schema;

pub use schema::*;

use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

use crate::helpers::ensure_directory;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating the file and its folder if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_directory(parent)?;
        }
        let conn = Connection::open(path)?;
        let mut db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create the visit table if absent and add any missing newer columns.
    ///
    /// Safe to call repeatedly. Existing rows and columns are never touched.
    pub fn initialize(&mut self) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(SCHEMA)?;

        let existing: HashSet<String> = {
            let mut stmt = tx.prepare("SELECT name FROM pragma_table_info('patients')")?;
            let names = stmt.query_map([], |row| row.get(0))?;
            names.collect::<Result<_, _>>()?
        };

        for (column, definition) in EXTRA_COLUMNS {
            if !existing.contains(*column) {
                tracing::info!(column = *column, "adding missing column to patients table");
                tx.execute_batch(&format!("ALTER TABLE patients ADD COLUMN {}", definition))?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}
