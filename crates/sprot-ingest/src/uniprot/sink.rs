//! Transactional bulk insert of protein rows into SQLite
//!
//! The whole load runs inside one explicit transaction and reuses a single
//! prepared INSERT, so N rows cost one commit and one statement parse.
//! Dropping a [`RowSink`] without calling [`RowSink::finish`] rolls the
//! transaction back.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, warn};

use super::models::ProteinEntry;
use crate::error::{LoadError, Result, TransactionStage};

/// Bare SQL identifier accepted as a destination table name
pub const TABLE_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

#[allow(clippy::expect_used)]
static TABLE_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TABLE_NAME_PATTERN).expect("Invalid table name regex"));

/// Reject anything that is not a bare identifier before it reaches SQL text
pub fn validate_table_name(name: &str) -> Result<()> {
    if TABLE_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(LoadError::invalid_table_name(
            name,
            "expected a bare identifier matching [A-Za-z_][A-Za-z0-9_]*",
        ))
    }
}

/// Positional insert for the seven protein columns
pub fn insert_sql(table: &str) -> String {
    format!("INSERT INTO {} VALUES (?, ?, ?, ?, ?, ?, ?)", table)
}

/// Open `path` read/write, creating the file when it does not exist.
///
/// `path` is always a filesystem path, never an SQLite URI.
pub fn open_database(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        literal_path(path),
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| LoadError::DatabaseOpen {
        path: path.to_path_buf(),
        source,
    })
}

/// Anchor relative `file:` names to the working directory so a build with
/// URI filenames enabled globally still opens them as plain files
fn literal_path(path: &Path) -> PathBuf {
    if path.is_relative() && path.as_os_str().as_encoded_bytes().starts_with(b"file:") {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

/// Single-transaction writer for [`ProteinEntry`] rows.
pub struct RowSink {
    /// `None` only after `finish` has handed the connection off
    conn: Option<Connection>,
    insert_sql: String,
    table: String,
    rows: u64,
}

impl RowSink {
    /// Open the destination, prepare the insert and begin the transaction
    pub fn open(path: &Path, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let conn = open_database(path)?;
        Self::from_connection(conn, table)
    }

    /// Same as [`RowSink::open`] but on an already open connection
    pub fn from_connection(conn: Connection, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let insert_sql = insert_sql(table);

        // Prepared once here so a missing or wrong-shape table fails before
        // any row is read; the cached statement is reused for every insert.
        conn.prepare_cached(&insert_sql)
            .map_err(|source| LoadError::StatementPrepare {
                table: table.to_string(),
                source,
            })?;

        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|source| LoadError::Transaction {
                stage: TransactionStage::Begin,
                source,
            })?;

        debug!(table = %table, "Transaction started");

        Ok(Self {
            conn: Some(conn),
            insert_sql,
            table: table.to_string(),
            rows: 0,
        })
    }

    /// Bind `entry` positionally and step the insert
    pub fn insert(&mut self, entry: &ProteinEntry) -> Result<()> {
        let row = self.rows + 1;
        let Some(conn) = self.conn.as_ref() else {
            return Err(LoadError::BindOrStep {
                row,
                source: rusqlite::Error::InvalidQuery,
            });
        };

        let mut stmt = conn
            .prepare_cached(&self.insert_sql)
            .map_err(|source| LoadError::StatementPrepare {
                table: self.table.clone(),
                source,
            })?;

        stmt.execute(params![
            entry.identifier,
            entry.accession,
            i32::from(entry.is_reviewed),
            i32::from(entry.is_fragment),
            entry.length,
            entry.taxon_id,
            entry.crc64,
        ])
        .map_err(|source| LoadError::BindOrStep { row, source })?;

        self.rows = row;
        Ok(())
    }

    /// Rows inserted so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Commit, release the statement and close the database
    pub fn finish(mut self) -> Result<u64> {
        let Some(conn) = self.conn.take() else {
            return Ok(self.rows);
        };

        if let Err(source) = conn.execute_batch("COMMIT") {
            rollback(&conn);
            return Err(LoadError::Transaction {
                stage: TransactionStage::Commit,
                source,
            });
        }

        conn.flush_prepared_statement_cache();
        if let Err((_, e)) = conn.close() {
            // Data is already committed at this point
            warn!(error = %e, "Failed to close database cleanly");
        }

        debug!(table = %self.table, rows = self.rows, "Transaction committed");
        Ok(self.rows)
    }
}

impl Drop for RowSink {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!(
                table = %self.table,
                rows = self.rows,
                "Load aborted, rolling back transaction"
            );
            rollback(&conn);
        }
    }
}

fn rollback(conn: &Connection) {
    if conn.is_autocommit() {
        return;
    }
    if let Err(e) = conn.execute_batch("ROLLBACK") {
        warn!(error = %e, "Rollback failed");
    }
}
