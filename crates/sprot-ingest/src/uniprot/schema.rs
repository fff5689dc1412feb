//! Destination table DDL
//!
//! The loader itself never creates tables. This helper exists for callers and
//! for the CLI `init` command, and lays the columns out in the order the
//! loader binds them.

use rusqlite::Connection;
use tracing::info;

use super::sink::validate_table_name;
use crate::error::{LoadError, Result};

/// Column names in bind order
pub const PROTEIN_COLUMNS: [&str; 7] = [
    "identifier",
    "accession",
    "is_reviewed",
    "is_fragment",
    "length",
    "taxon_id",
    "crc64",
];

fn create_table_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            identifier TEXT NOT NULL,
            accession TEXT NOT NULL,
            is_reviewed INTEGER NOT NULL,
            is_fragment INTEGER NOT NULL,
            length INTEGER NOT NULL,
            taxon_id INTEGER NOT NULL,
            crc64 TEXT NOT NULL
        )
        "#
    )
}

/// Create `table` with the protein layout if it does not exist yet
pub fn create_protein_table(conn: &Connection, table: &str) -> Result<()> {
    validate_table_name(table)?;

    conn.execute_batch(&create_table_sql(table))
        .map_err(|source| LoadError::StatementPrepare {
            table: table.to_string(),
            source,
        })?;

    info!(table = %table, "Protein table ready");
    Ok(())
}

/// Column names of `table` as SQLite reports them, in declaration order
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    validate_table_name(table)?;

    let to_err = |source: rusqlite::Error| LoadError::StatementPrepare {
        table: table.to_string(),
        source,
    };

    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", table))
        .map_err(to_err)?;

    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(to_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(to_err)?;

    Ok(columns)
}
