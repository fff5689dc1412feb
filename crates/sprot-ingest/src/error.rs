//! Error types for the flat-file loader
//!
//! Every variant is fatal to the load that raised it. Malformed flat-file
//! content never shows up here: the parser degrades to default field values
//! instead of failing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Stage of the enclosing transaction that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStage {
    Begin,
    Commit,
}

impl std::fmt::Display for TransactionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStage::Begin => write!(f, "begin"),
            TransactionStage::Commit => write!(f, "commit"),
        }
    }
}

/// Coarse classification of a [`LoadError`], for callers that only need to
/// branch on what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    InputOpenFailure,
    DatabaseOpenFailure,
    StatementPrepareFailure,
    BindOrStepFailure,
    TransactionFailure,
    InvalidTableName,
}

#[derive(Error, Debug)]
pub enum LoadError {
    /// Source flat-file could not be opened
    #[error("Failed to open flat file '{}': {source}", path.display())]
    InputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading from the source failed part-way through
    #[error("Failed to read flat file '{}' near line {line}: {source}", path.display())]
    InputRead {
        path: PathBuf,
        line: u64,
        #[source]
        source: std::io::Error,
    },

    /// Destination database could not be opened or created
    #[error("Failed to open database '{}': {source}", path.display())]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The INSERT could not be prepared, usually a missing or wrong-shape table
    #[error("Failed to prepare insert into table '{table}': {source}. The table must exist with 7 columns.")]
    StatementPrepare {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Binding or stepping a row failed
    #[error("Failed to insert row {row}: {source}")]
    BindOrStep {
        row: u64,
        #[source]
        source: rusqlite::Error,
    },

    /// BEGIN or COMMIT failed
    #[error("Failed to {stage} transaction: {source}")]
    Transaction {
        stage: TransactionStage,
        #[source]
        source: rusqlite::Error,
    },

    /// Table name is not a bare SQL identifier
    #[error("Invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: String },
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::InputOpen { .. } | LoadError::InputRead { .. } => {
                LoadErrorKind::InputOpenFailure
            },
            LoadError::DatabaseOpen { .. } => LoadErrorKind::DatabaseOpenFailure,
            LoadError::StatementPrepare { .. } => LoadErrorKind::StatementPrepareFailure,
            LoadError::BindOrStep { .. } => LoadErrorKind::BindOrStepFailure,
            LoadError::Transaction { .. } => LoadErrorKind::TransactionFailure,
            LoadError::InvalidTableName { .. } => LoadErrorKind::InvalidTableName,
        }
    }

    pub(crate) fn invalid_table_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTableName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
