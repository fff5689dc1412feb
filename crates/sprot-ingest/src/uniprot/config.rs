//! Loader options

use serde::{Deserialize, Serialize};

/// Table loaded when the caller does not name one
pub const DEFAULT_TABLE: &str = "protein";

/// Rows between two progress events
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Options for a flat-file load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Destination table, a bare SQL identifier
    pub table: String,
    /// Emit a `debug` progress event every N rows (0 disables them)
    pub progress_interval: u64,
    /// Create the protein table first when it is missing
    pub create_table: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            create_table: false,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set destination table
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Set progress interval
    pub fn with_progress_interval(mut self, rows: u64) -> Self {
        self.progress_interval = rows;
        self
    }

    /// Create the destination table when missing
    pub fn with_create_table(mut self, create: bool) -> Self {
        self.create_table = create;
        self
    }

    pub(crate) fn is_progress_row(&self, rows: u64) -> bool {
        self.progress_interval > 0 && rows % self.progress_interval == 0
    }
}
