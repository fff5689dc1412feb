//! Flat-file to SQLite load
//!
//! Streams records from [`FlatFileReader`] into a [`RowSink`] in input order.
//! Resources are acquired in the order input file, database, statement,
//! transaction and released in reverse on every exit path.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use flate2::read::MultiGzDecoder;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::LoadOptions;
use super::parser::FlatFileReader;
use super::schema::create_protein_table;
use super::sink::{open_database, validate_table_name, RowSink};
use crate::error::{LoadError, Result};

const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Load every record of `source` into `table` of the database at
/// `destination` and return the number of rows written.
///
/// The table must already exist with the seven protein columns; see
/// [`create_protein_table`](super::schema::create_protein_table).
///
/// # Example
///
/// ```no_run
/// let rows = sprot_ingest::load("uniprot_sprot.dat", "proteins.sqlite", "protein")?;
/// println!("{rows} proteins loaded");
/// # Ok::<(), sprot_ingest::LoadError>(())
/// ```
pub fn load(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    table: &str,
) -> Result<u64> {
    Loader::new(LoadOptions::new().with_table(table)).load(source, destination)
}

/// Row counts of a Swiss-Prot + TrEMBL load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub swissprot: u64,
    pub trembl: u64,
}

impl LoadSummary {
    pub fn total(&self) -> u64 {
        self.swissprot + self.trembl
    }
}

/// Load the Swiss-Prot file, then the TrEMBL file, into the same table.
///
/// Each file is its own transaction: a TrEMBL failure leaves the Swiss-Prot
/// rows in place.
pub fn load_flat_files(
    swissprot: impl AsRef<Path>,
    trembl: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<LoadSummary> {
    let loader = Loader::new(options.clone());
    let destination = destination.as_ref();

    let swissprot = loader.load(swissprot, destination)?;
    info!(rows = swissprot, "Swiss-Prot loaded");

    // The table exists by now if it was requested
    let trembl = Loader::new(options.clone().with_create_table(false)).load(trembl, destination)?;
    info!(rows = trembl, "TrEMBL loaded");

    Ok(LoadSummary { swissprot, trembl })
}

/// Configured flat-file loader
#[derive(Debug, Clone, Default)]
pub struct Loader {
    options: LoadOptions,
}

impl Loader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load `source` (plain or `.gz`) into the database at `destination`
    pub fn load(&self, source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<u64> {
        let source = source.as_ref();
        let destination = destination.as_ref();
        validate_table_name(&self.options.table)?;

        info!(
            source = %source.display(),
            destination = %destination.display(),
            table = %self.options.table,
            "Loading UniProtKB flat file"
        );

        let reader = open_source(source)?;
        let conn = open_database(destination)?;
        self.run(reader, conn, source)
    }

    /// Load records read from `reader` through an already open connection
    pub fn load_reader<R: BufRead>(&self, reader: R, conn: Connection) -> Result<u64> {
        validate_table_name(&self.options.table)?;
        self.run(reader, conn, Path::new("<reader>"))
    }

    fn run<R: BufRead>(&self, reader: R, conn: Connection, source: &Path) -> Result<u64> {
        let started = Instant::now();
        let table = self.options.table.as_str();

        if self.options.create_table {
            create_protein_table(&conn, table)?;
        }

        let mut sink = RowSink::from_connection(conn, table)?;
        let mut records = FlatFileReader::new(reader);

        while let Some(record) = records.next() {
            let entry = record.map_err(|e| LoadError::InputRead {
                path: source.to_path_buf(),
                line: records.line_number() + 1,
                source: e,
            })?;

            sink.insert(&entry)?;

            if self.options.is_progress_row(sink.rows()) {
                debug!(
                    rows = sink.rows(),
                    line = records.line_number(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Load progress"
                );
            }
        }

        if records.discarded_partial() {
            warn!(
                source = %source.display(),
                line = records.line_number(),
                "Input ended inside a record without '//'; partial record discarded"
            );
        }

        let rows = sink.finish()?;

        info!(
            source = %source.display(),
            table = %table,
            rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Flat file loaded"
        );

        Ok(rows)
    }
}

/// Open `path` for line reading, decompressing `.gz` files on the fly
fn open_source(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|source| LoadError::InputOpen {
        path: path.to_path_buf(),
        source,
    })?;

    if is_gzip(path) {
        debug!(path = %path.display(), "Reading gzip-compressed input");
        Ok(Box::new(BufReader::with_capacity(
            READ_BUFFER_BYTES,
            MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_BYTES, file)))
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("gz")
}
