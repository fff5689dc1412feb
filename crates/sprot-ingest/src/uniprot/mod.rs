//! UniProtKB flat-file loading
//!
//! This module turns UniProtKB DAT files into rows of an SQLite table.
//!
//! # Features
//! - Classify flat-file lines and assemble one entry per `//` record
//! - Bulk insert into SQLite inside a single transaction
//! - Handle gzip compression
//! - Create the destination table on request
//!
//! # Example
//! ```no_run
//! use sprot_ingest::uniprot::{config::LoadOptions, loader::Loader};
//!
//! # fn example() -> sprot_ingest::Result<()> {
//! let options = LoadOptions::new()
//!     .with_table("protein")
//!     .with_create_table(true);
//!
//! let rows = Loader::new(options).load("uniprot_sprot.dat.gz", "proteins.sqlite")?;
//! println!("{rows} rows");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod loader;
pub mod models;
pub mod parser;
pub mod schema;
pub mod sink;

pub use config::LoadOptions;
pub use loader::{load, load_flat_files, LoadSummary, Loader};
pub use models::ProteinEntry;
pub use parser::{EntryAssembler, FlatFileReader, LineKind};
pub use sink::RowSink;
