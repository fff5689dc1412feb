//! Sprot Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads UniProtKB flat files (Swiss-Prot and TrEMBL `.dat`, optionally
//! gzip-compressed) into an SQLite table with one row per protein entry:
//! identifier, accession, reviewed flag, fragment flag, sequence length,
//! taxonomy id and CRC-64.
//!
//! # Example
//!
//! ```no_run
//! fn main() -> anyhow::Result<()> {
//!     let rows = sprot_ingest::load("uniprot_sprot.dat", "proteins.sqlite", "protein")?;
//!     println!("Loaded {rows} proteins");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod uniprot;

pub use error::{LoadError, LoadErrorKind, Result};
pub use uniprot::{load, load_flat_files, LoadOptions, LoadSummary, Loader};
