//! Sprot Ingest - UniProtKB flat file loader

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use sprot_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use sprot_ingest::uniprot::config::DEFAULT_TABLE;
use sprot_ingest::uniprot::{load_flat_files, schema, sink, LoadOptions, Loader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sprot-ingest")]
#[command(author, version, about = "Load UniProtKB flat files into SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load one flat file (.dat or .dat.gz) into a table
    Load {
        /// UniProtKB flat file
        source: PathBuf,

        /// SQLite database file
        database: PathBuf,

        /// Destination table
        #[arg(short, long, env = "SPROT_TABLE", default_value = DEFAULT_TABLE)]
        table: String,

        /// Create the table first if it does not exist
        #[arg(long)]
        create_table: bool,

        /// Print a JSON summary instead of the bare row count
        #[arg(long)]
        json: bool,
    },

    /// Load Swiss-Prot then TrEMBL into the same table
    LoadAll {
        /// Swiss-Prot flat file
        #[arg(long)]
        swissprot: PathBuf,

        /// TrEMBL flat file
        #[arg(long)]
        trembl: PathBuf,

        /// SQLite database file
        #[arg(short, long)]
        database: PathBuf,

        /// Destination table
        #[arg(short, long, env = "SPROT_TABLE", default_value = DEFAULT_TABLE)]
        table: String,

        /// Create the table first if it does not exist
        #[arg(long)]
        create_table: bool,

        /// Print a JSON summary instead of plain counts
        #[arg(long)]
        json: bool,
    },

    /// Create the protein table
    Init {
        /// SQLite database file
        database: PathBuf,

        /// Table to create
        #[arg(short, long, env = "SPROT_TABLE", default_value = DEFAULT_TABLE)]
        table: String,
    },
}

#[derive(Serialize)]
struct LoadReport<'a> {
    source: &'a Path,
    table: &'a str,
    rows: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stdout carries the counts, so the console only gets warnings unless asked
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .output(LogOutput::Console)
        .log_file_prefix("sprot-ingest")
        .build()
        .merge_env()
        .context("Invalid logging environment")?;

    let _log_guard = init_logging(&log_config)?;

    match cli.command {
        Command::Load {
            source,
            database,
            table,
            create_table,
            json,
        } => {
            let options = LoadOptions::new()
                .with_table(table)
                .with_create_table(create_table);

            let spinner = spinner(&format!("Loading {}", source.display()), cli.verbose)?;
            let result = Loader::new(options.clone()).load(&source, &database);
            spinner.finish_and_clear();

            let rows = result.with_context(|| {
                format!("Failed to load {} into {}", source.display(), database.display())
            })?;

            if json {
                let report = LoadReport {
                    source: &source,
                    table: &options.table,
                    rows,
                };
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("{rows}");
            }
        },
        Command::LoadAll {
            swissprot,
            trembl,
            database,
            table,
            create_table,
            json,
        } => {
            let options = LoadOptions::new()
                .with_table(table)
                .with_create_table(create_table);

            let spinner = spinner("Loading Swiss-Prot and TrEMBL", cli.verbose)?;
            let result = load_flat_files(&swissprot, &trembl, &database, &options);
            spinner.finish_and_clear();

            let summary = result
                .with_context(|| format!("Failed to load flat files into {}", database.display()))?;

            if json {
                println!("{}", serde_json::to_string(&summary)?);
            } else {
                println!("swissprot\t{}", summary.swissprot);
                println!("trembl\t{}", summary.trembl);
            }
        },
        Command::Init { database, table } => {
            let conn = sink::open_database(&database)?;
            schema::create_protein_table(&conn, &table)
                .with_context(|| format!("Failed to create table {table}"))?;

            // An existing table is left as is, so make sure it binds in order
            let columns = schema::table_columns(&conn, &table)?;
            if columns != schema::PROTEIN_COLUMNS {
                bail!(
                    "Table {table} exists with columns ({}), expected ({})",
                    columns.join(", "),
                    schema::PROTEIN_COLUMNS.join(", ")
                );
            }

            info!(database = %database.display(), table = %table, "Database initialised");
        },
    }

    Ok(())
}

/// Spinner on stderr, hidden when stderr is not a terminal or logs are verbose
fn spinner(message: &str, verbose: bool) -> Result<ProgressBar> {
    if verbose || !std::io::stderr().is_terminal() {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid spinner template")?,
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}
