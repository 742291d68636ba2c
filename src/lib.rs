//! Compare two tabular snapshots whose schemas have drifted.
//!
//! Columns are matched by fuzzy name similarity, values are normalized so
//! different null and whitespace conventions agree, rows are aligned, and each
//! matched column pair becomes a left/right/agreement triple in a highlighted
//! report.

pub mod align;
pub mod cli;
pub mod columns;
pub mod compare;
pub mod compare_cmd;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod io_utils;
pub mod keyed;
pub mod matcher;
pub mod normalize;
pub mod report;
pub mod snapshot;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("schema_reconcile", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Compare(args) => compare_cmd::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
