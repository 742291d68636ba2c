use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{align::PadSentinel, report::HighlightPolarity};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Compare two tabular snapshots whose schemas have drifted",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare two snapshots column by column and write a highlighted report
    Compare(CompareArgs),
    /// Show how the columns of two snapshots would be matched
    Columns(ColumnsArgs),
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Left (reference) snapshot, or a glob pattern with --latest
    #[arg(short = 'l', long = "left")]
    pub left: PathBuf,
    /// Right (candidate) snapshot, or a glob pattern with --latest
    #[arg(short = 'r', long = "right")]
    pub right: PathBuf,
    /// Report file (.xlsx, .csv or .tsv); defaults to a timestamped .xlsx in the working directory
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// YAML run configuration; flags below override its values
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Minimum name similarity in [0, 1] for two columns to match
    #[arg(long)]
    pub cutoff: Option<f64>,
    /// Filler for the shorter side when row counts differ
    #[arg(long, value_enum)]
    pub pad: Option<PadSentinel>,
    /// Which agreement cells to highlight
    #[arg(long, value_enum)]
    pub highlight: Option<HighlightPolarity>,
    /// Left-table key columns; rows are paired by key instead of sorted position
    #[arg(short = 'k', long = "key", value_delimiter = ',')]
    pub keys: Vec<String>,
    /// CSV delimiter character for both inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the left snapshot (defaults to utf-8)
    #[arg(long = "left-encoding")]
    pub left_encoding: Option<String>,
    /// Character encoding of the right snapshot (defaults to utf-8)
    #[arg(long = "right-encoding")]
    pub right_encoding: Option<String>,
    /// Write diagnostics and the run summary as JSON to this path
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,
    /// Print the first N report rows to the terminal
    #[arg(long)]
    pub preview: Option<usize>,
    /// Treat --left/--right as glob patterns and use the newest match of each
    #[arg(long)]
    pub latest: bool,
    /// Exit with an error when any compared cell disagrees
    #[arg(long = "fail-on-mismatch")]
    pub fail_on_mismatch: bool,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Left (reference) snapshot
    #[arg(short = 'l', long = "left")]
    pub left: PathBuf,
    /// Right (candidate) snapshot
    #[arg(short = 'r', long = "right")]
    pub right: PathBuf,
    /// Minimum name similarity in [0, 1] for two columns to match
    #[arg(long)]
    pub cutoff: Option<f64>,
    /// CSV delimiter character for both inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the left snapshot (defaults to utf-8)
    #[arg(long = "left-encoding")]
    pub left_encoding: Option<String>,
    /// Character encoding of the right snapshot (defaults to utf-8)
    #[arg(long = "right-encoding")]
    pub right_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn keys_split_on_commas() {
        let cli = Cli::parse_from([
            "schema-reconcile",
            "compare",
            "--left",
            "a.csv",
            "--right",
            "b.csv",
            "--key",
            "id,region",
            "--pad",
            "zero",
            "--highlight",
            "match",
        ]);
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.keys, vec!["id", "region"]);
        assert_eq!(args.pad, Some(PadSentinel::Zero));
        assert_eq!(args.highlight, Some(HighlightPolarity::Match));
    }

    #[test]
    fn delimiter_aliases() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("pipe"), Ok(b'|'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }
}
