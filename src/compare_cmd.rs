//! The `compare` command: load, compare, report.

use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use serde::Serialize;

use crate::{
    cli::CompareArgs,
    compare::{Comparator, ComparisonSummary},
    config::ReconcileConfig,
    diagnostics::Diagnostic,
    io_utils,
    matcher::ColumnMapping,
    printable_delimiter, report, snapshot,
};

const DEFAULT_REPORT_PREFIX: &str = "dynamic_schema_comparison_result";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportFormat {
    Xlsx,
    Delimited,
}

impl ReportFormat {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => Ok(ReportFormat::Xlsx),
            Some(ext) if ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv") => {
                Ok(ReportFormat::Delimited)
            }
            _ => Err(anyhow!(
                "Unsupported report extension for {path:?}; use .xlsx, .csv or .tsv"
            )),
        }
    }
}

#[derive(Serialize)]
struct DiagnosticsDocument<'a> {
    left: &'a Path,
    right: &'a Path,
    summary: &'a ComparisonSummary,
    mapping: &'a ColumnMapping,
    diagnostics: &'a [Diagnostic],
}

pub fn execute(args: &CompareArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let left_path = resolve_snapshot(&args.left, args.latest)?;
    let right_path = resolve_snapshot(&args.right, args.latest)?;
    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output(Path::new(".")),
    };
    let format = ReportFormat::from_path(&output)?;

    if let Some(delimiter) = args.delimiter {
        debug!("Input delimiter override '{}'", printable_delimiter(delimiter));
    }
    let left_encoding = io_utils::resolve_encoding(args.left_encoding.as_deref())?;
    let right_encoding = io_utils::resolve_encoding(args.right_encoding.as_deref())?;
    let left = snapshot::load_table(&left_path, &table_name(&left_path), args.delimiter, left_encoding)?;
    let right = snapshot::load_table(
        &right_path,
        &table_name(&right_path),
        args.delimiter,
        right_encoding,
    )?;

    let comparator = Comparator::new(config.comparator_config())?;
    let comparison = comparator
        .compare(&left, &right)
        .with_context(|| format!("Comparing {left_path:?} with {right_path:?}"))?;
    let artifact = report::build(&comparison.matrix, &config.report_options());

    match format {
        ReportFormat::Xlsx => report::write_xlsx(
            &artifact,
            &comparison.summary,
            &comparison.diagnostics,
            &output,
        )
        .with_context(|| format!("Writing report to {output:?}"))?,
        ReportFormat::Delimited => {
            let delimiter = io_utils::resolve_output_delimiter(&output, None);
            report::write_csv(&artifact, &output, delimiter)?
        }
    }

    if let Some(path) = &args.diagnostics {
        let document = DiagnosticsDocument {
            left: &left_path,
            right: &right_path,
            summary: &comparison.summary,
            mapping: &comparison.mapping,
            diagnostics: &comparison.diagnostics,
        };
        write_diagnostics(path, &document)?;
    }

    if let Some(limit) = args.preview {
        print!("{}", report::render_preview(&artifact, limit));
    }

    let summary = &comparison.summary;
    info!(
        "{} of {} column pair(s) disagree; {} unmatched column(s); {} diagnostic(s)",
        summary.pairs_with_mismatches,
        summary.pairs_compared,
        summary.unmatched_columns,
        comparison.diagnostics.len()
    );
    if args.fail_on_mismatch && summary.total_mismatches > 0 {
        bail!(
            "{} mismatching cell(s) across {} column pair(s)",
            summary.total_mismatches,
            summary.pairs_with_mismatches
        );
    }
    Ok(())
}

fn resolve_config(args: &CompareArgs) -> Result<ReconcileConfig> {
    let mut config = match &args.config {
        Some(path) => ReconcileConfig::load(path)?,
        None => ReconcileConfig::default(),
    };
    if let Some(cutoff) = args.cutoff {
        config.similarity_cutoff = cutoff;
    }
    if let Some(pad) = args.pad {
        config.pad_sentinel = pad;
    }
    if let Some(polarity) = args.highlight {
        config.highlight_polarity = polarity;
    }
    let keys = args
        .keys
        .iter()
        .map(|key| key.trim())
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if !keys.is_empty() {
        config.keys = keys;
    }
    config.validate().context("Validating run options")?;
    Ok(config)
}

fn resolve_snapshot(path: &Path, latest: bool) -> Result<PathBuf> {
    if !latest {
        return Ok(path.to_path_buf());
    }
    let pattern = path
        .to_str()
        .ok_or_else(|| anyhow!("Snapshot pattern {path:?} is not valid UTF-8"))?;
    snapshot::latest_snapshot(pattern)
}

// Two runs within the same second would otherwise overwrite each other.
fn default_output(dir: &Path) -> PathBuf {
    let stamped = snapshot::timestamped_path(dir, DEFAULT_REPORT_PREFIX, "xlsx");
    if !stamped.exists() {
        return stamped;
    }
    let base = stamped
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_REPORT_PREFIX.to_string());
    snapshot::incremented_path(dir, &base, "xlsx")
}

fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_diagnostics(path: &Path, document: &DiagnosticsDocument<'_>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating diagnostics file {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), document)
        .with_context(|| format!("Writing diagnostics to {path:?}"))?;
    info!(
        "{} diagnostic(s) written to {path:?}",
        document.diagnostics.len()
    );
    Ok(())
}
