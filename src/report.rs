//! Report building and writing.
//!
//! [`build`] flattens a [`ComparisonMatrix`] into a [`ReportArtifact`]: three
//! columns per matched pair (`<left>_Left`, `<right>_Right`, `<left>_Match`)
//! with a highlight flag on every agreement cell selected by the
//! [`HighlightPolarity`]. The artifact is immutable; the writers below only
//! read it.

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::info;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet, XlsxError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    compare::{ComparisonMatrix, ComparisonSummary},
    data::Cell,
    diagnostics::Diagnostic,
    io_utils, table,
};

const XLSX_MAX_ROWS: usize = 1_048_576;
const XLSX_MAX_COLUMNS: usize = 16_384;
const HIGHLIGHT_RGB: u32 = 0xFFFF00;
const ANSI_HIGHLIGHT: &str = "\u{1b}[30;43m";
const ANSI_RESET: &str = "\u{1b}[0m";

/// Which agreement cells get the highlight attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum HighlightPolarity {
    /// Highlight agreeing cells (the legacy report's behavior).
    Match,
    /// Highlight disagreeing cells.
    #[default]
    Mismatch,
}

impl HighlightPolarity {
    pub fn highlights(self, agrees: bool) -> bool {
        match self {
            HighlightPolarity::Match => agrees,
            HighlightPolarity::Mismatch => !agrees,
        }
    }
}

/// Header suffixes for the three columns each pair contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportLabels {
    pub left: String,
    pub right: String,
    pub agreement: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self {
            left: "Left".to_string(),
            right: "Right".to_string(),
            agreement: "Match".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub polarity: HighlightPolarity,
    pub labels: ReportLabels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Left,
    Right,
    Agreement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportValue {
    Cell(Cell),
    Flag(bool),
}

impl ReportValue {
    pub fn as_display(&self) -> String {
        match self {
            ReportValue::Cell(cell) => cell.as_display(),
            ReportValue::Flag(flag) => flag.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportColumn {
    pub header: String,
    pub role: ColumnRole,
    values: Vec<ReportValue>,
    highlighted: Vec<bool>,
}

impl ReportColumn {
    pub fn values(&self) -> &[ReportValue] {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSummary {
    pub left: String,
    pub right: String,
    pub similarity: f64,
    pub mismatches: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportArtifact {
    columns: Vec<ReportColumn>,
    row_count: usize,
    pairs: Vec<PairSummary>,
    polarity: HighlightPolarity,
}

impl ReportArtifact {
    pub fn headers(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|column| column.header.as_str())
            .collect()
    }

    pub fn columns(&self) -> &[ReportColumn] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn pairs(&self) -> &[PairSummary] {
        &self.pairs
    }

    pub fn polarity(&self) -> HighlightPolarity {
        self.polarity
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.header == header)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&ReportValue> {
        self.columns.get(column).and_then(|c| c.values.get(row))
    }

    pub fn is_highlighted(&self, row: usize, column: usize) -> bool {
        self.columns
            .get(column)
            .and_then(|c| c.highlighted.get(row))
            .copied()
            .unwrap_or(false)
    }

    pub fn highlighted_count(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.highlighted.iter().filter(|h| **h).count())
            .sum()
    }

    /// Indices of the agreement columns, for tooling that needs the verdicts.
    pub fn agreement_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.role == ColumnRole::Agreement)
            .map(|(idx, _)| idx)
    }

    fn display_row(&self, row: usize) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| {
                column
                    .values
                    .get(row)
                    .map(ReportValue::as_display)
                    .unwrap_or_default()
            })
            .collect()
    }
}

pub fn build(matrix: &ComparisonMatrix, options: &ReportOptions) -> ReportArtifact {
    let labels = &options.labels;
    let mut columns = Vec::with_capacity(matrix.len() * 3);
    let mut pairs = Vec::with_capacity(matrix.len());

    for pair in matrix.pairs() {
        let plain = vec![false; pair.len()];
        columns.push(ReportColumn {
            header: format!("{}_{}", pair.left_name, labels.left),
            role: ColumnRole::Left,
            values: pair.left.iter().cloned().map(ReportValue::Cell).collect(),
            highlighted: plain.clone(),
        });
        columns.push(ReportColumn {
            header: format!("{}_{}", pair.right_name, labels.right),
            role: ColumnRole::Right,
            values: pair.right.iter().cloned().map(ReportValue::Cell).collect(),
            highlighted: plain,
        });
        columns.push(ReportColumn {
            header: format!("{}_{}", pair.left_name, labels.agreement),
            role: ColumnRole::Agreement,
            values: pair.agrees.iter().copied().map(ReportValue::Flag).collect(),
            highlighted: pair
                .agrees
                .iter()
                .map(|agrees| options.polarity.highlights(*agrees))
                .collect(),
        });
        pairs.push(PairSummary {
            left: pair.left_name.clone(),
            right: pair.right_name.clone(),
            similarity: pair.similarity,
            mismatches: pair.mismatch_count(),
        });
    }

    ReportArtifact {
        columns,
        row_count: matrix.row_count(),
        pairs,
        polarity: options.polarity,
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("XLSX error: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("Report has {found} {what}, more than the XLSX limit of {limit}")]
    TooLarge {
        what: &'static str,
        found: usize,
        limit: usize,
    },
}

/// Writes the artifact as a workbook with `Comparison`, `Summary` and
/// `Diagnostics` sheets. Highlighted cells get a solid yellow fill.
pub fn write_xlsx(
    artifact: &ReportArtifact,
    summary: &ComparisonSummary,
    diagnostics: &[Diagnostic],
    path: &Path,
) -> Result<(), ReportError> {
    if artifact.row_count() + 1 > XLSX_MAX_ROWS {
        return Err(ReportError::TooLarge {
            what: "rows",
            found: artifact.row_count() + 1,
            limit: XLSX_MAX_ROWS,
        });
    }
    if artifact.columns().len() > XLSX_MAX_COLUMNS {
        return Err(ReportError::TooLarge {
            what: "columns",
            found: artifact.columns().len(),
            limit: XLSX_MAX_COLUMNS,
        });
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let highlight_format = Format::new()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(HIGHLIGHT_RGB));

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Comparison")?;
        write_comparison_sheet(sheet, artifact, &header_format, &highlight_format)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_summary_sheet(sheet, artifact, summary, &header_format)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Diagnostics")?;
        write_diagnostics_sheet(sheet, diagnostics, &header_format)?;
    }

    workbook.save(path)?;
    info!(
        "Comparison report with {} highlighted cell(s) saved to {:?}",
        artifact.highlighted_count(),
        path
    );
    Ok(())
}

fn write_comparison_sheet(
    sheet: &mut Worksheet,
    artifact: &ReportArtifact,
    header: &Format,
    highlight: &Format,
) -> Result<(), XlsxError> {
    for (col_idx, column) in artifact.columns().iter().enumerate() {
        // Bounds were checked against the XLSX limits before writing.
        let col = col_idx as u16;
        sheet.write_string_with_format(0, col, &column.header, header)?;
        for (row_idx, value) in column.values.iter().enumerate() {
            let row = (row_idx + 1) as u32;
            let format = column.highlighted[row_idx].then_some(highlight);
            write_value(sheet, row, col, value, format)?;
        }
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_value(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &ReportValue,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match (value, format) {
        (ReportValue::Flag(flag), Some(format)) => {
            sheet.write_boolean_with_format(row, col, *flag, format)?;
        }
        (ReportValue::Flag(flag), None) => {
            sheet.write_boolean(row, col, *flag)?;
        }
        (ReportValue::Cell(Cell::Null), Some(format)) => {
            sheet.write_blank(row, col, format)?;
        }
        (ReportValue::Cell(Cell::Null), None) => {}
        (ReportValue::Cell(Cell::Number(number)), format) => {
            write_decimal(sheet, row, col, number, format)?;
        }
        (ReportValue::Cell(cell), Some(format)) => {
            sheet.write_string_with_format(row, col, cell.as_display(), format)?;
        }
        (ReportValue::Cell(cell), None) => {
            sheet.write_string(row, col, cell.as_display())?;
        }
    }
    Ok(())
}

// Spreadsheet numbers are doubles; anything with more than 15 significant
// digits is written as text so no digit is silently rounded.
fn write_decimal(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    number: &Decimal,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    let normalized = number.normalize();
    let exact = normalized.mantissa().unsigned_abs() < 10_u128.pow(15);
    match (normalized.to_f64().filter(|_| exact), format) {
        (Some(value), Some(format)) => sheet.write_number_with_format(row, col, value, format)?,
        (Some(value), None) => sheet.write_number(row, col, value)?,
        (None, Some(format)) => {
            sheet.write_string_with_format(row, col, normalized.to_string(), format)?
        }
        (None, None) => sheet.write_string(row, col, normalized.to_string())?,
    };
    Ok(())
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    artifact: &ReportArtifact,
    summary: &ComparisonSummary,
    header: &Format,
) -> Result<(), XlsxError> {
    let totals: [(&str, usize); 6] = [
        ("Left rows", summary.left_rows),
        ("Right rows", summary.right_rows),
        ("Aligned rows", summary.aligned_rows),
        ("Pairs compared", summary.pairs_compared),
        ("Unmatched columns", summary.unmatched_columns),
        ("Mismatching cells", summary.total_mismatches),
    ];
    let mut row = 0u32;
    for (label, value) in totals {
        sheet.write_string_with_format(row, 0, label, header)?;
        sheet.write_number(row, 1, value as f64)?;
        row += 1;
    }
    row += 1;

    for (col, title) in ["Left column", "Right column", "Similarity", "Mismatches"]
        .iter()
        .enumerate()
    {
        sheet.write_string_with_format(row, col as u16, *title, header)?;
    }
    row += 1;
    for pair in artifact.pairs() {
        sheet.write_string(row, 0, &pair.left)?;
        sheet.write_string(row, 1, &pair.right)?;
        sheet.write_number(row, 2, pair.similarity)?;
        sheet.write_number(row, 3, pair.mismatches as f64)?;
        row += 1;
    }
    Ok(())
}

fn write_diagnostics_sheet(
    sheet: &mut Worksheet,
    diagnostics: &[Diagnostic],
    header: &Format,
) -> Result<(), XlsxError> {
    sheet.write_string_with_format(0, 0, "Kind", header)?;
    sheet.write_string_with_format(0, 1, "Column", header)?;
    sheet.write_string_with_format(0, 2, "Detail", header)?;
    for (idx, diagnostic) in diagnostics.iter().enumerate() {
        let row = (idx + 1) as u32;
        sheet.write_string(row, 0, diagnostic.kind())?;
        if let Some(column) = diagnostic.column() {
            sheet.write_string(row, 1, column)?;
        }
        sheet.write_string(row, 2, diagnostic.to_string())?;
    }
    Ok(())
}

/// Writes the comparison grid as delimited text. Highlights have no CSV
/// representation; the agreement columns carry the verdicts.
pub fn write_csv(artifact: &ReportArtifact, path: &Path, delimiter: u8) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, delimiter)?;
    writer
        .write_record(artifact.headers())
        .context("Writing report headers")?;
    for row in 0..artifact.row_count() {
        writer
            .write_record(artifact.display_row(row))
            .with_context(|| format!("Writing report row {}", row + 1))?;
    }
    writer.flush().context("Flushing report output")?;
    info!(
        "Comparison report with {} row(s) saved to {:?}",
        artifact.row_count(),
        path
    );
    Ok(())
}

/// Renders the first `limit` rows as a terminal table; highlighted cells are
/// shown with a yellow background.
pub fn render_preview(artifact: &ReportArtifact, limit: usize) -> String {
    let headers = artifact
        .headers()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let rows = (0..artifact.row_count().min(limit))
        .map(|row| {
            artifact
                .display_row(row)
                .into_iter()
                .enumerate()
                .map(|(col, text)| {
                    if artifact.is_highlighted(row, col) {
                        format!("{ANSI_HIGHLIGHT}{text}{ANSI_RESET}")
                    } else {
                        text
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    table::render_table(&headers, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compare::{Comparator, ComparatorConfig},
        data::Table,
    };

    fn sample_matrix() -> ComparisonMatrix {
        let left = Table::new(
            "left",
            vec!["Id".into(), "Name".into()],
            vec![
                vec![Cell::from(1_i64), Cell::from("Ann")],
                vec![Cell::from(2_i64), Cell::from("Bo")],
            ],
        )
        .unwrap();
        let right = Table::new(
            "right",
            vec!["ID".into(), "NAME".into()],
            vec![
                vec![Cell::from(1_i64), Cell::from("Ann")],
                vec![Cell::from(2_i64), Cell::from("Bob")],
            ],
        )
        .unwrap();
        Comparator::new(ComparatorConfig::default())
            .unwrap()
            .compare(&left, &right)
            .unwrap()
            .matrix
    }

    #[test]
    fn three_columns_per_pair_with_stable_suffixes() {
        let artifact = build(&sample_matrix(), &ReportOptions::default());
        assert_eq!(
            artifact.headers(),
            vec!["Id_Left", "ID_Right", "Id_Match", "Name_Left", "NAME_Right", "Name_Match"]
        );
        assert_eq!(artifact.row_count(), 2);
        assert_eq!(artifact.agreement_columns().collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(artifact.value(1, 5), Some(&ReportValue::Flag(false)));
    }

    #[test]
    fn mismatch_polarity_highlights_false_cells_only() {
        let artifact = build(&sample_matrix(), &ReportOptions::default());
        assert_eq!(artifact.highlighted_count(), 1);
        assert!(artifact.is_highlighted(1, 5));
        assert!(!artifact.is_highlighted(0, 5));
        assert!(!artifact.is_highlighted(1, 3));
    }

    #[test]
    fn match_polarity_highlights_true_cells() {
        let options = ReportOptions {
            polarity: HighlightPolarity::Match,
            ..ReportOptions::default()
        };
        let artifact = build(&sample_matrix(), &options);
        assert_eq!(artifact.highlighted_count(), 3);
        assert!(!artifact.is_highlighted(1, 5));
        assert_eq!(artifact.polarity(), HighlightPolarity::Match);
    }

    #[test]
    fn custom_labels_reproduce_legacy_headers() {
        let options = ReportOptions {
            labels: ReportLabels {
                left: "DB2".to_string(),
                right: "Snowflake".to_string(),
                agreement: "Comparison".to_string(),
            },
            ..ReportOptions::default()
        };
        let artifact = build(&sample_matrix(), &options);
        assert_eq!(artifact.column_index("Id_Comparison"), Some(2));
        assert_eq!(artifact.column_index("NAME_Snowflake"), Some(4));
    }

    #[test]
    fn preview_marks_highlighted_cells() {
        let artifact = build(&sample_matrix(), &ReportOptions::default());
        let rendered = render_preview(&artifact, 10);
        assert!(rendered.contains(&format!("{ANSI_HIGHLIGHT}false{ANSI_RESET}")));
        assert!(rendered.lines().next().unwrap().starts_with("Id_Left"));
    }

    #[test]
    fn pair_summaries_count_mismatches() {
        let artifact = build(&sample_matrix(), &ReportOptions::default());
        assert_eq!(artifact.pairs()[0].mismatches, 0);
        assert_eq!(artifact.pairs()[1].mismatches, 1);
        assert_eq!(artifact.pairs()[1].right, "NAME");
    }
}
