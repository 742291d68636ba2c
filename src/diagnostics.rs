//! Structured, non-fatal findings collected during a comparison run.

use std::fmt;

use log::warn;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No right column cleared the similarity cutoff.
    UnmatchedColumn {
        column: String,
        best_candidate: Option<String>,
        similarity: Option<f64>,
    },
    /// Accepted, but below the low-confidence threshold.
    LowConfidenceMatch {
        column: String,
        candidate: String,
        similarity: f64,
    },
    /// Several left columns resolved to the same right column.
    SharedTarget {
        right_column: String,
        left_columns: Vec<String>,
    },
    /// Two headers on one side collapse to the same canonical name.
    DuplicateColumn {
        side: Side,
        column: String,
        canonical: String,
    },
    EmptyTable {
        side: Side,
        columns: usize,
        rows: usize,
    },
    RowCountMismatch {
        left_rows: usize,
        right_rows: usize,
    },
    /// Rows that found no partner under key pairing.
    UnpairedRows {
        left_only: usize,
        right_only: usize,
    },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::UnmatchedColumn { .. } => "unmatched_column",
            Diagnostic::LowConfidenceMatch { .. } => "low_confidence_match",
            Diagnostic::SharedTarget { .. } => "shared_target",
            Diagnostic::DuplicateColumn { .. } => "duplicate_column",
            Diagnostic::EmptyTable { .. } => "empty_table",
            Diagnostic::RowCountMismatch { .. } => "row_count_mismatch",
            Diagnostic::UnpairedRows { .. } => "unpaired_rows",
        }
    }

    /// Column the finding is about, if it concerns a single column.
    pub fn column(&self) -> Option<&str> {
        match self {
            Diagnostic::UnmatchedColumn { column, .. }
            | Diagnostic::LowConfidenceMatch { column, .. }
            | Diagnostic::DuplicateColumn { column, .. } => Some(column),
            Diagnostic::SharedTarget { right_column, .. } => Some(right_column),
            _ => None,
        }
    }

    pub(crate) fn emit(&self) {
        warn!("{self}");
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnmatchedColumn {
                column,
                best_candidate: Some(candidate),
                similarity: Some(similarity),
            } => write!(
                f,
                "No close match found for left column '{column}' (best candidate '{candidate}' scored {similarity:.3})"
            ),
            Diagnostic::UnmatchedColumn { column, .. } => {
                write!(f, "No close match found for left column '{column}'")
            }
            Diagnostic::LowConfidenceMatch {
                column,
                candidate,
                similarity,
            } => write!(
                f,
                "Low-confidence match: left column '{column}' -> '{candidate}' ({similarity:.3})"
            ),
            Diagnostic::SharedTarget {
                right_column,
                left_columns,
            } => write!(
                f,
                "Right column '{right_column}' is matched by several left columns: {}",
                left_columns.join(", ")
            ),
            Diagnostic::DuplicateColumn {
                side,
                column,
                canonical,
            } => write!(
                f,
                "Duplicate {side} column '{column}' (canonical '{canonical}') ignored for matching"
            ),
            Diagnostic::EmptyTable {
                side,
                columns,
                rows,
            } => write!(
                f,
                "The {side} table is empty ({columns} column(s), {rows} row(s))"
            ),
            Diagnostic::RowCountMismatch {
                left_rows,
                right_rows,
            } => write!(
                f,
                "Row counts differ: left has {left_rows}, right has {right_rows}; the shorter side is padded"
            ),
            Diagnostic::UnpairedRows {
                left_only,
                right_only,
            } => write!(
                f,
                "Key pairing found {left_only} left-only and {right_only} right-only row(s)"
            ),
        }
    }
}
