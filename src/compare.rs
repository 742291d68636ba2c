//! The comparator engine: column matching, row pairing, normalization and
//! alignment combined into a [`ComparisonMatrix`].
//!
//! A run is a single deterministic pass over two borrowed tables. Input
//! problems (invalid thresholds, unknown key columns) fail before any work is
//! done; data-quality problems become [`Diagnostic`]s next to a complete
//! result.

use log::{debug, info};
use serde::Serialize;

use crate::{
    align::{Alignment, PadSentinel, RowPairing},
    data::{Cell, Table},
    diagnostics::{Diagnostic, Side},
    error::ReconcileError,
    keyed,
    matcher::{self, ColumnMapping, DEFAULT_SIMILARITY_CUTOFF, MatchedColumn},
    normalize::normalize,
};

pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct ComparatorConfig {
    pub similarity_cutoff: f64,
    /// Accepted matches scoring below this are reported as low confidence.
    pub low_confidence_threshold: f64,
    pub pad_sentinel: PadSentinel,
    /// Left-table key columns. Empty selects sorted positional pairing.
    pub keys: Vec<String>,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            similarity_cutoff: DEFAULT_SIMILARITY_CUTOFF,
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
            pad_sentinel: PadSentinel::default(),
            keys: Vec::new(),
        }
    }
}

impl ComparatorConfig {
    pub fn validate(&self) -> Result<(), ReconcileError> {
        matcher::ensure_unit_interval("similarity cutoff", self.similarity_cutoff)?;
        matcher::ensure_unit_interval("low-confidence threshold", self.low_confidence_threshold)?;
        if self.keys.iter().any(|key| key.trim().is_empty()) {
            return Err(ReconcileError::InvalidConfig(
                "key column names cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One matched column pair after normalization and alignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedColumnPair {
    pub left_name: String,
    pub right_name: String,
    pub similarity: f64,
    pub left: Vec<Cell>,
    pub right: Vec<Cell>,
    pub agrees: Vec<bool>,
}

impl AlignedColumnPair {
    fn from_alignment(entry: &MatchedColumn, alignment: Alignment) -> Self {
        let (left, right, agrees) = alignment.into_parts();
        Self {
            left_name: entry.left.clone(),
            right_name: entry.right.clone(),
            similarity: entry.similarity,
            left,
            right,
            agrees,
        }
    }

    pub fn len(&self) -> usize {
        self.agrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agrees.is_empty()
    }

    pub fn mismatch_count(&self) -> usize {
        self.agrees.iter().filter(|agrees| !**agrees).count()
    }
}

/// Ordered column pairs in the order the left columns were matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonMatrix {
    pairs: Vec<AlignedColumnPair>,
    row_count: usize,
}

impl ComparisonMatrix {
    pub fn pairs(&self) -> &[AlignedColumnPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Aligned length shared by every pair.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Finds a pair by its original left and right labels.
    pub fn get(&self, left_name: &str, right_name: &str) -> Option<&AlignedColumnPair> {
        self.pairs
            .iter()
            .find(|pair| pair.left_name == left_name && pair.right_name == right_name)
    }

    pub fn total_mismatches(&self) -> usize {
        self.pairs.iter().map(AlignedColumnPair::mismatch_count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub left_rows: usize,
    pub right_rows: usize,
    pub aligned_rows: usize,
    pub pairs_compared: usize,
    pub unmatched_columns: usize,
    pub total_mismatches: usize,
    pub pairs_with_mismatches: usize,
}

impl ComparisonSummary {
    pub fn is_clean(&self) -> bool {
        self.total_mismatches == 0 && self.unmatched_columns == 0
    }
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub mapping: ColumnMapping,
    pub matrix: ComparisonMatrix,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: ComparisonSummary,
}

#[derive(Debug, Clone)]
pub struct Comparator {
    config: ComparatorConfig,
}

impl Comparator {
    pub fn new(config: ComparatorConfig) -> Result<Self, ReconcileError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    pub fn compare(&self, left: &Table, right: &Table) -> Result<Comparison, ReconcileError> {
        info!(
            "Comparing '{}' ({} column(s), {} row(s)) with '{}' ({} column(s), {} row(s))",
            left.name(),
            left.column_count(),
            left.row_count(),
            right.name(),
            right.column_count(),
            right.row_count()
        );
        let mapping = matcher::match_columns(
            left.headers(),
            right.headers(),
            self.config.similarity_cutoff,
        )?;

        let mut diagnostics = Vec::new();
        for (side, table) in [(Side::Left, left), (Side::Right, right)] {
            if table.is_empty() {
                diagnostics.push(Diagnostic::EmptyTable {
                    side,
                    columns: table.column_count(),
                    rows: table.row_count(),
                });
            }
        }
        diagnostics.extend(mapping.diagnostics(self.config.low_confidence_threshold));
        if left.row_count() != right.row_count() {
            diagnostics.push(Diagnostic::RowCountMismatch {
                left_rows: left.row_count(),
                right_rows: right.row_count(),
            });
        }

        let pairs: Vec<AlignedColumnPair> = if self.config.keys.is_empty() {
            let pairing = RowPairing::sorted_positional(left, right);
            self.project_pairs(left, right, &mapping, &pairing)
        } else {
            let (left_keys, right_keys) = self.resolve_keys(left, &mapping)?;
            let keyed = keyed::pair_by_key(left, right, &left_keys, &right_keys);
            if keyed.has_unpaired_rows() {
                diagnostics.push(Diagnostic::UnpairedRows {
                    left_only: keyed.left_only,
                    right_only: keyed.right_only,
                });
            }
            self.project_pairs(left, right, &mapping, &keyed.pairing)
        };

        let row_count = pairs.first().map_or_else(
            || left.row_count().max(right.row_count()),
            AlignedColumnPair::len,
        );
        let matrix = ComparisonMatrix { pairs, row_count };
        for diagnostic in &diagnostics {
            diagnostic.emit();
        }

        let summary = ComparisonSummary {
            left_rows: left.row_count(),
            right_rows: right.row_count(),
            aligned_rows: matrix.row_count(),
            pairs_compared: matrix.len(),
            unmatched_columns: mapping.unmatched().len(),
            total_mismatches: matrix.total_mismatches(),
            pairs_with_mismatches: matrix
                .pairs()
                .iter()
                .filter(|pair| pair.mismatch_count() > 0)
                .count(),
        };
        info!(
            "Compared {} column pair(s) over {} aligned row(s): {} mismatching cell(s)",
            summary.pairs_compared, summary.aligned_rows, summary.total_mismatches
        );
        Ok(Comparison {
            mapping,
            matrix,
            diagnostics,
            summary,
        })
    }

    fn resolve_keys(
        &self,
        left: &Table,
        mapping: &ColumnMapping,
    ) -> Result<(Vec<usize>, Vec<usize>), ReconcileError> {
        let mut left_keys = Vec::with_capacity(self.config.keys.len());
        let mut right_keys = Vec::with_capacity(self.config.keys.len());
        for key in &self.config.keys {
            let known = left
                .headers()
                .iter()
                .any(|header| matcher::canonical_name(header) == matcher::canonical_name(key));
            if !known {
                return Err(ReconcileError::UnknownKeyColumn(key.clone()));
            }
            let entry = mapping
                .get(key)
                .ok_or_else(|| ReconcileError::UnmappedKeyColumn(key.clone()))?;
            debug!("Key column '{}' pairs with '{}'", entry.left, entry.right);
            left_keys.push(entry.left_index);
            right_keys.push(entry.right_index);
        }
        Ok((left_keys, right_keys))
    }

    fn project_pairs(
        &self,
        left: &Table,
        right: &Table,
        mapping: &ColumnMapping,
        pairing: &RowPairing,
    ) -> Vec<AlignedColumnPair> {
        mapping
            .matched()
            .iter()
            .map(|entry| {
                let alignment = pairing.project(
                    left,
                    entry.left_index,
                    right,
                    entry.right_index,
                    self.config.pad_sentinel,
                    normalize,
                );
                AlignedColumnPair::from_alignment(entry, alignment)
            })
            .collect()
    }
}
