//! Row alignment: turning two columns of different lengths into equal-length
//! sequences that can be compared position by position.
//!
//! The default row correspondence is positional after each table has been
//! sorted by its own full column set. This is a best-effort heuristic, not a
//! join: row `i` on the left only describes the same entity as row `i` on the
//! right when both snapshots hold the same logical rows and sorting them by
//! their natural column order ranks those rows identically. Whenever the
//! tables can drift apart (inserted, deleted or re-keyed rows) prefer
//! [`crate::keyed`] pairing on declared key columns.

use clap::ValueEnum;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{Cell, Table};

/// Filler written into the shorter side of an alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum PadSentinel {
    /// Numeric zero, as the legacy numeric padding produced.
    Zero,
    /// An explicit absent marker, rendered as an empty cell.
    #[default]
    Absent,
}

impl PadSentinel {
    /// Normalization never produces [`Cell::Null`], so it is free to mark
    /// absent slots in aligned output.
    pub fn filler(self) -> Cell {
        match self {
            PadSentinel::Zero => Cell::Number(Decimal::ZERO),
            PadSentinel::Absent => Cell::Null,
        }
    }
}

/// Two equal-length value sequences plus which slots hold real values.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub left: Vec<Cell>,
    pub right: Vec<Cell>,
    left_present: Vec<bool>,
    right_present: Vec<bool>,
}

impl Alignment {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// True when either side of `position` is filler.
    pub fn is_padded(&self, position: usize) -> bool {
        !(self.left_present[position] && self.right_present[position])
    }

    /// Elementwise equality; padded positions never agree, whatever the filler.
    pub fn agreement(&self) -> Vec<bool> {
        (0..self.len())
            .map(|idx| !self.is_padded(idx) && self.left[idx] == self.right[idx])
            .collect()
    }

    pub fn into_parts(self) -> (Vec<Cell>, Vec<Cell>, Vec<bool>) {
        let agrees = self.agreement();
        (self.left, self.right, agrees)
    }
}

/// Extends the shorter sequence at its tail so both have
/// `max(left.len(), right.len())` entries.
pub fn align(mut left: Vec<Cell>, mut right: Vec<Cell>, pad: PadSentinel) -> Alignment {
    let target = left.len().max(right.len());
    let left_present = presence(left.len(), target);
    let right_present = presence(right.len(), target);
    left.resize(target, pad.filler());
    right.resize(target, pad.filler());
    Alignment {
        left,
        right,
        left_present,
        right_present,
    }
}

fn presence(extent: usize, target: usize) -> Vec<bool> {
    (0..target).map(|idx| idx < extent).collect()
}

/// Row indices of `table` ordered by every column, left to right. The sort is
/// stable, so fully identical rows keep their input order.
pub fn sorted_row_order(table: &Table) -> Vec<usize> {
    let rows = table.rows();
    (0..rows.len())
        .sorted_by(|&a, &b| rows[a].cmp(&rows[b]))
        .collect()
}

/// Pairs of row indices, one per aligned position. `None` marks a position
/// with no row on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowPairing {
    pairs: Vec<(Option<usize>, Option<usize>)>,
}

impl RowPairing {
    pub fn new(pairs: Vec<(Option<usize>, Option<usize>)>) -> Self {
        Self { pairs }
    }

    /// Positional pairing of the two tables after sorting each independently.
    pub fn sorted_positional(left: &Table, right: &Table) -> Self {
        let left_order = sorted_row_order(left);
        let right_order = sorted_row_order(right);
        let pairs = left_order
            .into_iter()
            .map(Some)
            .zip_longest(right_order.into_iter().map(Some))
            .map(|pair| pair.or(None, None))
            .collect();
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(Option<usize>, Option<usize>)] {
        &self.pairs
    }

    /// Projects one column of each table through the pairing, mapping every
    /// present cell through `transform` and filling gaps with `pad`.
    pub fn project<F>(
        &self,
        left: &Table,
        left_column: usize,
        right: &Table,
        right_column: usize,
        pad: PadSentinel,
        transform: F,
    ) -> Alignment
    where
        F: Fn(&Cell) -> Cell,
    {
        let pick = |table: &Table, row: Option<usize>, column: usize| {
            row.and_then(|row| table.cell(row, column)).map(&transform)
        };
        let mut alignment = Alignment {
            left: Vec::with_capacity(self.len()),
            right: Vec::with_capacity(self.len()),
            left_present: Vec::with_capacity(self.len()),
            right_present: Vec::with_capacity(self.len()),
        };
        for (left_row, right_row) in &self.pairs {
            let left_cell = pick(left, *left_row, left_column);
            let right_cell = pick(right, *right_row, right_column);
            alignment.left_present.push(left_cell.is_some());
            alignment.right_present.push(right_cell.is_some());
            alignment
                .left
                .push(left_cell.unwrap_or_else(|| pad.filler()));
            alignment
                .right
                .push(right_cell.unwrap_or_else(|| pad.filler()));
        }
        alignment
    }
}
