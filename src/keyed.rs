//! Row pairing on declared key columns.
//!
//! Keys are built from the normalized, rendered value of each key cell, so a
//! numeric `42` from one system pairs with the text `"42 "` from the other.
//! Matched rows come first in left-table order, then left-only rows, then
//! right-only rows in right-table order. Duplicate keys pair up in the order
//! they occur.

use std::collections::{HashMap, VecDeque};

use itertools::Itertools;
use log::debug;

use crate::{align::RowPairing, data::Cell, data::Table, normalize::normalize};

const KEY_SEPARATOR: &str = "\u{1f}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedPairing {
    pub pairing: RowPairing,
    pub matched: usize,
    pub left_only: usize,
    pub right_only: usize,
}

impl KeyedPairing {
    pub fn has_unpaired_rows(&self) -> bool {
        self.left_only > 0 || self.right_only > 0
    }
}

pub fn pair_by_key(
    left: &Table,
    right: &Table,
    left_keys: &[usize],
    right_keys: &[usize],
) -> KeyedPairing {
    let mut lookup = build_right_lookup(right, right_keys);
    let mut claimed = vec![false; right.row_count()];
    let mut pairs = Vec::with_capacity(left.row_count().max(right.row_count()));
    let mut left_only = Vec::new();

    for (row_idx, row) in left.rows().iter().enumerate() {
        let key = build_key(row, left_keys);
        match lookup.get_mut(&key).and_then(VecDeque::pop_front) {
            Some(right_idx) => {
                claimed[right_idx] = true;
                pairs.push((Some(row_idx), Some(right_idx)));
            }
            None => left_only.push(row_idx),
        }
    }

    let matched = pairs.len();
    let left_only_count = left_only.len();
    pairs.extend(left_only.into_iter().map(|idx| (Some(idx), None)));
    let right_only = claimed
        .iter()
        .positions(|taken| !*taken)
        .collect::<Vec<_>>();
    let right_only_count = right_only.len();
    pairs.extend(right_only.into_iter().map(|idx| (None, Some(idx))));

    debug!(
        "Key pairing: {matched} matched, {left_only_count} left-only, {right_only_count} right-only"
    );
    KeyedPairing {
        pairing: RowPairing::new(pairs),
        matched,
        left_only: left_only_count,
        right_only: right_only_count,
    }
}

fn build_right_lookup(table: &Table, key_indices: &[usize]) -> HashMap<String, VecDeque<usize>> {
    let mut lookup: HashMap<String, VecDeque<usize>> = HashMap::new();
    for (row_idx, row) in table.rows().iter().enumerate() {
        lookup
            .entry(build_key(row, key_indices))
            .or_default()
            .push_back(row_idx);
    }
    lookup
}

fn build_key(row: &[Cell], key_indices: &[usize]) -> String {
    key_indices
        .iter()
        .map(|idx| {
            row.get(*idx)
                .map(|cell| normalize(cell).key_text())
                .unwrap_or_default()
        })
        .join(KEY_SEPARATOR)
}
