//! Fuzzy column-name matching between two header sets.
//!
//! Matching is a pure function of the two name lists and a cutoff. Names are
//! canonicalized (trimmed, lowercased) for scoring only; every result keeps the
//! original labels so reports show headers exactly as each system spells them.
//!
//! Scores are sequence-matching ratios, `2 * M / T`, where `M` is the number of
//! characters shared by the longest common subsequence and `T` the combined
//! length of both names. When several right names share the best score the
//! lexicographically smallest canonical name wins, so repeated runs always
//! produce the same mapping.

use std::collections::{BTreeMap, btree_map::Entry};

use itertools::Itertools;
use log::debug;
use serde::Serialize;
use similar::{DiffOp, TextDiff};

use crate::{
    diagnostics::{Diagnostic, Side},
    error::ReconcileError,
};

pub const DEFAULT_SIMILARITY_CUTOFF: f64 = 0.6;

pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Similarity of two strings in `[0, 1]`; two empty strings score 1.
///
/// Same ratio as [`TextDiff::ratio`], but in `f64` so it compares exactly
/// against `f64` cutoffs; `TextDiff::ratio` returns `f32`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let diff = TextDiff::from_chars(a, b);
    let shared: usize = diff
        .ops()
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();
    (2 * shared) as f64 / total as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedColumn {
    pub left: String,
    pub right: String,
    pub left_canonical: String,
    pub right_canonical: String,
    pub left_index: usize,
    pub right_index: usize,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub column: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedColumn {
    pub column: String,
    pub index: usize,
    pub best_candidate: Option<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateName {
    pub side: Side,
    pub column: String,
    pub canonical: String,
}

/// Left-to-right column mapping produced by [`match_columns`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnMapping {
    matched: Vec<MatchedColumn>,
    unmatched: Vec<UnmatchedColumn>,
    duplicates: Vec<DuplicateName>,
    #[serde(skip)]
    left_originals: BTreeMap<String, String>,
    #[serde(skip)]
    right_originals: BTreeMap<String, String>,
}

impl ColumnMapping {
    /// Matched pairs in left-table column order.
    pub fn matched(&self) -> &[MatchedColumn] {
        &self.matched
    }

    pub fn unmatched(&self) -> &[UnmatchedColumn] {
        &self.unmatched
    }

    pub fn duplicates(&self) -> &[DuplicateName] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.matched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }

    /// Looks up the pair for a left column given in any casing or padding.
    pub fn get(&self, left_name: &str) -> Option<&MatchedColumn> {
        let canonical = canonical_name(left_name);
        self.matched
            .iter()
            .find(|entry| entry.left_canonical == canonical)
    }

    pub fn left_original(&self, canonical: &str) -> Option<&str> {
        self.left_originals.get(canonical).map(String::as_str)
    }

    pub fn right_original(&self, canonical: &str) -> Option<&str> {
        self.right_originals.get(canonical).map(String::as_str)
    }

    /// Data-quality findings about the mapping itself.
    pub fn diagnostics(&self, low_confidence_threshold: f64) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for duplicate in &self.duplicates {
            diagnostics.push(Diagnostic::DuplicateColumn {
                side: duplicate.side,
                column: duplicate.column.clone(),
                canonical: duplicate.canonical.clone(),
            });
        }
        for unmatched in &self.unmatched {
            diagnostics.push(Diagnostic::UnmatchedColumn {
                column: unmatched.column.clone(),
                best_candidate: unmatched
                    .best_candidate
                    .as_ref()
                    .map(|candidate| candidate.column.clone()),
                similarity: unmatched
                    .best_candidate
                    .as_ref()
                    .map(|candidate| candidate.similarity),
            });
        }
        for entry in &self.matched {
            if entry.similarity < low_confidence_threshold {
                diagnostics.push(Diagnostic::LowConfidenceMatch {
                    column: entry.left.clone(),
                    candidate: entry.right.clone(),
                    similarity: entry.similarity,
                });
            }
        }
        let shared = self
            .matched
            .iter()
            .into_group_map_by(|entry| entry.right_index);
        for (_, group) in shared
            .into_iter()
            .filter(|(_, group)| group.len() > 1)
            .sorted_by_key(|(right_index, _)| *right_index)
        {
            diagnostics.push(Diagnostic::SharedTarget {
                right_column: group[0].right.clone(),
                left_columns: group.iter().map(|entry| entry.left.clone()).collect(),
            });
        }
        diagnostics
    }
}

struct NamedColumn<'a> {
    index: usize,
    original: &'a str,
    canonical: String,
}

/// Maps every left column to its closest right column scoring at least
/// `cutoff`. Left columns with no candidate at or above the cutoff are kept in
/// [`ColumnMapping::unmatched`] together with the best rejected candidate.
pub fn match_columns(
    left: &[String],
    right: &[String],
    cutoff: f64,
) -> Result<ColumnMapping, ReconcileError> {
    ensure_unit_interval("similarity cutoff", cutoff)?;

    let mut mapping = ColumnMapping::default();
    let left_named = canonicalize(
        left,
        Side::Left,
        &mut mapping.left_originals,
        &mut mapping.duplicates,
    );
    let right_named = canonicalize(
        right,
        Side::Right,
        &mut mapping.right_originals,
        &mut mapping.duplicates,
    );

    for column in &left_named {
        match best_candidate(&column.canonical, &right_named) {
            Some((candidate, similarity)) if similarity >= cutoff => {
                debug!(
                    "Matched '{}' -> '{}' ({similarity:.3})",
                    column.original, candidate.original
                );
                mapping.matched.push(MatchedColumn {
                    left: column.original.to_string(),
                    right: candidate.original.to_string(),
                    left_canonical: column.canonical.clone(),
                    right_canonical: candidate.canonical.clone(),
                    left_index: column.index,
                    right_index: candidate.index,
                    similarity,
                });
            }
            rejected => {
                debug!("No candidate above {cutoff} for '{}'", column.original);
                mapping.unmatched.push(UnmatchedColumn {
                    column: column.original.to_string(),
                    index: column.index,
                    best_candidate: rejected.map(|(candidate, similarity)| Candidate {
                        column: candidate.original.to_string(),
                        similarity,
                    }),
                });
            }
        }
    }
    Ok(mapping)
}

pub(crate) fn ensure_unit_interval(label: &str, value: f64) -> Result<(), ReconcileError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ReconcileError::InvalidConfig(format!(
            "{label} must be between 0 and 1, got {value}"
        )))
    }
}

// First occurrence of a canonical name wins; later ones are recorded as duplicates.
fn canonicalize<'a>(
    names: &'a [String],
    side: Side,
    originals: &mut BTreeMap<String, String>,
    duplicates: &mut Vec<DuplicateName>,
) -> Vec<NamedColumn<'a>> {
    let mut named = Vec::with_capacity(names.len());
    for (index, original) in names.iter().enumerate() {
        let canonical = canonical_name(original);
        match originals.entry(canonical.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(original.clone());
                named.push(NamedColumn {
                    index,
                    original,
                    canonical,
                });
            }
            Entry::Occupied(_) => duplicates.push(DuplicateName {
                side,
                column: original.clone(),
                canonical,
            }),
        }
    }
    named
}

fn best_candidate<'n, 'a>(
    target: &str,
    candidates: &'n [NamedColumn<'a>],
) -> Option<(&'n NamedColumn<'a>, f64)> {
    let mut best: Option<(&NamedColumn, f64)> = None;
    for candidate in candidates {
        let similarity = similarity_ratio(target, &candidate.canonical);
        let replaces = match best {
            None => true,
            Some((current, current_similarity)) => {
                similarity > current_similarity
                    || (similarity == current_similarity && candidate.canonical < current.canonical)
            }
        };
        if replaces {
            best = Some((candidate, similarity));
        }
    }
    best
}
