//! Value normalization applied to every cell before comparison.

use crate::data::Cell;

/// Stand-in for null and blank cells, so a `NULL` on one side and an empty
/// string on the other agree.
pub const NULL_SENTINEL: &str = "-";

/// Canonicalizes a single cell.
///
/// Nulls and whitespace-only strings collapse to [`NULL_SENTINEL`], other
/// strings are trimmed, and numbers and dates pass through untouched so they
/// keep comparing by value.
pub fn normalize(cell: &Cell) -> Cell {
    match cell {
        Cell::Null => sentinel(),
        Cell::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                sentinel()
            } else {
                Cell::String(trimmed.to_string())
            }
        }
        other => other.clone(),
    }
}

fn sentinel() -> Cell {
    Cell::String(NULL_SENTINEL.to_string())
}
