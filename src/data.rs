//! Cell values and the in-memory [`Table`] handed to the comparator.
//!
//! [`Cell`] is a closed variant: equality is decided per variant and by value,
//! so `1` read from one system agrees with `1.0` read from the other, while a
//! number never equals its textual rendering.

use std::{cmp::Ordering, fmt};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Cell {
    Null,
    String(String),
    /// Exact decimal, so wide integer keys and fixed-point amounts never
    /// round into each other.
    Number(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Types a raw field read from a snapshot file.
    ///
    /// Empty fields become [`Cell::Null`]. Numeric and temporal detection runs
    /// on the trimmed text, but text that stays a string is kept verbatim so
    /// the normalizer sees exactly what the source system produced. Numbers
    /// too wide for an exact decimal stay text rather than lose digits.
    pub fn infer(raw: &str) -> Cell {
        if raw.is_empty() {
            return Cell::Null;
        }
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::String(raw.to_string());
        }
        if let Some(number) = parse_number(trimmed) {
            return Cell::Number(number);
        }
        if let Some(datetime) = parse_naive_datetime(trimmed) {
            return Cell::DateTime(datetime);
        }
        if let Some(date) = parse_naive_date(trimmed) {
            return Cell::Date(date);
        }
        Cell::String(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::String(s) => s.clone(),
            Cell::Number(n) => n.normalize().to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Rendering under which equal cells produce equal text: like
    /// [`Cell::as_display`], except a midnight date-time renders as its date.
    pub fn key_text(&self) -> String {
        match self {
            Cell::DateTime(dt) if dt.time() == NaiveTime::MIN => {
                dt.date().format("%Y-%m-%d").to_string()
            }
            other => other.as_display(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Cell::Number(_) => 0,
            Cell::Date(_) | Cell::DateTime(_) => 1,
            Cell::String(_) => 2,
            Cell::Null => 3,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl Ord for Cell {
    /// Total order used when sorting snapshot rows: numbers, then dates and
    /// date-times on one timeline (a date sits at its midnight), strings,
    /// then nulls last.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cell::Null, Cell::Null) => Ordering::Equal,
            (Cell::String(a), Cell::String(b)) => a.cmp(b),
            (Cell::Number(a), Cell::Number(b)) => a.cmp(b),
            (Cell::Date(a), Cell::Date(b)) => a.cmp(b),
            (Cell::DateTime(a), Cell::DateTime(b)) => a.cmp(b),
            (Cell::Date(a), Cell::DateTime(b)) => midnight(*a).cmp(b),
            (Cell::DateTime(a), Cell::Date(b)) => a.cmp(&midnight(*b)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_string())
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value)
    }
}

/// Non-finite floats have no decimal value and become [`Cell::Null`].
impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Decimal::from_f64(value).map_or(Cell::Null, Cell::Number)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(Decimal::from(value))
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(value: NaiveDateTime) -> Self {
        Cell::DateTime(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Null, Into::into)
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

// Plain digits, sign, point and exponent only; textual specials such as
// "inf", "NaN" or "1_000" stay strings.
fn parse_number(value: &str) -> Option<Decimal> {
    let numeric_chars = value
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !numeric_chars || !value.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if value.contains(['e', 'E']) {
        Decimal::from_scientific(value).ok()
    } else {
        Decimal::from_str_exact(value).ok()
    }
}

pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_naive_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// A rectangular grid of cells with a header row.
///
/// Tables are validated once on construction and never mutated afterwards;
/// the comparator only borrows them.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, ReconcileError> {
        let name = name.into();
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(ReconcileError::InvalidTable {
                table: name,
                reason: format!(
                    "row {} has {} cell(s) but the header declares {}",
                    idx + 1,
                    row.len(),
                    headers.len()
                ),
            });
        }
        Ok(Self {
            name,
            headers,
            rows,
        })
    }

    /// Builds a table from named columns, which must all have the same length.
    pub fn from_columns(
        name: impl Into<String>,
        columns: Vec<(String, Vec<Cell>)>,
    ) -> Result<Self, ReconcileError> {
        let name = name.into();
        let row_count = columns.first().map_or(0, |(_, cells)| cells.len());
        if let Some((header, cells)) = columns.iter().find(|(_, cells)| cells.len() != row_count) {
            return Err(ReconcileError::InvalidTable {
                table: name,
                reason: format!(
                    "column '{header}' has {} value(s), expected {row_count}",
                    cells.len()
                ),
            });
        }
        let mut headers = Vec::with_capacity(columns.len());
        let mut rows = vec![Vec::with_capacity(columns.len()); row_count];
        for (header, cells) in columns {
            headers.push(header);
            for (row, cell) in rows.iter_mut().zip(cells) {
                row.push(cell);
            }
        }
        Ok(Self {
            name,
            headers,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// True when the table has no columns or no data rows.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }
}
