//! Typed failures raised by the comparison core.
//!
//! Only precondition violations live here. Data-quality findings (unmatched
//! columns, row count drift) are [`crate::diagnostics::Diagnostic`]s and never
//! abort a run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Table '{table}' is malformed: {reason}")]
    InvalidTable { table: String, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Key column '{0}' not found in the left table")]
    UnknownKeyColumn(String),
    #[error("Key column '{0}' has no matching column in the right table")]
    UnmappedKeyColumn(String),
    #[error("Snapshot file not found: {0:?}")]
    SnapshotNotFound(PathBuf),
    #[error("No snapshot matches pattern '{0}'")]
    NoSnapshotMatch(String),
}
