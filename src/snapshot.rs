//! Loading tables from delimited snapshot files and naming report outputs.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, Result};
use chrono::Local;
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    data::{Cell, Table},
    error::ReconcileError,
    io_utils,
};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Reads a CSV/TSV snapshot into a [`Table`], typing each cell with
/// [`Cell::infer`]. Raw text is kept untrimmed.
pub fn load_table(
    path: &Path,
    name: &str,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Table> {
    if !path.is_file() {
        return Err(ReconcileError::SnapshotNotFound(path.to_path_buf()).into());
    }
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;

    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", idx + 2))?;
        let fields = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {} of {path:?}", idx + 2))?;
        rows.push(fields.iter().map(|field| Cell::infer(field)).collect());
    }

    let table = Table::new(name, headers, rows)
        .with_context(|| format!("Building table from {path:?}"))?;
    info!(
        "Loaded '{}' from {:?}: {} column(s), {} row(s)",
        table.name(),
        path,
        table.column_count(),
        table.row_count()
    );
    Ok(table)
}

/// Newest regular file matching `pattern`; ties on modification time go to
/// the lexicographically greater path.
pub fn latest_snapshot(pattern: &str) -> Result<PathBuf> {
    let entries =
        glob::glob(pattern).with_context(|| format!("Invalid snapshot pattern '{pattern}'"))?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let path = entry.with_context(|| format!("Scanning matches of '{pattern}'"))?;
        if !path.is_file() {
            continue;
        }
        let modified = fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("Reading modification time of {path:?}"))?;
        debug!("Snapshot candidate {path:?}");
        let candidate = (modified, path);
        if newest.as_ref().is_none_or(|current| candidate > *current) {
            newest = Some(candidate);
        }
    }
    let (_, path) = newest.ok_or_else(|| ReconcileError::NoSnapshotMatch(pattern.to_string()))?;
    info!("Latest snapshot for '{pattern}' is {path:?}");
    Ok(path)
}

/// `<dir>/<prefix>_<YYYYmmdd_HHMMSS>.<ext>` for the current local time.
pub fn timestamped_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    let stamp = Local::now().format(TIMESTAMP_FORMAT);
    dir.join(format!("{prefix}_{stamp}.{extension}"))
}

/// First `<dir>/<base>_<n>.<ext>` (n from 1) that does not exist yet.
pub fn incremented_path(dir: &Path, base: &str, extension: &str) -> PathBuf {
    (1usize..)
        .map(|n| dir.join(format!("{base}_{n}.{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dir.join(format!("{base}.{extension}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn loads_typed_cells_and_keeps_raw_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("left.csv");
        fs::write(&path, "id,name,joined\n1, Ann ,2024-01-05\n2,,\n").unwrap();
        let table = load_table(&path, "left", None, UTF_8).unwrap();
        assert_eq!(table.headers(), &["id", "name", "joined"]);
        assert_eq!(table.cell(0, 0), Some(&Cell::from(1_i64)));
        assert_eq!(table.cell(0, 1), Some(&Cell::from(" Ann ")));
        assert!(matches!(table.cell(0, 2), Some(Cell::Date(_))));
        assert_eq!(table.cell(1, 1), Some(&Cell::Null));
    }

    #[test]
    fn tsv_extension_uses_tab() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("right.tsv");
        fs::write(&path, "a\tb\nx,y\t2\n").unwrap();
        let table = load_table(&path, "right", None, UTF_8).unwrap();
        assert_eq!(table.cell(0, 0), Some(&Cell::from("x,y")));
    }

    #[test]
    fn missing_file_is_a_typed_error() {
        let dir = tempdir().unwrap();
        let err = load_table(&dir.path().join("nope.csv"), "left", None, UTF_8).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReconcileError>(),
            Some(ReconcileError::SnapshotNotFound(_))
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "a,b\n1,2,3\n").unwrap();
        assert!(load_table(&path, "bad", None, UTF_8).is_err());
    }

    #[test]
    fn latest_snapshot_picks_newest_match() {
        let dir = tempdir().unwrap();
        let older = dir.path().join("db2_data_1.csv");
        let newer = dir.path().join("db2_data_2.csv");
        fs::write(&older, "a\n1\n").unwrap();
        fs::write(&newer, "a\n1\n").unwrap();
        let base = SystemTime::now() - Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&older)
            .unwrap()
            .set_modified(base)
            .unwrap();
        File::options()
            .write(true)
            .open(&newer)
            .unwrap()
            .set_modified(base + Duration::from_secs(60))
            .unwrap();
        let pattern = dir.path().join("db2_data_*.csv");
        let found = latest_snapshot(pattern.to_str().unwrap()).unwrap();
        assert_eq!(found, newer);
    }

    #[test]
    fn latest_snapshot_without_match_fails() {
        let dir = tempdir().unwrap();
        let pattern = dir.path().join("missing_*.csv");
        let err = latest_snapshot(pattern.to_str().unwrap()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReconcileError>(),
            Some(ReconcileError::NoSnapshotMatch(_))
        ));
    }

    #[test]
    fn output_names_follow_conventions() {
        let dir = tempdir().unwrap();
        let stamped = timestamped_path(dir.path(), "dynamic_schema_comparison_result", "xlsx");
        let name = stamped.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("dynamic_schema_comparison_result_"));
        assert!(name.ends_with(".xlsx"));
        assert_eq!(name.len(), "dynamic_schema_comparison_result_".len() + 15 + 5);

        let first = incremented_path(dir.path(), "report", "csv");
        assert_eq!(first, dir.path().join("report_1.csv"));
        fs::write(&first, "").unwrap();
        assert_eq!(
            incremented_path(dir.path(), "report", "csv"),
            dir.path().join("report_2.csv")
        );
    }
}
