//! Column mapping preview.
//!
//! Loads two snapshots, runs the column matcher and renders one row per left
//! column: its right counterpart, the similarity score and a status.

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::ColumnsArgs,
    compare::DEFAULT_LOW_CONFIDENCE_THRESHOLD,
    io_utils,
    matcher::{self, ColumnMapping, DEFAULT_SIMILARITY_CUTOFF},
    snapshot, table,
};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let left_encoding = io_utils::resolve_encoding(args.left_encoding.as_deref())?;
    let right_encoding = io_utils::resolve_encoding(args.right_encoding.as_deref())?;
    let left = snapshot::load_table(&args.left, "left", args.delimiter, left_encoding)?;
    let right = snapshot::load_table(&args.right, "right", args.delimiter, right_encoding)?;

    let cutoff = args.cutoff.unwrap_or(DEFAULT_SIMILARITY_CUTOFF);
    let mapping = matcher::match_columns(left.headers(), right.headers(), cutoff)
        .context("Matching columns")?;

    let headers = vec![
        "#".to_string(),
        "left".to_string(),
        "right".to_string(),
        "similarity".to_string(),
        "status".to_string(),
    ];
    table::print_table(&headers, &mapping_rows(&mapping));
    info!(
        "Matched {} of {} left column(s) at cutoff {cutoff}",
        mapping.len(),
        left.column_count()
    );
    Ok(())
}

fn mapping_rows(mapping: &ColumnMapping) -> Vec<Vec<String>> {
    let matched = mapping.matched().iter().map(|entry| {
        let status = if entry.similarity < DEFAULT_LOW_CONFIDENCE_THRESHOLD {
            "low confidence"
        } else {
            "matched"
        };
        (
            entry.left_index,
            vec![
                entry.left.clone(),
                entry.right.clone(),
                format!("{:.3}", entry.similarity),
                status.to_string(),
            ],
        )
    });
    let unmatched = mapping.unmatched().iter().map(|entry| {
        let (candidate, score) = match &entry.best_candidate {
            Some(best) => (format!("({})", best.column), format!("{:.3}", best.similarity)),
            None => (String::new(), String::new()),
        };
        (
            entry.index,
            vec![entry.column.clone(), candidate, score, "unmatched".to_string()],
        )
    });

    let mut rows = matched.chain(unmatched).collect::<Vec<_>>();
    rows.sort_by_key(|(index, _)| *index);
    rows.into_iter()
        .map(|(index, cells)| {
            let mut row = vec![(index + 1).to_string()];
            row.extend(cells);
            row
        })
        .collect()
}
