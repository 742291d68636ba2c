mod common;

use std::{fs::File, io::Read};

use encoding_rs::UTF_8;
use proptest::prelude::*;
use schema_reconcile::{
    align::PadSentinel,
    compare::{Comparator, ComparatorConfig},
    data::{Cell, Table},
    diagnostics::Diagnostic,
    matcher::{self, DEFAULT_SIMILARITY_CUTOFF},
    normalize::normalize,
    report::{self, HighlightPolarity, ReportOptions, ReportValue},
    snapshot,
};

use common::{TestWorkspace, fixture_path};

fn compare(left: &Table, right: &Table, config: ComparatorConfig) -> schema_reconcile::compare::Comparison {
    Comparator::new(config)
        .expect("valid config")
        .compare(left, right)
        .expect("comparison")
}

#[test]
fn drifted_headers_map_to_original_labels() {
    let left = Table::from_columns(
        "db2",
        vec![
            ("Cust_ID".to_string(), vec![Cell::from(1_i64), Cell::from(2_i64)]),
            ("Name ".to_string(), vec![Cell::from("Ann"), Cell::from("Bo")]),
        ],
    )
    .unwrap();
    let right = Table::from_columns(
        "snowflake",
        vec![
            ("customer_id".to_string(), vec![Cell::from(1_i64), Cell::from(2_i64)]),
            ("NAME".to_string(), vec![Cell::from("Ann "), Cell::from("Bo")]),
        ],
    )
    .unwrap();

    let comparison = compare(&left, &right, ComparatorConfig::default());
    let ids = comparison.matrix.get("Cust_ID", "customer_id").expect("id pair");
    assert!(ids.similarity >= DEFAULT_SIMILARITY_CUTOFF && ids.similarity < 1.0);
    let names = comparison.matrix.get("Name ", "NAME").expect("name pair");
    assert_eq!(names.similarity, 1.0);
    assert_eq!(names.agrees, vec![true, true]);

    let artifact = report::build(&comparison.matrix, &ReportOptions::default());
    assert_eq!(
        artifact.headers(),
        vec![
            "Cust_ID_Left",
            "customer_id_Right",
            "Cust_ID_Match",
            "Name _Left",
            "NAME_Right",
            "Name _Match",
        ]
    );
    assert_eq!(artifact.highlighted_count(), 0);
}

#[test]
fn shorter_table_positions_are_forced_false_under_both_pads() {
    let left = Table::from_columns("l", vec![("n".to_string(), vec![Cell::from(0_i64); 3])]).unwrap();
    let right = Table::from_columns("r", vec![("n".to_string(), vec![Cell::from(0_i64); 5])]).unwrap();
    for pad in [PadSentinel::Zero, PadSentinel::Absent] {
        let config = ComparatorConfig {
            pad_sentinel: pad,
            ..ComparatorConfig::default()
        };
        let comparison = compare(&left, &right, config);
        let pair = &comparison.matrix.pairs()[0];
        assert_eq!(pair.len(), 5);
        assert!(!pair.agrees[3] && !pair.agrees[4]);
        assert!(pair.agrees[..3].iter().all(|agrees| *agrees));
    }
}

#[test]
fn unmatched_left_column_is_diagnosed_not_compared() {
    let left = Table::from_columns(
        "l",
        vec![
            ("id".to_string(), vec![Cell::from(1_i64)]),
            ("zip_code".to_string(), vec![Cell::from("75001")]),
        ],
    )
    .unwrap();
    let right = Table::from_columns(
        "r",
        vec![
            ("id".to_string(), vec![Cell::from(1_i64)]),
            ("zipper".to_string(), vec![Cell::from("75001")]),
        ],
    )
    .unwrap();
    let comparison = compare(&left, &right, ComparatorConfig::default());
    assert!(comparison.matrix.pairs().iter().all(|p| p.left_name != "zip_code"));
    let finding = comparison
        .diagnostics
        .iter()
        .find(|d| d.column() == Some("zip_code"))
        .expect("diagnostic for zip_code");
    match finding {
        Diagnostic::UnmatchedColumn {
            best_candidate,
            similarity,
            ..
        } => {
            assert_eq!(best_candidate.as_deref(), Some("zipper"));
            assert!(similarity.unwrap() < DEFAULT_SIMILARITY_CUTOFF);
        }
        other => panic!("unexpected diagnostic {other:?}"),
    }
}

#[test]
fn fixtures_round_trip_through_snapshot_loader() {
    let left = snapshot::load_table(&fixture_path("db2_customers.csv"), "db2", None, UTF_8).unwrap();
    let right =
        snapshot::load_table(&fixture_path("snowflake_customers.csv"), "sf", None, UTF_8).unwrap();
    let comparison = compare(&left, &right, ComparatorConfig::default());
    assert_eq!(comparison.summary.pairs_compared, 5);
    assert_eq!(comparison.summary.total_mismatches, 1);
    assert_eq!(comparison.summary.pairs_with_mismatches, 1);
    assert!(!comparison.summary.is_clean());

    let options = ReportOptions {
        polarity: HighlightPolarity::Match,
        ..ReportOptions::default()
    };
    let artifact = report::build(&comparison.matrix, &options);
    assert_eq!(artifact.highlighted_count(), 14);
    let balance = artifact.column_index("Balance_Match").unwrap();
    assert_eq!(artifact.value(1, balance), Some(&ReportValue::Flag(false)));
    assert!(!artifact.is_highlighted(1, balance));
}

#[test]
fn workbook_report_is_written() {
    let workspace = TestWorkspace::new();
    let left = snapshot::load_table(&fixture_path("db2_customers.csv"), "db2", None, UTF_8).unwrap();
    let right = snapshot::load_table(
        &fixture_path("snowflake_customers_drifted.csv"),
        "sf",
        None,
        UTF_8,
    )
    .unwrap();
    let comparison = compare(&left, &right, ComparatorConfig::default());
    let artifact = report::build(&comparison.matrix, &ReportOptions::default());
    let path = workspace.path().join("report.xlsx");
    report::write_xlsx(&artifact, &comparison.summary, &comparison.diagnostics, &path).unwrap();

    // Sorted rows pair 3/Carla with 4/Dan, so the third data row (sheet row 4)
    // disagrees on every column while the first data row agrees.
    let id_match = artifact.column_index("CUST_ID_Match").unwrap();
    assert!(artifact.is_highlighted(2, id_match));
    assert!(!artifact.is_highlighted(0, id_match));

    let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
    let workbook = read_entry(&mut archive, "xl/workbook.xml");
    for sheet in ["Comparison", "Summary", "Diagnostics"] {
        assert!(
            workbook.contains(&format!("name=\"{sheet}\"")),
            "missing sheet {sheet}"
        );
    }
    let styles = read_entry(&mut archive, "xl/styles.xml");
    assert!(styles.contains("FFFF00"), "no yellow fill in styles");
    assert!(styles.contains("patternType=\"solid\""));

    let comparison_sheet = read_entry(&mut archive, "xl/worksheets/sheet1.xml");
    let highlighted = cell_style(&comparison_sheet, "C4");
    assert!(highlighted.is_some(), "mismatch cell carries no style");
    assert_ne!(highlighted, cell_style(&comparison_sheet, "C2"));
}

#[test]
fn adjacent_wide_ids_disagree_and_render_exactly() {
    let workspace = TestWorkspace::new();
    let left_path = workspace.write("left.csv", "account_id\n9007199254740993\n12345678901234567891\n");
    let right_path = workspace.write("right.csv", "ACCOUNT_ID\n9007199254740992\n12345678901234567890\n");
    let left = snapshot::load_table(&left_path, "left", None, UTF_8).unwrap();
    let right = snapshot::load_table(&right_path, "right", None, UTF_8).unwrap();

    let comparison = compare(&left, &right, ComparatorConfig::default());
    let ids = comparison.matrix.get("account_id", "ACCOUNT_ID").expect("id pair");
    assert_eq!(ids.agrees, vec![false, false]);
    assert_eq!(comparison.summary.total_mismatches, 2);

    let artifact = report::build(&comparison.matrix, &ReportOptions::default());
    let left_column = artifact.column_index("account_id_Left").unwrap();
    let right_column = artifact.column_index("ACCOUNT_ID_Right").unwrap();
    let rendered = |row: usize, column: usize| match artifact.value(row, column) {
        Some(ReportValue::Cell(cell)) => cell.as_display(),
        other => panic!("unexpected report value {other:?}"),
    };
    assert_eq!(rendered(0, left_column), "9007199254740993");
    assert_eq!(rendered(0, right_column), "9007199254740992");
    assert_eq!(rendered(1, left_column), "12345678901234567891");
    assert_eq!(rendered(1, right_column), "12345678901234567890");
}

fn read_entry(archive: &mut zip::ZipArchive<File>, name: &str) -> String {
    let mut contents = String::new();
    archive
        .by_name(name)
        .unwrap_or_else(|err| panic!("{name} missing from workbook: {err}"))
        .read_to_string(&mut contents)
        .unwrap();
    contents
}

/// Style index attribute of the `<c r="..">` element for `reference`, if any.
fn cell_style(sheet_xml: &str, reference: &str) -> Option<String> {
    let start = sheet_xml
        .find(&format!("<c r=\"{reference}\""))
        .unwrap_or_else(|| panic!("cell {reference} not written"));
    let element = &sheet_xml[start..];
    let element = &element[..element.find('>').unwrap()];
    let attr = element.find(" s=\"")? + 4;
    let value = &element[attr..];
    Some(value[..value.find('"').unwrap()].to_string())
}

fn small_table(name: &str, headers: &[String], values: &[Vec<u8>]) -> Table {
    let rows = values
        .iter()
        .map(|row| row.iter().map(|v| Cell::from(i64::from(*v))).collect())
        .collect();
    Table::new(name, headers.to_vec(), rows).unwrap()
}

proptest! {
    #[test]
    fn agreement_matches_normalized_equality_within_extents(
        left_values in proptest::collection::vec(proptest::collection::vec(0u8..3, 2), 0..6),
        right_values in proptest::collection::vec(proptest::collection::vec(0u8..3, 2), 0..6),
    ) {
        let headers = vec!["a".to_string(), "b".to_string()];
        let left = small_table("l", &headers, &left_values);
        let right = small_table("r", &headers, &right_values);
        let comparison = compare(&left, &right, ComparatorConfig::default());
        let shorter = left_values.len().min(right_values.len());
        for pair in comparison.matrix.pairs() {
            prop_assert_eq!(pair.len(), left_values.len().max(right_values.len()));
            for idx in 0..pair.len() {
                if idx < shorter {
                    prop_assert_eq!(pair.agrees[idx], normalize(&pair.left[idx]) == normalize(&pair.right[idx]));
                } else {
                    prop_assert!(!pair.agrees[idx]);
                }
            }
        }
    }

    #[test]
    fn identical_headers_map_to_themselves(
        names in proptest::collection::btree_set("[a-z]{1,8}", 1..6),
    ) {
        let names = names.into_iter().collect::<Vec<_>>();
        let shouted = names.iter().map(|n| format!(" {} ", n.to_uppercase())).collect::<Vec<_>>();
        let mapping = matcher::match_columns(&shouted, &names, DEFAULT_SIMILARITY_CUTOFF).unwrap();
        prop_assert_eq!(mapping.len(), names.len());
        for (entry, name) in mapping.matched().iter().zip(&names) {
            prop_assert_eq!(&entry.right, name);
            prop_assert_eq!(entry.similarity, 1.0);
        }
    }
}
