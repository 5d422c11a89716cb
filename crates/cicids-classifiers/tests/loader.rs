//! Integration tests for the flow CSV loader and raw dataset preparation.

mod common;

use std::fs;

use cicids_classifiers::io::cicids::{concatenate_and_binarize, label_statistics, write_label_report};
use cicids_classifiers::io::flow_csv::{parse_flow_records, read_flow_csv, LoadSummary};
use cicids_classifiers::PipelineError;

// ---------------------------------------------------------------------------
// read_flow_csv / parse_flow_records
// ---------------------------------------------------------------------------

#[test]
fn nan_row_is_dropped_and_the_rest_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flows.csv");
    fs::write(&path, "0.1,0.2,0\n0.3,0.4,1\n0.5,NaN,1\n0.7,0.8,0\n").unwrap();

    let (ds, summary) = read_flow_csv(&path, 2).unwrap();

    assert_eq!(ds.len(), 3);
    assert_eq!(ds.labels(), &[0, 1, 0]);
    assert_eq!(
        summary,
        LoadSummary {
            rows_read: 4,
            rows_kept: 3,
            dropped_malformed: 0,
            dropped_non_finite: 1,
        }
    );
}

#[test]
fn loaded_rows_are_finite_and_aligned() {
    let flows = common::synthetic_flows(10, 5, 1);
    let mut csv = common::to_csv(&flows);
    csv.push_str("inf,1,1,1,0\n1,2,3,-inf,1\n");

    let (ds, summary) = parse_flow_records(csv.as_bytes(), common::N_FEATURES).unwrap();

    assert_eq!(ds.len(), 15);
    assert_eq!(ds.x.nrows(), ds.labels().len());
    assert!(ds.x.all_finite());
    assert_eq!(summary.dropped_non_finite, 2);
    assert_eq!(ds.class_counts(), [10, 5]);
}

#[test]
fn whitespace_around_fields_is_ignored() {
    let (ds, _) = parse_flow_records(" 1 , 2 , 1 \n".as_bytes(), 2).unwrap();
    assert_eq!(ds.x.row_slice(0), &[1.0, 2.0]);
    assert_eq!(ds.labels(), &[1]);
}

#[test]
fn raw_header_row_is_not_a_flow() {
    // A raw file fed to the loader by mistake: every row has a text label.
    let raw = "Destination Port,Flow Duration,Label\n80,10,BENIGN\n";
    let err = parse_flow_records(raw.as_bytes(), 2).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyDataset { rows_read: 2 }));
}

#[test]
fn wrong_width_everywhere_is_a_schema_mismatch() {
    let err = parse_flow_records("1,2,3,0\n4,5,6,1\n".as_bytes(), 2).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch { expected: 3, found: 4 }));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = read_flow_csv("/nonexistent/flows.csv", 78).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
}

// ---------------------------------------------------------------------------
// concatenate_and_binarize / label_statistics
// ---------------------------------------------------------------------------

fn write_raw_days(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let monday = dir.join("Monday.csv");
    fs::write(
        &monday,
        " Destination Port, Flow Duration, Label\n80,100,BENIGN\n443,200,BENIGN\n",
    )
    .unwrap();

    let friday = dir.join("Friday.csv");
    fs::write(
        &friday,
        " Destination Port, Flow Duration, Label\n80,5,DDoS\n22,7,PortScan\n53,9, BENIGN\n",
    )
    .unwrap();

    vec![monday, friday]
}

#[test]
fn prepared_file_loads_with_binary_labels() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_raw_days(dir.path());
    let output = dir.path().join("CIC-IDS-2017.csv");

    let summary = concatenate_and_binarize(&inputs, &output).unwrap();
    assert_eq!(summary.files, 2);
    assert_eq!(summary.headers_skipped, 2);
    assert_eq!(summary.rows_written, 5);
    assert_eq!((summary.benign, summary.attack), (3, 2));

    let (ds, _) = read_flow_csv(&output, 2).unwrap();
    assert_eq!(ds.labels(), &[0, 0, 1, 1, 0]);
    assert_eq!(ds.x.row_slice(2), &[80.0, 5.0]);
}

#[test]
fn label_statistics_cover_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_raw_days(dir.path());

    let stats = label_statistics(&inputs).unwrap();
    assert_eq!(stats.counts.get("BENIGN"), Some(&3));
    assert_eq!(stats.counts.get("DDoS"), Some(&1));
    assert_eq!(stats.counts.get("PortScan"), Some(&1));
    assert_eq!(stats.non_benign(), 2);

    let mut report = Vec::new();
    write_label_report(&stats, &mut report).unwrap();
    let text = String::from_utf8(report).unwrap();
    assert!(text.starts_with("Detailed count:"));
    assert!(text.contains("BENIGN: 3 (60.0000%)"));
    assert!(text.contains("NON-BENIGN: 2 (40.0000%)"));
}
