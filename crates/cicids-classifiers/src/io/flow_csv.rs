//! Reader for the binarised flow CSV (78 feature columns + 0/1 label).
//!
//! Rows are validated one at a time and dropped, never imputed, when they do
//! not fit the schema. I/O failures abort the read; anything else about a
//! row only increments a counter in `LoadSummary`.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

use crate::data_handling::FlowDataset;
use crate::error::{PipelineError, Result};
use crate::math::{Array1, Array2};

/// Counters describing what happened to each input row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped_malformed: usize,
    pub dropped_non_finite: usize,
}

enum RowOutcome {
    Kept(i32),
    Malformed,
    NonFinite,
}

/// Read a flow CSV from disk.
pub fn read_flow_csv<P: AsRef<Path>>(path: P, n_features: usize) -> Result<(FlowDataset, LoadSummary)> {
    let file = File::open(path.as_ref())?;
    log::info!("Reading flow records from {}", path.as_ref().display());
    parse_flow_records(file, n_features)
}

/// Parse comma-separated flow records with `n_features` feature columns
/// followed by one label column.
pub fn parse_flow_records<R: Read>(reader: R, n_features: usize) -> Result<(FlowDataset, LoadSummary)> {
    let expected_width = n_features + 1;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut summary = LoadSummary::default();
    let mut wrong_width = 0usize;
    let mut last_width = 0usize;

    let mut features = Array2::empty(n_features);
    let mut labels = Vec::new();
    let mut row = vec![0.0f64; n_features];
    let mut record = StringRecord::new();

    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.is_io_error() => return Err(PipelineError::Csv(e)),
            Err(e) => {
                summary.rows_read += 1;
                summary.dropped_malformed += 1;
                log::trace!("Dropping unreadable record: {}", e);
                continue;
            }
        }
        summary.rows_read += 1;

        if record.len() != expected_width {
            wrong_width += 1;
            last_width = record.len();
            summary.dropped_malformed += 1;
            continue;
        }

        match parse_row(&record, &mut row) {
            RowOutcome::Kept(label) => {
                features.push_row(&row);
                labels.push(label);
                summary.rows_kept += 1;
            }
            RowOutcome::Malformed => summary.dropped_malformed += 1,
            RowOutcome::NonFinite => summary.dropped_non_finite += 1,
        }
    }

    if summary.rows_read > 0 && wrong_width == summary.rows_read {
        return Err(PipelineError::SchemaMismatch {
            expected: expected_width,
            found: last_width,
        });
    }
    if summary.rows_kept == 0 {
        return Err(PipelineError::EmptyDataset {
            rows_read: summary.rows_read,
        });
    }

    if summary.dropped_malformed > 0 || summary.dropped_non_finite > 0 {
        log::warn!(
            "Dropped {} malformed and {} non-finite rows out of {}",
            summary.dropped_malformed,
            summary.dropped_non_finite,
            summary.rows_read
        );
    }
    log::info!(
        "Loaded {} flows x {} features",
        summary.rows_kept,
        n_features
    );

    let dataset = FlowDataset::new(features, Array1::from_vec(labels))?;
    Ok((dataset, summary))
}

fn parse_row(record: &StringRecord, row: &mut [f64]) -> RowOutcome {
    let n_features = row.len();
    let mut non_finite = false;

    for (slot, token) in row.iter_mut().zip(record.iter().take(n_features)) {
        match token.parse::<f64>() {
            Ok(v) => {
                non_finite |= !v.is_finite();
                *slot = v;
            }
            Err(_) => return RowOutcome::Malformed,
        }
    }

    let label = match record.get(n_features).map(str::parse::<f64>) {
        Some(Ok(v)) => v,
        _ => return RowOutcome::Malformed,
    };
    if non_finite || !label.is_finite() {
        return RowOutcome::NonFinite;
    }

    if label == 0.0 {
        RowOutcome::Kept(0)
    } else if label == 1.0 {
        RowOutcome::Kept(1)
    } else {
        RowOutcome::Malformed
    }
}
