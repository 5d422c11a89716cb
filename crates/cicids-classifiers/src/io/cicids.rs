//! Preparation of the raw CIC-IDS-2017 day files.
//!
//! The raw CSVs carry a header row and a textual `Label` column
//! (`BENIGN`, `DDoS`, `PortScan`, ...). Preparation concatenates them and
//! replaces the label with `0` for benign traffic and `1` for anything else.
//! Some attack names in the published files are not valid UTF-8, so records
//! are handled as bytes throughout.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;

use crate::error::Result;

pub const BENIGN_LABEL: &str = "BENIGN";
const HEADER_LABEL: &[u8] = b"Label";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrepareSummary {
    pub files: usize,
    pub rows_written: usize,
    pub benign: usize,
    pub attack: usize,
    pub headers_skipped: usize,
}

fn open_raw<P: AsRef<Path>>(path: P) -> Result<csv::Reader<File>> {
    let reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path.as_ref())?;
    Ok(reader)
}

fn last_field(record: &ByteRecord) -> Option<&[u8]> {
    record.len().checked_sub(1).and_then(|i| record.get(i))
}

/// Concatenate raw CSVs into one binarised flow CSV without a header.
pub fn concatenate_and_binarize<P, Q>(inputs: &[P], output: Q) -> Result<PrepareSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let out = BufWriter::new(File::create(output.as_ref())?);
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(out);

    let mut summary = PrepareSummary::default();
    let mut record = ByteRecord::new();
    let mut binarised = ByteRecord::new();

    for input in inputs {
        log::info!("Reading '{}'...", input.as_ref().display());
        let mut reader = open_raw(input)?;
        summary.files += 1;

        while reader.read_byte_record(&mut record)? {
            let Some(label) = last_field(&record) else {
                continue;
            };
            if label == HEADER_LABEL {
                summary.headers_skipped += 1;
                continue;
            }

            let is_benign = label == BENIGN_LABEL.as_bytes();
            binarised.clear();
            for field in record.iter().take(record.len() - 1) {
                binarised.push_field(field);
            }
            binarised.push_field(if is_benign { b"0" } else { b"1" });
            writer.write_byte_record(&binarised)?;

            summary.rows_written += 1;
            if is_benign {
                summary.benign += 1;
            } else {
                summary.attack += 1;
            }
        }
    }

    writer.flush()?;
    log::info!(
        "Wrote {} rows ({} benign, {} attack) from {} files to '{}'",
        summary.rows_written,
        summary.benign,
        summary.attack,
        summary.files,
        output.as_ref().display()
    );
    Ok(summary)
}

/// Label occurrence counts over a set of raw CSVs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelStatistics {
    pub counts: BTreeMap<String, usize>,
}

impl LabelStatistics {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn benign(&self) -> usize {
        self.counts.get(BENIGN_LABEL).copied().unwrap_or(0)
    }

    pub fn non_benign(&self) -> usize {
        self.total() - self.benign()
    }

    fn percent(&self, count: usize) -> f64 {
        match self.total() {
            0 => 0.0,
            total => count as f64 / total as f64 * 100.0,
        }
    }
}

/// Count every label in the raw files, skipping header rows.
pub fn label_statistics<P: AsRef<Path>>(inputs: &[P]) -> Result<LabelStatistics> {
    let mut stats = LabelStatistics::default();
    let mut record = ByteRecord::new();

    for input in inputs {
        log::info!("Reading '{}'...", input.as_ref().display());
        let mut reader = open_raw(input)?;
        while reader.read_byte_record(&mut record)? {
            let Some(label) = last_field(&record) else {
                continue;
            };
            if label == HEADER_LABEL {
                continue;
            }
            let label = String::from_utf8_lossy(label).into_owned();
            *stats.counts.entry(label).or_insert(0) += 1;
        }
    }

    Ok(stats)
}

/// Write the detailed and summary label counts as plain text.
pub fn write_label_report<W: Write>(stats: &LabelStatistics, mut out: W) -> Result<()> {
    writeln!(out, "Detailed count:\n")?;
    for (label, &count) in &stats.counts {
        writeln!(out, "{}: {} ({:.4}%)", label, count, stats.percent(count))?;
    }

    writeln!(out, "\nSummary count:\n")?;
    writeln!(
        out,
        "BENIGN: {} ({:.4}%)",
        stats.benign(),
        stats.percent(stats.benign())
    )?;
    writeln!(
        out,
        "NON-BENIGN: {} ({:.4}%)",
        stats.non_benign(),
        stats.percent(stats.non_benign())
    )?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_labels_and_summary() {
        let mut stats = LabelStatistics::default();
        stats.counts.insert("BENIGN".to_string(), 3);
        stats.counts.insert("DDoS".to_string(), 1);

        let mut buf = Vec::new();
        write_label_report(&stats, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("BENIGN: 3 (75.0000%)"));
        assert!(text.contains("DDoS: 1 (25.0000%)"));
        assert!(text.contains("NON-BENIGN: 1 (25.0000%)"));
    }

    #[test]
    fn empty_statistics_do_not_divide_by_zero() {
        let stats = LabelStatistics::default();
        assert_eq!(stats.percent(0), 0.0);
        assert_eq!(stats.non_benign(), 0);
    }
}
