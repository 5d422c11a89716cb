use anyhow::{Context, Result};
use cicids_classifiers::io::cicids::{concatenate_and_binarize, label_statistics, write_label_report};
use std::path::{Path, PathBuf};

use crate::util::{open_output, validate_csv_file};

fn validate_inputs(inputs: &[PathBuf]) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("At least one input CSV is required");
    }
    for input in inputs {
        validate_csv_file(&input.to_string_lossy())?;
    }
    Ok(())
}

/// Merge raw daily CSVs into one binarised flow file.
pub fn run_prepare(inputs: &[PathBuf], output: &Path) -> Result<()> {
    validate_inputs(inputs)?;
    let summary = concatenate_and_binarize(inputs, output)
        .with_context(|| format!("Failed to prepare {:?}", output))?;
    if summary.headers_skipped != summary.files {
        log::warn!(
            "Expected one header row per file, skipped {} across {} files",
            summary.headers_skipped,
            summary.files
        );
    }
    Ok(())
}

/// Count raw labels across `inputs` and write the report.
pub fn run_stats(inputs: &[PathBuf], output: Option<&Path>) -> Result<()> {
    validate_inputs(inputs)?;
    let stats = label_statistics(inputs).context("Failed to count labels")?;
    let out = open_output(output)?;
    write_label_report(&stats, out).context("Failed to write label report")?;
    log::info!("Counted {} rows over {} labels", stats.total(), stats.counts.len());
    Ok(())
}
