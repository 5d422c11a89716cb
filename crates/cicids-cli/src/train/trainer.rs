use anyhow::{Context, Result};
use cicids_classifiers::artifacts::ArtifactStore;
use cicids_classifiers::io::flow_csv::read_flow_csv;
use cicids_classifiers::io::results::write_report;
use cicids_classifiers::pipeline::{Pipeline, PipelineReport};

use super::input::TrainConfig;

pub fn run_training(config: &TrainConfig) -> Result<PipelineReport> {
    let (data, summary) = read_flow_csv(&config.dataset, config.pipeline.n_features)
        .with_context(|| format!("Failed to load flows from {}", config.dataset))?;
    log::info!(
        "Loaded {} of {} rows from {} ({} malformed, {} non-finite dropped)",
        summary.rows_kept,
        summary.rows_read,
        config.dataset,
        summary.dropped_malformed,
        summary.dropped_non_finite
    );

    let store = ArtifactStore::new(&config.artifacts_dir);
    let pipeline = Pipeline::new(config.pipeline.clone(), store)?;
    let report = pipeline.run(&data).context("Pipeline run failed")?;

    let written = write_report(&report, &config.output_dir)
        .with_context(|| format!("Failed to write results to {}", config.output_dir))?;
    for path in &written {
        log::debug!("Wrote {:?}", path);
    }

    Ok(report)
}
