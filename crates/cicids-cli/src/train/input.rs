use anyhow::{Context, Result};
use cicids_classifiers::config::PipelineConfig;
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::util::validate_csv_file;

/// Everything `cicids train` needs: where the data and outputs live, plus
/// the pipeline parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TrainConfig {
    /// Binarised flow CSV produced by `cicids prepare`.
    pub dataset: String,
    pub artifacts_dir: String,
    pub output_dir: String,
    pub pipeline: PipelineConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            dataset: String::from("CIC-IDS-2017.csv"),
            artifacts_dir: String::from("models"),
            output_dir: String::from("results"),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl TrainConfig {
    pub fn from_arguments(config_path: &PathBuf, matches: &ArgMatches) -> Result<Self> {
        let config_json = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let mut config: TrainConfig = serde_json::from_str(&config_json)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        // Apply CLI overrides
        if let Some(dataset) = matches.get_one::<String>("dataset") {
            config.dataset = dataset.clone();
        }
        validate_csv_file(&config.dataset)?;

        if let Some(artifacts_dir) = matches.get_one::<String>("artifacts") {
            config.artifacts_dir = artifacts_dir.clone();
        }

        if let Some(output_dir) = matches.get_one::<String>("output") {
            config.output_dir = output_dir.clone();
        }

        if let Some(&rounds) = matches.get_one::<usize>("rounds") {
            config.pipeline.rounds = rounds;
        }

        if matches.get_flag("no_tune") {
            config.pipeline.tune = false;
        }

        config
            .pipeline
            .validate()
            .context("Invalid pipeline configuration")?;

        Ok(config)
    }
}
