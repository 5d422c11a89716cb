use anyhow::{Context, Result};
use cicids_classifiers::artifacts::ArtifactStore;
use cicids_classifiers::inference::{predict_vectors, write_labels};
use std::path::PathBuf;

use crate::util::{open_input, open_output};

#[derive(Debug, Clone)]
pub struct PredictArgs {
    /// Short classifier code (`svc`, `ab`, `dt`, `rf`, `bnb`, `gnb`).
    pub code: String,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub artifacts_dir: PathBuf,
}

/// Score the input vectors and return the prediction time in seconds.
pub fn run_predict(args: &PredictArgs) -> Result<f64> {
    let store = ArtifactStore::new(&args.artifacts_dir);
    let input = open_input(args.input.as_deref())?;

    let output = predict_vectors(&store, &args.code, input)
        .with_context(|| format!("Failed to score vectors with '{}'", args.code))?;

    let out = open_output(args.output.as_deref())?;
    write_labels(&output.labels, out).context("Failed to write labels")?;

    log::info!("Predicted {} labels", output.labels.len());
    Ok(output.predict_secs)
}
