//! Batch scoring of unseen flow vectors with persisted artifacts.
use std::io::{BufRead, Write};
use std::time::Instant;

use crate::artifacts::{ArtifactStore, SCALER_ARTIFACT};
use crate::error::{PipelineError, Result};
use crate::math::Array2;
use crate::models::{Classifier, ClassifierKind, ClassifierModel};
use crate::preprocessing::MinMaxScaler;

/// Labels for a batch plus the time spent in `predict` alone.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutput {
    pub labels: Vec<i32>,
    pub predict_secs: f64,
}

/// Parse whitespace-separated vectors, one per non-blank line.
///
/// Any line with the wrong number of values, an unparsable token or a
/// non-finite value rejects the whole batch.
pub fn parse_feature_vectors<R: BufRead>(reader: R, n_features: usize) -> Result<Array2<f64>> {
    let mut x = Array2::empty(n_features);
    let mut row = Vec::with_capacity(n_features);

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        row.clear();
        for token in line.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| PipelineError::InvalidFeatureVector {
                line: line_no,
                reason: format!("'{}' is not a number", token),
            })?;
            if !value.is_finite() {
                return Err(PipelineError::InvalidFeatureVector {
                    line: line_no,
                    reason: format!("'{}' is not finite", token),
                });
            }
            row.push(value);
        }

        if row.len() != n_features {
            return Err(PipelineError::InvalidFeatureVector {
                line: line_no,
                reason: format!("expected {} values, found {}", n_features, row.len()),
            });
        }
        x.push_row(&row);
    }

    Ok(x)
}

/// Load the classifier persisted for `kind`.
pub fn load_classifier(store: &ArtifactStore, kind: ClassifierKind) -> Result<Classifier> {
    let classifier: Classifier = store.load(&kind.artifact_id())?;
    if classifier.kind() != kind {
        return Err(PipelineError::InvalidConfig(format!(
            "artifact '{}' holds a {} model, expected {}",
            kind.artifact_id(),
            classifier.kind(),
            kind
        )));
    }
    Ok(classifier)
}

/// Score every vector read from `input` with the classifier named by `code`.
pub fn predict_vectors<R: BufRead>(store: &ArtifactStore, code: &str, input: R) -> Result<InferenceOutput> {
    let kind: ClassifierKind = code.parse()?;
    let classifier = load_classifier(store, kind)?;
    let scaler: MinMaxScaler = store.load(SCALER_ARTIFACT)?;

    let x = parse_feature_vectors(input, scaler.n_features())?;
    let scaled = scaler.transform(&x)?;
    log::info!("Scoring {} vectors with {}", scaled.nrows(), kind);

    let start = Instant::now();
    let labels = if scaled.is_empty() {
        Vec::new()
    } else {
        classifier.predict(&scaled)?
    };
    let predict_secs = start.elapsed().as_secs_f64();

    Ok(InferenceOutput {
        labels,
        predict_secs,
    })
}

/// Write one label per line.
pub fn write_labels<W: Write>(labels: &[i32], mut out: W) -> Result<()> {
    for label in labels {
        writeln!(out, "{}", label)?;
    }
    out.flush()?;
    Ok(())
}
