use thiserror::Error;

use crate::models::ClassifierKind;

/// Errors raised by a single classifier while fitting or predicting.
///
/// These are absorbed by the evaluation loop and recorded against the
/// (round, classifier) pair instead of aborting the run.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model has not been fitted")]
    NotFitted,
    #[error("cannot fit on an empty training set")]
    EmptyInput,
    #[error("features have {rows} rows but {labels} labels were given")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("label {0} is not binary (expected 0 or 1)")]
    InvalidLabel(i32),
    #[error("training data contains a single class ({0}); at least two are required")]
    SingleClass(i32),
    #[error("model was fitted on {expected} features but got {found}")]
    FeatureMismatch { expected: usize, found: usize },
    #[error("first boosting round is worse than random (weighted error {0:.4})")]
    WorseThanRandom(f64),
    #[error("numeric failure: {0}")]
    Numeric(String),
    #[error("solver failed: {0}")]
    Solver(String),
}

/// Errors raised by the on-disk artifact store.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("unknown artifact '{0}'")]
    UnknownArtifact(String),
    #[error("I/O failure on artifact '{id}'")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("artifact '{id}' could not be encoded or decoded")]
    Corrupt {
        id: String,
        #[source]
        source: bincode::Error,
    },
}

/// Structural failures that terminate a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("dataset is empty after filtering ({rows_read} rows read)")]
    EmptyDataset { rows_read: usize },
    #[error("expected {expected} columns per row, every row had a different width (last seen {found})")]
    SchemaMismatch { expected: usize, found: usize },
    #[error("feature matrix has {rows} rows but label vector has {labels}")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("split ratio must lie strictly between 0 and 1, got {0}")]
    InvalidRatio(f64),
    #[error("splitting {total} rows with ratio {ratio} leaves an empty partition")]
    EmptyPartition { total: usize, ratio: f64 },
    #[error(
        "minority class has {available} samples but SMOTE with k={k} neighbours needs at least {required}"
    )]
    InsufficientMinority {
        available: usize,
        required: usize,
        k: usize,
    },
    #[error("scaler was fitted on {expected} features but got {found}")]
    FeatureWidthMismatch { expected: usize, found: usize },
    #[error("grid search for {0} produced no successful candidate")]
    SearchFailed(ClassifierKind),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown classifier '{0}' (expected one of svc, ab, dt, rf, bnb, gnb)")]
    UnknownClassifier(String),
    #[error("feature vector on line {line} is invalid: {reason}")]
    InvalidFeatureVector { line: usize, reason: String },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
