//! cicids-classifiers: intrusion classifiers for CIC-IDS-2017 flow features.
//!
//! This crate loads binarised flow records, partitions and balances them
//! (SMOTE), scales features (min-max), tunes and evaluates six classifier
//! families over repeated rounds, and persists the fitted scaler and models
//! so they can score unseen flows later.
//!
//! The classifiers are implemented in-crate on the small `math` arrays and
//! share the `ClassifierModel` trait, so the evaluation loop and the grid
//! search work with any implementation of it.
pub mod artifacts;
pub mod balancing;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod inference;
pub mod io;
pub mod math;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod stats;
pub mod tuning;

pub use error::{ArtifactError, ModelError, PipelineError};
