use crate::error::ModelError;
use crate::math::Array2;

/// Capability shared by every classifier family in the roster.
///
/// Labels follow the crate convention: 0 for benign flows, 1 for attacks.
/// The evaluation loop and the grid search are generic over this trait, so
/// any implementation can be evaluated and persisted the same way.
pub trait ClassifierModel {
    /// Fit the model on scaled features and binary labels.
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<(), ModelError>;

    /// Predict one binary label per row.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i32>, ModelError>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }

    /// Normalized per-feature importances, for models that expose them.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}
