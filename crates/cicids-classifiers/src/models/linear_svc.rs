use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_svm::{Svm, SvmParams};
use serde::{Deserialize, Serialize};

use crate::config::LinearSvcParams;
use crate::error::ModelError;
use crate::math::Array2;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_two_classes, check_width};

/// Linear-kernel support vector classifier backed by `linfa-svm`.
///
/// Attacks are the positive class. The same penalty `c` is applied to both
/// classes, since the training side is already balanced by SMOTE.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearSvc {
    params: LinearSvcParams,
    n_features: usize,
    model: Option<Svm<f64, bool>>,
}

impl LinearSvc {
    pub fn new(params: LinearSvcParams) -> Self {
        LinearSvc {
            params,
            n_features: 0,
            model: None,
        }
    }

    pub fn params(&self) -> &LinearSvcParams {
        &self.params
    }

    /// Number of support vectors kept by the fitted model.
    pub fn n_support_vectors(&self) -> Option<usize> {
        self.model.as_ref().map(Svm::nsupport)
    }

    fn fitted(&self, x: &Array2<f64>) -> Result<&Svm<f64, bool>, ModelError> {
        let model = self.model.as_ref().ok_or(ModelError::NotFitted)?;
        check_width(self.n_features, x)?;
        Ok(model)
    }
}

/// Copy a row-major matrix into the ndarray layout linfa expects.
fn to_ndarray(x: &Array2<f64>) -> Result<ndarray::Array2<f64>, ModelError> {
    ndarray::Array2::from_shape_vec(x.shape(), x.as_slice().to_vec())
        .map_err(|e| ModelError::Numeric(e.to_string()))
}

impl ClassifierModel for LinearSvc {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<(), ModelError> {
        check_two_classes(x, y)?;
        if !(self.params.c > 0.0) {
            return Err(ModelError::Numeric(format!(
                "C must be positive, got {}",
                self.params.c
            )));
        }

        let targets = ndarray::Array1::from_iter(y.iter().map(|&l| l == 1));
        let dataset = Dataset::new(to_ndarray(x)?, targets);

        let params: SvmParams<f64, bool> = Svm::<f64, bool>::params()
            .eps(self.params.eps)
            .shrinking(self.params.shrinking)
            .pos_neg_weights(self.params.c, self.params.c)
            .linear_kernel();

        let model = <SvmParams<f64, bool> as Fit<_, _, _>>::fit(&params, &dataset)
            .map_err(|e| ModelError::Solver(e.to_string()))?;
        log::debug!("[linear_svc] fitted with {} support vectors", model.nsupport());

        self.n_features = x.ncols();
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i32>, ModelError> {
        let model = self.fitted(x)?;
        let records = to_ndarray(x)?;
        let labels: ndarray::Array1<bool> = model.predict(&records);
        Ok(labels.iter().map(|&attack| i32::from(attack)).collect())
    }

    fn name(&self) -> &str {
        "linear_svc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Array2<f64>, Vec<i32>) {
        let x = Array2::from_shape_vec(
            (6, 2),
            vec![0.0, 0.1, 0.1, 0.0, 0.2, 0.2, 0.8, 0.9, 0.9, 0.8, 1.0, 1.0],
        )
        .unwrap();
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn separates_linearly_separable_points() {
        let (x, y) = separable();
        let params = LinearSvcParams {
            c: 100.0,
            ..LinearSvcParams::default()
        };
        let mut svc = LinearSvc::new(params);
        svc.fit(&x, &y).unwrap();

        assert_eq!(svc.predict(&x).unwrap(), y);
        assert!(svc.n_support_vectors().unwrap() > 0);
    }

    #[test]
    fn single_class_is_rejected() {
        let x = Array2::from_shape_vec((3, 1), vec![0.0, 0.5, 1.0]).unwrap();
        let mut svc = LinearSvc::new(LinearSvcParams::default());
        assert!(matches!(svc.fit(&x, &[1, 1, 1]), Err(ModelError::SingleClass(1))));
    }

    #[test]
    fn non_positive_penalty_is_rejected() {
        let (x, y) = separable();
        let params = LinearSvcParams {
            c: 0.0,
            ..LinearSvcParams::default()
        };
        assert!(matches!(LinearSvc::new(params).fit(&x, &y), Err(ModelError::Numeric(_))));
    }

    #[test]
    fn unfitted_model_cannot_predict() {
        let svc = LinearSvc::new(LinearSvcParams::default());
        let x = Array2::from_shape_vec((1, 1), vec![0.0]).unwrap();
        assert!(matches!(svc.predict(&x), Err(ModelError::NotFitted)));
    }

    #[test]
    fn fitted_model_survives_bincode() {
        let (x, y) = separable();
        let mut svc = LinearSvc::new(LinearSvcParams {
            c: 100.0,
            ..LinearSvcParams::default()
        });
        svc.fit(&x, &y).unwrap();

        let bytes = bincode::serialize(&svc).unwrap();
        let restored: LinearSvc = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.predict(&x).unwrap(), svc.predict(&x).unwrap());
    }
}
