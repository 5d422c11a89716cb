use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::{AdaBoostParams, TreeParams};
use crate::error::ModelError;
use crate::math::Array2;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::decision_tree::Tree;
use crate::models::utils::{check_training_set, check_width, normalize, resolve_seed};

/// Discrete AdaBoost (SAMME, two classes) over shallow CART trees.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    params: AdaBoostParams,
    seed: u64,
    estimators: Vec<Tree>,
    estimator_weights: Vec<f64>,
    n_features: usize,
}

impl AdaBoostClassifier {
    pub fn new(params: AdaBoostParams, seed: Option<u64>) -> Self {
        AdaBoostClassifier {
            params,
            seed: resolve_seed(seed),
            estimators: Vec::new(),
            estimator_weights: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &AdaBoostParams {
        &self.params
    }

    /// Number of weak learners kept after early stopping.
    pub fn n_estimators_fitted(&self) -> usize {
        self.estimators.len()
    }

    pub fn estimator_weights(&self) -> &[f64] {
        &self.estimator_weights
    }

    /// Signed ensemble vote; positive means attack.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        if self.estimators.is_empty() {
            return Err(ModelError::NotFitted);
        }
        check_width(self.n_features, x)?;

        Ok(x.rows()
            .map(|row| {
                self.estimators
                    .iter()
                    .zip(&self.estimator_weights)
                    .map(|(tree, alpha)| if tree.predict_row(row) == 1 { *alpha } else { -*alpha })
                    .sum()
            })
            .collect())
    }
}

impl ClassifierModel for AdaBoostClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<(), ModelError> {
        check_training_set(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(ModelError::Numeric(
                "AdaBoost needs at least one estimator".to_string(),
            ));
        }
        if !(self.params.learning_rate > 0.0) {
            return Err(ModelError::Numeric(format!(
                "learning rate must be positive, got {}",
                self.params.learning_rate
            )));
        }

        let n = x.nrows();
        let tree_params = TreeParams {
            max_depth: Some(self.params.max_depth.max(1)),
            ..TreeParams::default()
        };
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut weights = vec![1.0 / n as f64; n];

        let mut estimators = Vec::new();
        let mut alphas = Vec::new();

        for round in 0..self.params.n_estimators {
            let tree = Tree::grow(x, y, &weights, (0..n).collect(), &tree_params, &mut rng);
            let missed: Vec<bool> = x
                .rows()
                .zip(y)
                .map(|(row, &label)| tree.predict_row(row) != label)
                .collect();

            let total: f64 = weights.iter().sum();
            let error: f64 = weights
                .iter()
                .zip(&missed)
                .filter(|&(_, &m)| m)
                .map(|(w, _)| w)
                .sum::<f64>()
                / total;

            if error <= 0.0 {
                estimators.push(tree);
                alphas.push(1.0);
                log::debug!("[adaboost] perfect fit at round {}, stopping", round);
                break;
            }
            if error >= 0.5 {
                if estimators.is_empty() {
                    return Err(ModelError::WorseThanRandom(error));
                }
                log::debug!("[adaboost] round {} error {:.4} >= 0.5, stopping", round, error);
                break;
            }

            let alpha = self.params.learning_rate * ((1.0 - error) / error).ln();
            for (w, &m) in weights.iter_mut().zip(&missed) {
                if m {
                    *w *= alpha.exp();
                }
            }
            normalize(&mut weights);

            estimators.push(tree);
            alphas.push(alpha);
        }

        self.estimators = estimators;
        self.estimator_weights = alphas;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i32>, ModelError> {
        let scores = self.decision_function(x)?;
        Ok(scores.into_iter().map(|s| if s > 0.0 { 1 } else { 0 }).collect())
    }

    fn name(&self) -> &str {
        "adaboost"
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.estimators.is_empty() {
            return None;
        }
        let mut total = vec![0.0; self.n_features];
        for (tree, alpha) in self.estimators.iter().zip(&self.estimator_weights) {
            let mut per_tree = tree.importances().to_vec();
            normalize(&mut per_tree);
            for (acc, v) in total.iter_mut().zip(per_tree) {
                *acc += alpha * v;
            }
        }
        normalize(&mut total);
        Some(total)
    }
}
