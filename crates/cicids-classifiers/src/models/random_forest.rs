use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ForestParams, TreeParams};
use crate::error::ModelError;
use crate::math::Array2;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::decision_tree::Tree;
use crate::models::utils::{check_training_set, check_width, normalize, resolve_seed};

/// Bagged ensemble of CART trees grown in parallel.
///
/// Tree `i` draws its bootstrap sample and feature subsets from a generator
/// seeded with `seed + i`, so a seeded forest is reproducible regardless of
/// how rayon schedules the trees.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: ForestParams,
    seed: u64,
    trees: Vec<Tree>,
    n_features: usize,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams, seed: Option<u64>) -> Self {
        RandomForestClassifier {
            params,
            seed: resolve_seed(seed),
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn tree_params(&self, n_features: usize) -> TreeParams {
        let default_features = ((n_features as f64).sqrt().floor() as usize).max(1);
        TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: Some(self.params.max_features.unwrap_or(default_features)),
        }
    }

    /// Mean positive fraction over all trees, one value per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        check_width(self.n_features, x)?;

        let n_trees = self.trees.len() as f64;
        let proba = x
            .rows()
            .map(|row| {
                self.trees
                    .iter()
                    .map(|t| t.positive_fraction(row))
                    .sum::<f64>()
                    / n_trees
            })
            .collect();
        Ok(proba)
    }
}

impl ClassifierModel for RandomForestClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<(), ModelError> {
        check_training_set(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(ModelError::Numeric(
                "random forest needs at least one estimator".to_string(),
            ));
        }

        let n = x.nrows();
        let params = self.tree_params(x.ncols());
        let weights = vec![1.0; n];
        let bootstrap = self.params.bootstrap;
        let seed = self.seed;

        let trees: Vec<Tree> = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let indices: Vec<usize> = if bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                Tree::grow(x, y, &weights, indices, &params, &mut rng)
            })
            .collect();

        log::debug!(
            "[random_forest] grew {} trees on {} rows x {} features",
            trees.len(),
            n,
            x.ncols()
        );

        self.trees = trees;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i32>, ModelError> {
        let proba = self.predict_proba(x)?;
        Ok(proba.into_iter().map(|p| if p > 0.5 { 1 } else { 0 }).collect())
    }

    fn name(&self) -> &str {
        "random_forest"
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            let mut per_tree = tree.importances().to_vec();
            normalize(&mut per_tree);
            for (acc, v) in total.iter_mut().zip(per_tree) {
                *acc += v;
            }
        }
        normalize(&mut total);
        Some(total)
    }
}
