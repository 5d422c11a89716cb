//! CART decision tree with gini impurity.
//!
//! The `Tree` grower is shared by the single-tree classifier, the random
//! forest (bootstrap indices + feature subsampling) and AdaBoost (sample
//! weights), so all three agree on split semantics: a row goes left when
//! `x[feature] <= threshold`.
use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::TreeParams;
use crate::error::ModelError;
use crate::math::Array2;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_training_set, check_width, normalize, resolve_seed};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) enum Node {
    Leaf {
        positive_fraction: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A grown tree. Importances are raw weighted impurity decreases.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
    n_features: usize,
    importances: Vec<f64>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    cost: f64,
}

fn gini(positive: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = positive / total;
    2.0 * p * (1.0 - p)
}

struct Grower<'a> {
    x: &'a Array2<f64>,
    y: &'a [i32],
    weights: &'a [f64],
    params: &'a TreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl<'a> Grower<'a> {
    fn grow_node(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let mut w_total = 0.0;
        let mut w_positive = 0.0;
        let mut positives = 0usize;
        for &i in &indices {
            w_total += self.weights[i];
            if self.y[i] == 1 {
                w_positive += self.weights[i];
                positives += 1;
            }
        }

        let node_id = self.nodes.len();
        let positive_fraction = if w_total > 0.0 {
            w_positive / w_total
        } else {
            0.0
        };
        self.nodes.push(Node::Leaf { positive_fraction });

        let pure = positives == 0 || positives == indices.len();
        let depth_exhausted = self.params.max_depth.map_or(false, |d| depth >= d);
        if pure || depth_exhausted || indices.len() < self.params.min_samples_split.max(2) {
            return node_id;
        }

        let Some(split) = self.best_split(&indices, w_total, w_positive) else {
            return node_id;
        };

        let parent_cost = w_total * gini(w_positive, w_total);
        self.importances[split.feature] += (parent_cost - split.cost).max(0.0);

        let x = self.x;
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[(i, split.feature)] <= split.threshold);

        let left = self.grow_node(left_idx, depth + 1);
        let right = self.grow_node(right_idx, depth + 1);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    /// Search up to `max_features` non-constant features for the best split.
    ///
    /// Features are visited in a random order when subsampling. Features that
    /// are constant over `indices` do not use up the budget, so a node only
    /// becomes a leaf here when no remaining feature can split it.
    fn best_split(&mut self, indices: &[usize], w_total: f64, w_positive: f64) -> Option<SplitCandidate> {
        let n_features = self.x.ncols();
        let mut features: Vec<usize> = (0..n_features).collect();
        let budget = match self.params.max_features {
            Some(m) if m < n_features => {
                features.shuffle(&mut *self.rng);
                m.max(1)
            }
            _ => n_features,
        };
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut best: Option<SplitCandidate> = None;
        let mut column: Vec<(f64, i32, f64)> = Vec::with_capacity(indices.len());
        let mut searched = 0usize;

        for feature in features {
            if searched == budget {
                break;
            }
            column.clear();
            column.extend(
                indices
                    .iter()
                    .map(|&i| (self.x[(i, feature)], self.y[i], self.weights[i])),
            );
            column.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            let n = column.len();
            if column[0].0 == column[n - 1].0 {
                continue;
            }
            searched += 1;

            let mut w_left = 0.0;
            let mut w_left_positive = 0.0;
            for k in 0..n - 1 {
                let (value, label, weight) = column[k];
                w_left += weight;
                if label == 1 {
                    w_left_positive += weight;
                }

                let n_left = k + 1;
                if n_left < min_leaf || n - n_left < min_leaf {
                    continue;
                }
                let next = column[k + 1].0;
                if value >= next {
                    continue;
                }

                let w_right = w_total - w_left;
                let w_right_positive = w_positive - w_left_positive;
                let cost = w_left * gini(w_left_positive, w_left)
                    + w_right * gini(w_right_positive, w_right);

                if best.as_ref().map_or(true, |b| cost < b.cost - 1e-12) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        cost,
                    });
                }
            }
        }

        best
    }
}

impl Tree {
    /// Grow a tree over `indices` (which may repeat rows, as in a bootstrap).
    pub(crate) fn grow(
        x: &Array2<f64>,
        y: &[i32],
        weights: &[f64],
        indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Tree {
        let mut grower = Grower {
            x,
            y,
            weights,
            params,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; x.ncols()],
        };
        grower.grow_node(indices, 0);

        Tree {
            nodes: grower.nodes,
            n_features: x.ncols(),
            importances: grower.importances,
        }
    }

    pub(crate) fn n_features(&self) -> usize {
        self.n_features
    }

    pub(crate) fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub(crate) fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    pub(crate) fn positive_fraction(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { positive_fraction } => return *positive_fraction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub(crate) fn predict_row(&self, row: &[f64]) -> i32 {
        if self.positive_fraction(row) > 0.5 {
            1
        } else {
            0
        }
    }
}

/// Single decision tree classifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    params: TreeParams,
    seed: u64,
    tree: Option<Tree>,
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams, seed: Option<u64>) -> Self {
        DecisionTreeClassifier {
            params,
            seed: resolve_seed(seed),
            tree: None,
        }
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    /// Depth of the fitted tree, `None` before fitting.
    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(Tree::depth)
    }
}

impl ClassifierModel for DecisionTreeClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<(), ModelError> {
        check_training_set(x, y)?;
        let weights = vec![1.0; x.nrows()];
        let mut rng = StdRng::seed_from_u64(self.seed);
        let tree = Tree::grow(x, y, &weights, (0..x.nrows()).collect(), &self.params, &mut rng);
        self.tree = Some(tree);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i32>, ModelError> {
        let tree = self.tree.as_ref().ok_or(ModelError::NotFitted)?;
        check_width(tree.n_features(), x)?;
        Ok(x.rows().map(|row| tree.predict_row(row)).collect())
    }

    fn name(&self) -> &str {
        "decision_tree"
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        let mut importances = self.tree.as_ref()?.importances().to_vec();
        normalize(&mut importances);
        Some(importances)
    }
}
