use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PipelineError;
use crate::models::ClassifierKind;

/// Hyper-parameters of the linear-kernel support vector classifier.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LinearSvcParams {
    /// Penalty on margin violations, applied to both classes.
    pub c: f64,
    /// Stopping tolerance of the SMO solver.
    pub eps: f64,
    pub shrinking: bool,
}

impl Default for LinearSvcParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            eps: 1e-3,
            shrinking: true,
        }
    }
}

/// Hyper-parameters of a single CART tree (gini impurity).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TreeParams {
    /// `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features drawn per split; `None` considers all.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AdaBoostParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Depth of each weak learner; 1 gives decision stumps.
    pub max_depth: usize,
}

impl Default for AdaBoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 1.0,
            max_depth: 1,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn per split; `None` uses `sqrt(n_features)`.
    pub max_features: Option<usize>,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 10,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BernoulliNbParams {
    /// Additive (Laplace) smoothing.
    pub alpha: f64,
    /// Threshold above which a feature counts as present.
    pub binarize: f64,
}

impl Default for BernoulliNbParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            binarize: 0.0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GaussianNbParams {
    /// Fraction of the largest feature variance added to every variance.
    pub var_smoothing: f64,
}

impl Default for GaussianNbParams {
    fn default() -> Self {
        Self {
            var_smoothing: 1e-9,
        }
    }
}

/// Supported classifier families and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    LinearSvc(LinearSvcParams),
    AdaBoost(AdaBoostParams),
    DecisionTree(TreeParams),
    RandomForest(ForestParams),
    BernoulliNb(BernoulliNbParams),
    GaussianNb(GaussianNbParams),
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::DecisionTree(TreeParams::default())
    }
}

impl ModelType {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            ModelType::LinearSvc(_) => ClassifierKind::LinearSvc,
            ModelType::AdaBoost(_) => ClassifierKind::AdaBoost,
            ModelType::DecisionTree(_) => ClassifierKind::DecisionTree,
            ModelType::RandomForest(_) => ClassifierKind::RandomForest,
            ModelType::BernoulliNb(_) => ClassifierKind::BernoulliNb,
            ModelType::GaussianNb(_) => ClassifierKind::GaussianNb,
        }
    }

    /// Default hyper-parameters for a family.
    pub fn default_for(kind: ClassifierKind) -> Self {
        match kind {
            ClassifierKind::LinearSvc => ModelType::LinearSvc(LinearSvcParams::default()),
            ClassifierKind::AdaBoost => ModelType::AdaBoost(AdaBoostParams::default()),
            ClassifierKind::DecisionTree => ModelType::DecisionTree(TreeParams::default()),
            ClassifierKind::RandomForest => ModelType::RandomForest(ForestParams::default()),
            ClassifierKind::BernoulliNb => ModelType::BernoulliNb(BernoulliNbParams::default()),
            ClassifierKind::GaussianNb => ModelType::GaussianNb(GaussianNbParams::default()),
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<ClassifierKind>()
            .map(ModelType::default_for)
            .map_err(|e| e.to_string())
    }
}

/// Central configuration for one classifier in the roster.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ModelConfig {
    /// Seed for stochastic learners (tree feature draws, forest bootstraps).
    /// `None` draws a fresh seed whenever the model is built.
    #[serde(default)]
    pub seed: Option<u64>,

    pub model_type: ModelType,
}

impl ModelConfig {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            seed: None,
            model_type,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn kind(&self) -> ClassifierKind {
        self.model_type.kind()
    }
}

/// Value lists explored by the grid search for one tunable family.
///
/// Candidates are the Cartesian product of the lists, enumerated with the
/// first field as the outermost loop.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum SearchSpace {
    LinearSvc {
        c: Vec<f64>,
    },
    AdaBoost {
        n_estimators: Vec<usize>,
        learning_rate: Vec<f64>,
    },
    DecisionTree {
        max_depth: Vec<Option<usize>>,
        min_samples_split: Vec<usize>,
    },
    RandomForest {
        n_estimators: Vec<usize>,
        max_depth: Vec<Option<usize>>,
    },
}

impl SearchSpace {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            SearchSpace::LinearSvc { .. } => ClassifierKind::LinearSvc,
            SearchSpace::AdaBoost { .. } => ClassifierKind::AdaBoost,
            SearchSpace::DecisionTree { .. } => ClassifierKind::DecisionTree,
            SearchSpace::RandomForest { .. } => ClassifierKind::RandomForest,
        }
    }

    /// Expand the grid around `base`, overriding only the searched fields.
    pub fn candidates(&self, base: &ModelConfig) -> Result<Vec<ModelConfig>, PipelineError> {
        let with = |model_type: ModelType| ModelConfig {
            seed: base.seed,
            model_type,
        };

        let candidates = match (self, &base.model_type) {
            (SearchSpace::LinearSvc { c }, ModelType::LinearSvc(p)) => c
                .iter()
                .map(|&c| with(ModelType::LinearSvc(LinearSvcParams { c, ..p.clone() })))
                .collect(),
            (
                SearchSpace::AdaBoost {
                    n_estimators,
                    learning_rate,
                },
                ModelType::AdaBoost(p),
            ) => {
                let mut out = Vec::new();
                for &n in n_estimators {
                    for &lr in learning_rate {
                        out.push(with(ModelType::AdaBoost(AdaBoostParams {
                            n_estimators: n,
                            learning_rate: lr,
                            ..p.clone()
                        })));
                    }
                }
                out
            }
            (
                SearchSpace::DecisionTree {
                    max_depth,
                    min_samples_split,
                },
                ModelType::DecisionTree(p),
            ) => {
                let mut out = Vec::new();
                for &depth in max_depth {
                    for &split in min_samples_split {
                        out.push(with(ModelType::DecisionTree(TreeParams {
                            max_depth: depth,
                            min_samples_split: split,
                            ..p.clone()
                        })));
                    }
                }
                out
            }
            (
                SearchSpace::RandomForest {
                    n_estimators,
                    max_depth,
                },
                ModelType::RandomForest(p),
            ) => {
                let mut out = Vec::new();
                for &n in n_estimators {
                    for &depth in max_depth {
                        out.push(with(ModelType::RandomForest(ForestParams {
                            n_estimators: n,
                            max_depth: depth,
                            ..p.clone()
                        })));
                    }
                }
                out
            }
            (space, other) => {
                return Err(PipelineError::InvalidConfig(format!(
                    "search space for {} cannot tune a {} model",
                    space.kind(),
                    other.kind()
                )))
            }
        };

        Ok(candidates)
    }

    pub fn default_spaces() -> Vec<SearchSpace> {
        vec![
            SearchSpace::LinearSvc {
                c: vec![0.1, 1.0, 10.0, 100.0],
            },
            SearchSpace::AdaBoost {
                n_estimators: vec![50, 100],
                learning_rate: vec![0.5, 1.0],
            },
            SearchSpace::DecisionTree {
                max_depth: vec![None, Some(10), Some(20)],
                min_samples_split: vec![2, 5],
            },
            SearchSpace::RandomForest {
                n_estimators: vec![10, 50],
                max_depth: vec![None, Some(20)],
            },
        ]
    }
}

/// Default roster: the six families in reporting order.
pub fn default_roster() -> Vec<ModelConfig> {
    ClassifierKind::ALL
        .iter()
        .map(|&kind| match kind {
            ClassifierKind::LinearSvc => ModelConfig::new(ModelType::LinearSvc(LinearSvcParams {
                c: 100.0,
                ..LinearSvcParams::default()
            })),
            other => ModelConfig::new(ModelType::default_for(other)),
        })
        .collect()
}

/// Parameters of a complete training/evaluation run.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Feature columns per record (the label column comes after them).
    pub n_features: usize,
    /// Number of evaluation rounds.
    pub rounds: usize,
    /// Fraction of rows held out as the test partition.
    pub test_ratio: f64,
    /// Fraction of the training side held out for validation; 0 disables it.
    pub validation_ratio: f64,
    /// Seed for the tuning split, tuning SMOTE and cross-validation folds.
    pub seed: u64,
    /// When set, round `t` splits and balances with `round_seed + t`
    /// instead of fresh entropy.
    pub round_seed: Option<u64>,
    pub smote_neighbors: usize,
    pub cv_folds: usize,
    pub tune: bool,
    /// Load classifiers that already have an artifact instead of retraining.
    pub reuse_artifacts: bool,
    pub classifiers: Vec<ModelConfig>,
    pub search_spaces: Vec<SearchSpace>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            n_features: 78,
            rounds: 15,
            test_ratio: 0.33,
            validation_ratio: 0.10,
            seed: 12,
            round_seed: None,
            smote_neighbors: 5,
            cv_folds: 3,
            tune: true,
            reuse_artifacts: true,
            classifiers: default_roster(),
            search_spaces: SearchSpace::default_spaces(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if self.n_features == 0 {
            return invalid("n_features must be positive".to_string());
        }
        if self.rounds == 0 {
            return invalid("rounds must be positive".to_string());
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(PipelineError::InvalidRatio(self.test_ratio));
        }
        if !(0.0..1.0).contains(&self.validation_ratio) {
            return Err(PipelineError::InvalidRatio(self.validation_ratio));
        }
        if self.smote_neighbors == 0 {
            return invalid("smote_neighbors must be positive".to_string());
        }
        if self.cv_folds < 2 {
            return invalid(format!("cv_folds must be at least 2, got {}", self.cv_folds));
        }
        if self.classifiers.is_empty() {
            return invalid("classifier roster is empty".to_string());
        }

        let mut seen = Vec::new();
        for cfg in &self.classifiers {
            if seen.contains(&cfg.kind()) {
                return invalid(format!("{} appears twice in the roster", cfg.kind()));
            }
            seen.push(cfg.kind());
        }

        for space in &self.search_spaces {
            if !space.kind().is_tunable() {
                return invalid(format!("{} is not a tunable family", space.kind()));
            }
        }

        Ok(())
    }

    pub fn search_space_for(&self, kind: ClassifierKind) -> Option<&SearchSpace> {
        self.search_spaces.iter().find(|s| s.kind() == kind)
    }
}
