use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub mod adaboost;
pub mod classifier_trait;
pub mod decision_tree;
pub mod factory;
pub mod linear_svc;
pub mod naive_bayes;
pub mod random_forest;
pub(crate) mod utils;

pub use classifier_trait::ClassifierModel;
pub use factory::{build_model, Classifier};

/// Identity of one of the six classifier families in the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    LinearSvc,
    AdaBoost,
    DecisionTree,
    RandomForest,
    BernoulliNb,
    GaussianNb,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 6] = [
        ClassifierKind::LinearSvc,
        ClassifierKind::AdaBoost,
        ClassifierKind::DecisionTree,
        ClassifierKind::RandomForest,
        ClassifierKind::BernoulliNb,
        ClassifierKind::GaussianNb,
    ];

    /// Short code used on the command line and in artifact names.
    pub fn code(&self) -> &'static str {
        match self {
            ClassifierKind::LinearSvc => "svc",
            ClassifierKind::AdaBoost => "ab",
            ClassifierKind::DecisionTree => "dt",
            ClassifierKind::RandomForest => "rf",
            ClassifierKind::BernoulliNb => "bnb",
            ClassifierKind::GaussianNb => "gnb",
        }
    }

    /// Stable artifact identity, e.g. `clf_rf`.
    pub fn artifact_id(&self) -> String {
        format!("clf_{}", self.code())
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ClassifierKind::LinearSvc => "Linear SVC",
            ClassifierKind::AdaBoost => "AdaBoost",
            ClassifierKind::DecisionTree => "Decision Tree",
            ClassifierKind::RandomForest => "Random Forest",
            ClassifierKind::BernoulliNb => "Bernoulli NB",
            ClassifierKind::GaussianNb => "Gaussian NB",
        }
    }

    /// Families that take part in the hyper-parameter search.
    pub fn is_tunable(&self) -> bool {
        matches!(
            self,
            ClassifierKind::LinearSvc
                | ClassifierKind::AdaBoost
                | ClassifierKind::DecisionTree
                | ClassifierKind::RandomForest
        )
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ClassifierKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        ClassifierKind::ALL
            .iter()
            .copied()
            .find(|k| k.code() == code || k.artifact_id() == code)
            .ok_or(PipelineError::UnknownClassifier(s.to_string()))
    }
}
