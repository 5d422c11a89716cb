use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, ModelType};
use crate::error::ModelError;
use crate::math::Array2;
use crate::models::adaboost::AdaBoostClassifier;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::decision_tree::DecisionTreeClassifier;
use crate::models::linear_svc::LinearSvc;
use crate::models::naive_bayes::{BernoulliNb, GaussianNb};
use crate::models::random_forest::RandomForestClassifier;
use crate::models::ClassifierKind;

/// Any roster classifier, as one serialisable value.
///
/// Artifacts store this enum, so a loaded model knows its own family.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Classifier {
    LinearSvc(LinearSvc),
    AdaBoost(AdaBoostClassifier),
    DecisionTree(DecisionTreeClassifier),
    RandomForest(RandomForestClassifier),
    BernoulliNb(BernoulliNb),
    GaussianNb(GaussianNb),
}

impl Classifier {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            Classifier::LinearSvc(_) => ClassifierKind::LinearSvc,
            Classifier::AdaBoost(_) => ClassifierKind::AdaBoost,
            Classifier::DecisionTree(_) => ClassifierKind::DecisionTree,
            Classifier::RandomForest(_) => ClassifierKind::RandomForest,
            Classifier::BernoulliNb(_) => ClassifierKind::BernoulliNb,
            Classifier::GaussianNb(_) => ClassifierKind::GaussianNb,
        }
    }

    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            Classifier::LinearSvc(m) => m,
            Classifier::AdaBoost(m) => m,
            Classifier::DecisionTree(m) => m,
            Classifier::RandomForest(m) => m,
            Classifier::BernoulliNb(m) => m,
            Classifier::GaussianNb(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            Classifier::LinearSvc(m) => m,
            Classifier::AdaBoost(m) => m,
            Classifier::DecisionTree(m) => m,
            Classifier::RandomForest(m) => m,
            Classifier::BernoulliNb(m) => m,
            Classifier::GaussianNb(m) => m,
        }
    }
}

impl ClassifierModel for Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<(), ModelError> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i32>, ModelError> {
        self.inner().predict(x)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.inner().feature_importances()
    }
}

/// Build an unfitted classifier from a `ModelConfig`.
pub fn build_model(config: &ModelConfig) -> Classifier {
    let seed = config.seed;
    match &config.model_type {
        ModelType::LinearSvc(p) => Classifier::LinearSvc(LinearSvc::new(p.clone())),
        ModelType::AdaBoost(p) => Classifier::AdaBoost(AdaBoostClassifier::new(p.clone(), seed)),
        ModelType::DecisionTree(p) => {
            Classifier::DecisionTree(DecisionTreeClassifier::new(p.clone(), seed))
        }
        ModelType::RandomForest(p) => {
            Classifier::RandomForest(RandomForestClassifier::new(p.clone(), seed))
        }
        ModelType::BernoulliNb(p) => Classifier::BernoulliNb(BernoulliNb::new(p.clone())),
        ModelType::GaussianNb(p) => Classifier::GaussianNb(GaussianNb::new(p.clone())),
    }
}
