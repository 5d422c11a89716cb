//! Integration tests for the six classifier families behind `build_model`.

mod common;

use cicids_classifiers::config::{default_roster, BernoulliNbParams, ModelConfig, ModelType};
use cicids_classifiers::data_handling::{train_test_split, FlowDataset};
use cicids_classifiers::math::Array2;
use cicids_classifiers::models::{build_model, Classifier, ClassifierKind, ClassifierModel};
use cicids_classifiers::preprocessing::MinMaxScaler;
use cicids_classifiers::stats::accuracy;
use cicids_classifiers::ModelError;

struct Scaled {
    x_train: Array2<f64>,
    y_train: Vec<i32>,
    x_test: Array2<f64>,
    y_test: Vec<i32>,
}

fn scaled_split(data: &FlowDataset) -> Scaled {
    let parts = train_test_split(data, 0.3, Some(17)).unwrap();
    let (scaler, x_train) = MinMaxScaler::fit_transform(&parts.train.x).unwrap();
    Scaled {
        x_train,
        y_train: parts.train.labels().to_vec(),
        x_test: scaler.transform(&parts.test.x).unwrap(),
        y_test: parts.test.labels().to_vec(),
    }
}

/// The default roster with Bernoulli NB thresholding at mid-range, so the
/// scaled separable features become informative presence bits.
fn roster() -> Vec<ModelConfig> {
    default_roster()
        .into_iter()
        .map(|cfg| match cfg.model_type {
            ModelType::BernoulliNb(_) => ModelConfig::new(ModelType::BernoulliNb(BernoulliNbParams {
                binarize: 0.5,
                ..BernoulliNbParams::default()
            })),
            _ => cfg,
        })
        .map(|cfg| cfg.with_seed(7))
        .collect()
}

// ---------------------------------------------------------------------------
// fit / predict
// ---------------------------------------------------------------------------

#[test]
fn every_family_separates_synthetic_flows() {
    let _ = env_logger::builder().is_test(true).try_init();
    let data = scaled_split(&common::synthetic_flows(60, 40, 31));

    for cfg in roster() {
        let mut model = build_model(&cfg);
        assert_eq!(model.kind(), cfg.kind());

        model.fit(&data.x_train, &data.y_train).unwrap();
        let predicted = model.predict(&data.x_test).unwrap();
        assert_eq!(predicted.len(), data.y_test.len());
        assert!(predicted.iter().all(|&l| l == 0 || l == 1));

        let acc = accuracy(&data.y_test, &predicted);
        assert!(acc >= 0.9, "{} accuracy {}", cfg.kind(), acc);
    }
}

#[test]
fn tree_families_report_normalised_importances() {
    let data = scaled_split(&common::synthetic_flows(50, 50, 3));
    for kind in [ClassifierKind::DecisionTree, ClassifierKind::RandomForest, ClassifierKind::AdaBoost] {
        let mut model = build_model(&ModelConfig::new(ModelType::default_for(kind)).with_seed(1));
        model.fit(&data.x_train, &data.y_train).unwrap();

        let importances = model.feature_importances().unwrap();
        assert_eq!(importances.len(), common::N_FEATURES);
        let total: f64 = importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "{} importances sum to {}", kind, total);
    }
}

#[test]
fn predicting_before_fit_is_an_error() {
    let data = scaled_split(&common::synthetic_flows(10, 10, 3));
    for cfg in roster() {
        let model = build_model(&cfg);
        assert!(matches!(model.predict(&data.x_test), Err(ModelError::NotFitted)));
    }
}

#[test]
fn single_class_training_set_is_rejected() {
    let data = common::synthetic_flows(12, 0, 3);
    let (_, x) = MinMaxScaler::fit_transform(&data.x).unwrap();
    let mut svc = build_model(&ModelConfig::new(ModelType::default_for(ClassifierKind::LinearSvc)));
    assert!(matches!(svc.fit(&x, data.labels()), Err(ModelError::SingleClass(0))));
}

#[test]
fn wrong_width_at_predict_time_is_rejected() {
    let data = scaled_split(&common::synthetic_flows(20, 20, 3));
    let mut model = build_model(&ModelConfig::new(ModelType::default_for(ClassifierKind::GaussianNb)));
    model.fit(&data.x_train, &data.y_train).unwrap();

    let narrow = Array2::from_shape_vec((1, 2), vec![0.1, 0.2]).unwrap();
    assert!(matches!(
        model.predict(&narrow),
        Err(ModelError::FeatureMismatch { expected: 4, found: 2 })
    ));
}

// ---------------------------------------------------------------------------
// persistence
// ---------------------------------------------------------------------------

#[test]
fn bincode_round_trip_keeps_predictions() {
    let data = scaled_split(&common::synthetic_flows(40, 40, 12));

    for cfg in roster() {
        let mut model = build_model(&cfg);
        model.fit(&data.x_train, &data.y_train).unwrap();
        let expected = model.predict(&data.x_test).unwrap();

        let bytes = bincode::serialize(&model).unwrap();
        let restored: Classifier = bincode::deserialize(&bytes).unwrap();

        assert_eq!(restored.kind(), cfg.kind());
        assert_eq!(restored.predict(&data.x_test).unwrap(), expected);
    }
}
