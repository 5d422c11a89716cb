//! Integration tests for the multi-round evaluation loop.

mod common;

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use cicids_classifiers::artifacts::{ArtifactStore, SCALER_ARTIFACT};
use cicids_classifiers::config::{
    default_roster, GaussianNbParams, ModelConfig, ModelType, PipelineConfig, SearchSpace, TreeParams,
};
use cicids_classifiers::io::results::{write_report, EVALUATION_RECORDS_FILE, RUN_MANIFEST_FILE, SEARCH_RESULTS_FILE};
use cicids_classifiers::data_handling::FlowDataset;
use cicids_classifiers::math::{Array1, Array2};
use cicids_classifiers::models::naive_bayes::GaussianNb;
use cicids_classifiers::models::{Classifier, ClassifierKind, ClassifierModel};
use cicids_classifiers::pipeline::{FailureStage, ModelSource, Pipeline, RecordOutcome};
use cicids_classifiers::preprocessing::MinMaxScaler;
use cicids_classifiers::{ArtifactError, ModelError, PipelineError};

fn small_config() -> PipelineConfig {
    PipelineConfig {
        n_features: common::N_FEATURES,
        rounds: 2,
        test_ratio: 0.3,
        validation_ratio: 0.1,
        seed: 12,
        round_seed: Some(100),
        smote_neighbors: 2,
        cv_folds: 3,
        tune: false,
        reuse_artifacts: true,
        classifiers: default_roster(),
        search_spaces: SearchSpace::default_spaces(),
    }
}

/// Gaussian NB that can be told to fail its fit.
#[derive(Debug, Serialize, Deserialize)]
struct FlakyModel {
    inner: GaussianNb,
    fail_fit: bool,
}

impl ClassifierModel for FlakyModel {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<(), ModelError> {
        if self.fail_fit {
            return Err(ModelError::Numeric("injected failure".to_string()));
        }
        self.inner.fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i32>, ModelError> {
        self.inner.predict(x)
    }
}

// ---------------------------------------------------------------------------
// failure isolation
// ---------------------------------------------------------------------------

#[test]
fn fit_failure_in_one_round_does_not_stop_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        rounds: 5,
        smote_neighbors: 1,
        reuse_artifacts: false,
        classifiers: vec![ModelConfig::new(ModelType::GaussianNb(GaussianNbParams::default()))],
        ..small_config()
    };
    let pipeline = Pipeline::new(config, ArtifactStore::new(dir.path())).unwrap();
    let data = common::synthetic_flows(60, 20, 9);

    let calls = AtomicUsize::new(0);
    let report = pipeline
        .run_with(&data, |cfg: &ModelConfig| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            let params = match &cfg.model_type {
                ModelType::GaussianNb(p) => p.clone(),
                _ => GaussianNbParams::default(),
            };
            FlakyModel {
                inner: GaussianNb::new(params),
                fail_fit: call == 2,
            }
        })
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(report.records.len(), 5);
    for (t, record) in report.records.iter().enumerate() {
        assert_eq!(record.round, t);
        assert_eq!(record.classifier, ClassifierKind::GaussianNb);
    }
    assert!(matches!(
        report.records[2].outcome,
        RecordOutcome::Failed {
            stage: FailureStage::Fit,
            ..
        }
    ));
    assert!(matches!(report.records[3].outcome, RecordOutcome::Scored(_)));

    let summary = &report.summaries[0];
    assert_eq!((summary.rounds_scored, summary.rounds_failed), (4, 1));
    assert_eq!(report.manifest.artifacts_written, vec!["clf_gnb", SCALER_ARTIFACT]);
}

#[test]
fn failed_last_round_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        rounds: 2,
        reuse_artifacts: false,
        classifiers: vec![ModelConfig::new(ModelType::GaussianNb(GaussianNbParams::default()))],
        ..small_config()
    };
    let store = ArtifactStore::new(dir.path());
    let pipeline = Pipeline::new(config, store.clone()).unwrap();
    let data = common::synthetic_flows(40, 20, 9);

    let calls = AtomicUsize::new(0);
    let report = pipeline
        .run_with(&data, |_: &ModelConfig| FlakyModel {
            inner: GaussianNb::new(GaussianNbParams::default()),
            fail_fit: calls.fetch_add(1, Ordering::SeqCst) == 1,
        })
        .unwrap();

    assert!(report.records[1].is_failed());
    assert!(!store.exists("clf_gnb"));
    assert!(!store.exists(SCALER_ARTIFACT));
    assert!(report.manifest.artifacts_written.is_empty());
}

// ---------------------------------------------------------------------------
// full runs and artifact reuse
// ---------------------------------------------------------------------------

#[test]
fn full_roster_trains_then_reuses_artifacts() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let data = common::synthetic_flows(80, 30, 4);

    let first = Pipeline::new(small_config(), store.clone()).unwrap().run(&data).unwrap();

    assert_eq!(first.records.len(), 2 * ClassifierKind::ALL.len());
    assert!(first.manifest.artifacts_loaded.is_empty());
    assert_eq!(first.manifest.artifacts_written.len(), ClassifierKind::ALL.len() + 1);
    for record in &first.records {
        match &record.outcome {
            RecordOutcome::Scored(s) => {
                assert_eq!(s.source, ModelSource::Trained);
                assert!(s.validation_accuracy.is_some());
                let support: usize = s.report.per_class.iter().map(|c| c.support).sum();
                assert_eq!(s.report.confusion.total(), support);
            }
            RecordOutcome::Failed { message, .. } => panic!("{} failed: {}", record.classifier, message),
        }
    }
    let mut expected: Vec<String> = ClassifierKind::ALL.iter().map(|k| k.artifact_id()).collect();
    expected.push(SCALER_ARTIFACT.to_string());
    expected.sort();
    assert_eq!(store.list().unwrap(), expected);

    let second = Pipeline::new(small_config(), store.clone()).unwrap().run(&data).unwrap();

    assert_eq!(second.manifest.artifacts_loaded.len(), ClassifierKind::ALL.len() + 1);
    assert!(second.manifest.artifacts_loaded.contains(&SCALER_ARTIFACT.to_string()));
    assert!(second.manifest.artifacts_written.is_empty());
    assert!(second.search_results.is_empty());
    for record in &second.records {
        match &record.outcome {
            RecordOutcome::Scored(s) => {
                assert_eq!(s.source, ModelSource::Loaded);
                assert_eq!(s.fit_secs, 0.0);
            }
            RecordOutcome::Failed { message, .. } => panic!("{} failed: {}", record.classifier, message),
        }
    }
}

/// Same labels, every feature mapped to `10 * v + 5`.
fn shifted(data: &FlowDataset) -> FlowDataset {
    FlowDataset::new(data.x.mapv(|&v| 10.0 * v + 5.0), Array1::from_vec(data.labels().to_vec())).unwrap()
}

#[test]
fn mixed_run_keeps_the_stored_scaler() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let data = common::synthetic_flows(80, 30, 4);

    Pipeline::new(small_config(), store.clone()).unwrap().run(&data).unwrap();
    let scaler_before: MinMaxScaler = store.load(SCALER_ARTIFACT).unwrap();
    let svc_before: Classifier = store.load("clf_svc").unwrap();
    let scaled = scaler_before.transform(&data.x).unwrap();
    let predicted_before = svc_before.predict(&scaled).unwrap();

    fs::remove_file(dir.path().join("clf_dt.bin")).unwrap();
    let report = Pipeline::new(small_config(), store.clone())
        .unwrap()
        .run(&shifted(&data))
        .unwrap();

    assert_eq!(report.manifest.artifacts_written, vec!["clf_dt"]);
    assert!(report.manifest.artifacts_loaded.contains(&SCALER_ARTIFACT.to_string()));
    let scaler_after: MinMaxScaler = store.load(SCALER_ARTIFACT).unwrap();
    assert_eq!(scaler_after, scaler_before);

    // The loaded SVC still sees inputs scaled the way it was trained.
    let svc_after: Classifier = store.load("clf_svc").unwrap();
    let rescaled = scaler_after.transform(&data.x).unwrap();
    assert_eq!(svc_after.predict(&rescaled).unwrap(), predicted_before);

    // The retrained tree was fitted on rows scaled by the stored bounds.
    let tree: Classifier = store.load("clf_dt").unwrap();
    let shifted_scaled = scaler_after.transform(&shifted(&data).x).unwrap();
    assert_eq!(tree.predict(&shifted_scaled).unwrap().len(), data.len());
}

#[test]
fn classifier_artifact_without_scaler_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let data = common::synthetic_flows(60, 20, 3);
    let config = PipelineConfig {
        classifiers: vec![ModelConfig::new(ModelType::GaussianNb(GaussianNbParams::default()))],
        ..small_config()
    };

    Pipeline::new(config.clone(), store.clone()).unwrap().run(&data).unwrap();
    fs::remove_file(dir.path().join("scaler.bin")).unwrap();

    let err = Pipeline::new(config, store).unwrap().run(&data).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Artifact(ArtifactError::UnknownArtifact(ref id)) if id == SCALER_ARTIFACT
    ));
}

#[test]
fn tuning_replaces_the_trained_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        rounds: 1,
        tune: true,
        reuse_artifacts: false,
        classifiers: vec![
            ModelConfig::new(ModelType::DecisionTree(TreeParams::default())),
            ModelConfig::new(ModelType::GaussianNb(GaussianNbParams::default())),
        ],
        search_spaces: vec![SearchSpace::DecisionTree {
            max_depth: vec![Some(2), Some(5)],
            min_samples_split: vec![2],
        }],
        ..small_config()
    };
    let report = Pipeline::new(config, ArtifactStore::new(dir.path()))
        .unwrap()
        .run(&common::synthetic_flows(50, 25, 6))
        .unwrap();

    assert_eq!(report.search_results.len(), 1);
    let search = &report.search_results[0];
    assert_eq!(search.classifier, ClassifierKind::DecisionTree);
    assert_eq!(search.candidates.len(), 2);
    assert_eq!(search.best_config.seed, Some(12));
    assert_eq!(report.records.len(), 2);
}

#[test]
fn seeded_rounds_are_reproducible() {
    let data = common::synthetic_flows(60, 20, 5);
    let config = PipelineConfig {
        rounds: 3,
        reuse_artifacts: false,
        classifiers: vec![ModelConfig::new(ModelType::DecisionTree(TreeParams::default())).with_seed(1)],
        ..small_config()
    };

    let run = || {
        let dir = tempfile::tempdir().unwrap();
        let report = Pipeline::new(config.clone(), ArtifactStore::new(dir.path()))
            .unwrap()
            .run(&data)
            .unwrap();
        report
            .records
            .iter()
            .map(|r| match &r.outcome {
                RecordOutcome::Scored(s) => Some(s.report.clone()),
                RecordOutcome::Failed { .. } => None,
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

// ---------------------------------------------------------------------------
// structural errors
// ---------------------------------------------------------------------------

#[test]
fn dataset_width_must_match_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        n_features: 78,
        ..small_config()
    };
    let err = Pipeline::new(config, ArtifactStore::new(dir.path()))
        .unwrap()
        .run(&common::synthetic_flows(10, 10, 1))
        .unwrap_err();
    assert!(matches!(err, PipelineError::FeatureWidthMismatch { expected: 78, found: 4 }));
}

#[test]
fn too_few_attacks_for_smote_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        smote_neighbors: 5,
        ..small_config()
    };
    let err = Pipeline::new(config, ArtifactStore::new(dir.path()))
        .unwrap()
        .run(&common::synthetic_flows(40, 3, 1))
        .unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientMinority { k: 5, .. }));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        rounds: 0,
        ..small_config()
    };
    assert!(matches!(
        Pipeline::new(config, ArtifactStore::new(dir.path())),
        Err(PipelineError::InvalidConfig(_))
    ));
}

// ---------------------------------------------------------------------------
// result export
// ---------------------------------------------------------------------------

#[test]
fn report_files_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        reuse_artifacts: false,
        classifiers: vec![ModelConfig::new(ModelType::GaussianNb(GaussianNbParams::default()))],
        ..small_config()
    };
    let report = Pipeline::new(config, ArtifactStore::new(dir.path().join("models")))
        .unwrap()
        .run(&common::synthetic_flows(40, 20, 2))
        .unwrap();

    let out = dir.path().join("results");
    let written = write_report(&report, &out).unwrap();
    assert_eq!(written.len(), 3);

    let records = fs::read_to_string(out.join(EVALUATION_RECORDS_FILE)).unwrap();
    let lines: Vec<&str> = records.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("round\tclassifier\tstatus"));
    assert!(lines[1].starts_with("0\tgnb\tok\ttrained\t"));

    let searches = fs::read_to_string(out.join(SEARCH_RESULTS_FILE)).unwrap();
    assert_eq!(searches.lines().count(), 1);

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join(RUN_MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(manifest["rows"], 60);
    assert_eq!(manifest["config"]["rounds"], 2);
}
