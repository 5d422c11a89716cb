//! Multi-round training and evaluation loop.
//!
//! Every round re-partitions the data, balances the training side with
//! SMOTE, scales it and scores each roster classifier on the held-out test
//! rows. A classifier that fails to fit or predict produces a failed record
//! for that round; the loop carries on. Structural failures (SMOTE
//! preconditions, store I/O) abort the run.
//!
//! Persisted classifiers and the persisted scaler form one set. When any
//! roster entry is loaded, the stored scaler is loaded with it and used
//! unchanged for every classifier of the run, and it is never rewritten.
//! Otherwise each round fits a fresh scaler on its balanced training rows
//! and the last one is saved alongside the classifiers trained with it.
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::artifacts::{ArtifactStore, SCALER_ARTIFACT};
use crate::balancing::Smote;
use crate::config::{ModelConfig, PipelineConfig};
use crate::data_handling::{train_test_split, FlowDataset};
use crate::error::{ModelError, PipelineError, Result};
use crate::math::Array2;
use crate::models::{build_model, ClassifierKind, ClassifierModel};
use crate::preprocessing::MinMaxScaler;
use crate::stats::{accuracy, summarize_records, ClassificationReport, ClassifierSummary};
use crate::tuning::{GridSearch, SearchResult};

/// Offset between a round seed and the seed of its validation split.
const VALIDATION_SEED_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;

/// What to do with a roster entry, decided once before the first round.
#[derive(Debug)]
pub enum ArtifactDecision<M> {
    /// A persisted model exists: skip tuning and only predict each round.
    Load(M),
    /// Build from this config every round and persist after the last one.
    TrainThenSave(ModelConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Trained,
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fit,
    Predict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredOutcome {
    pub report: ClassificationReport,
    pub fit_secs: f64,
    pub predict_secs: f64,
    pub validation_accuracy: Option<f64>,
    pub source: ModelSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordOutcome {
    Scored(ScoredOutcome),
    Failed { stage: FailureStage, message: String },
}

/// Result of one classifier in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub round: usize,
    pub classifier: ClassifierKind,
    pub outcome: RecordOutcome,
}

impl EvaluationRecord {
    pub fn accuracy(&self) -> Option<f64> {
        match &self.outcome {
            RecordOutcome::Scored(s) => Some(s.report.accuracy),
            RecordOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RecordOutcome::Failed { .. })
    }
}

/// Provenance of a run, written next to the result tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows: usize,
    pub class_counts: [usize; 2],
    pub config: PipelineConfig,
    pub artifacts_loaded: Vec<String>,
    pub artifacts_written: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub records: Vec<EvaluationRecord>,
    pub search_results: Vec<SearchResult>,
    pub summaries: Vec<ClassifierSummary>,
    pub manifest: RunManifest,
}

/// Artifact decisions of a run plus the scaler they pin, if any.
struct Decisions<M> {
    entries: Vec<(ClassifierKind, ArtifactDecision<M>)>,
    /// Stored scaler, loaded whenever at least one entry is `Load`.
    scaler: Option<MinMaxScaler>,
    loaded: Vec<String>,
}

/// Data of one round after partitioning, balancing and scaling.
struct RoundData {
    scaler: MinMaxScaler,
    x_train: Array2<f64>,
    y_train: Vec<i32>,
    x_validation: Option<(Array2<f64>, Vec<i32>)>,
    x_test: Array2<f64>,
    y_test: Vec<i32>,
}

pub struct Pipeline {
    config: PipelineConfig,
    store: ArtifactStore,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, store: ArtifactStore) -> Result<Self> {
        config.validate()?;
        Ok(Pipeline { config, store })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run the roster with the built-in classifier families.
    pub fn run(&self, data: &FlowDataset) -> Result<PipelineReport> {
        self.run_with(data, build_model)
    }

    /// Run the roster, building each classifier with `build`.
    pub fn run_with<M, F>(&self, data: &FlowDataset, build: F) -> Result<PipelineReport>
    where
        M: ClassifierModel + Serialize + DeserializeOwned,
        F: Fn(&ModelConfig) -> M + Sync,
    {
        let started_at = Utc::now();
        let cfg = &self.config;

        if data.n_features() != cfg.n_features {
            return Err(PipelineError::FeatureWidthMismatch {
                expected: cfg.n_features,
                found: data.n_features(),
            });
        }
        data.log_input_data_summary();

        let Decisions {
            entries: mut decisions,
            scaler: stored_scaler,
            loaded: artifacts_loaded,
        } = self.decide::<M>()?;
        let search_results = if cfg.tune {
            self.tune(data, &mut decisions, stored_scaler.as_ref(), &build)?
        } else {
            Vec::new()
        };

        let smote = Smote::new(cfg.smote_neighbors);
        let mut records = Vec::with_capacity(cfg.rounds * decisions.len());
        let mut artifacts_written = Vec::new();

        for round in 0..cfg.rounds {
            let is_last = round + 1 == cfg.rounds;
            let round_start = Instant::now();
            let prepared = self.prepare_round(data, round, &smote, stored_scaler.as_ref())?;

            let mut trained: Vec<(ClassifierKind, M)> = Vec::new();
            for (kind, decision) in &decisions {
                let (record, model) = match decision {
                    ArtifactDecision::Load(model) => {
                        (evaluate(round, *kind, model, ModelSource::Loaded, 0.0, &prepared), None)
                    }
                    ArtifactDecision::TrainThenSave(model_cfg) => {
                        let mut model = build(model_cfg);
                        let fit_start = Instant::now();
                        match model.fit(&prepared.x_train, &prepared.y_train) {
                            Ok(()) => {
                                let fit_secs = fit_start.elapsed().as_secs_f64();
                                if let Some(importances) = model.feature_importances() {
                                    log::debug!("[round {}] {} feature importances: {:?}", round, kind, importances);
                                }
                                let record = evaluate(round, *kind, &model, ModelSource::Trained, fit_secs, &prepared);
                                (record, Some(model))
                            }
                            Err(e) => (failed(round, *kind, FailureStage::Fit, e), None),
                        }
                    }
                };

                match &record.outcome {
                    RecordOutcome::Scored(s) => log::info!(
                        "[round {}] {}: accuracy {:.5} (fit {:.3}s, predict {:.3}s)",
                        round,
                        kind,
                        s.report.accuracy,
                        s.fit_secs,
                        s.predict_secs
                    ),
                    RecordOutcome::Failed { stage, message } => log::warn!(
                        "[round {}] {} failed during {:?}: {}",
                        round,
                        kind,
                        stage,
                        message
                    ),
                }

                if let (true, Some(model), false) = (is_last, model, record.is_failed()) {
                    trained.push((*kind, model));
                }
                records.push(record);
            }

            if is_last {
                for (kind, model) in &trained {
                    let id = kind.artifact_id();
                    self.store.save(&id, model)?;
                    artifacts_written.push(id);
                }
                // A stored scaler stays in place; a fresh one is only worth
                // keeping next to classifiers fitted with it.
                if stored_scaler.is_none() && !trained.is_empty() {
                    self.store.save(SCALER_ARTIFACT, &prepared.scaler)?;
                    artifacts_written.push(SCALER_ARTIFACT.to_string());
                }
            }

            log::info!(
                "Round {}/{} finished in {:.2}s",
                round + 1,
                cfg.rounds,
                round_start.elapsed().as_secs_f64()
            );
        }

        let order: Vec<ClassifierKind> = decisions.iter().map(|(k, _)| *k).collect();
        let summaries = summarize_records(&records, &order);
        for s in &summaries {
            log::info!(
                "{}: mean accuracy {:.5} (std {:.5}) over {} rounds, {} failed, mean fit {:.3}s",
                s.classifier,
                s.mean_accuracy,
                s.std_accuracy,
                s.rounds_scored,
                s.rounds_failed,
                s.mean_fit_secs
            );
        }

        Ok(PipelineReport {
            records,
            search_results,
            summaries,
            manifest: RunManifest {
                started_at,
                finished_at: Utc::now(),
                rows: data.len(),
                class_counts: data.class_counts(),
                config: cfg.clone(),
                artifacts_loaded,
                artifacts_written,
            },
        })
    }

    /// Resolve the artifact decision of every roster entry.
    ///
    /// Loading any classifier also loads the stored scaler; a classifier
    /// artifact without one is an `UnknownArtifact` error.
    fn decide<M: DeserializeOwned>(&self) -> Result<Decisions<M>> {
        let mut decisions = Vec::with_capacity(self.config.classifiers.len());
        let mut loaded = Vec::new();

        for model_cfg in &self.config.classifiers {
            let kind = model_cfg.kind();
            let id = kind.artifact_id();
            if self.config.reuse_artifacts && self.store.exists(&id) {
                log::info!("Found artifact '{}'; {} will be loaded instead of trained", id, kind);
                let model: M = self.store.load(&id)?;
                decisions.push((kind, ArtifactDecision::Load(model)));
                loaded.push(id);
            } else {
                decisions.push((kind, ArtifactDecision::TrainThenSave(model_cfg.clone())));
            }
        }

        let scaler = if loaded.is_empty() {
            None
        } else {
            let scaler: MinMaxScaler = self.store.load(SCALER_ARTIFACT)?;
            log::info!(
                "Loaded '{}'; it scales every classifier of this run and will not be rewritten",
                SCALER_ARTIFACT
            );
            loaded.push(SCALER_ARTIFACT.to_string());
            Some(scaler)
        };

        Ok(Decisions {
            entries: decisions,
            scaler,
            loaded,
        })
    }

    /// Tune every tunable family that will be trained, once, on a seeded split.
    fn tune<M, F>(
        &self,
        data: &FlowDataset,
        decisions: &mut [(ClassifierKind, ArtifactDecision<M>)],
        stored_scaler: Option<&MinMaxScaler>,
        build: &F,
    ) -> Result<Vec<SearchResult>>
    where
        M: ClassifierModel,
        F: Fn(&ModelConfig) -> M + Sync,
    {
        let cfg = &self.config;
        let pending = decisions.iter().any(|(kind, d)| {
            matches!(d, ArtifactDecision::TrainThenSave(_)) && cfg.search_space_for(*kind).is_some()
        });
        if !pending {
            return Ok(Vec::new());
        }

        let seed = Some(cfg.seed);
        let partition = train_test_split(data, cfg.test_ratio, seed)?;
        let balanced = Smote::new(cfg.smote_neighbors).balance(&partition.train, seed)?;
        let scaled = match stored_scaler {
            Some(scaler) => scaler.transform(&balanced.x)?,
            None => MinMaxScaler::fit_transform(&balanced.x)?.1,
        };
        let tuning_set = FlowDataset::new(scaled, balanced.y)?;
        let search = GridSearch::new(cfg.cv_folds, cfg.seed);

        let mut results = Vec::new();
        for (kind, decision) in decisions.iter_mut() {
            let ArtifactDecision::TrainThenSave(model_cfg) = decision else {
                continue;
            };
            let Some(space) = cfg.search_space_for(*kind) else {
                continue;
            };
            let result = search.select(space, model_cfg, &tuning_set, build)?;
            *model_cfg = result.best_config.clone();
            results.push(result);
        }
        Ok(results)
    }

    fn prepare_round(
        &self,
        data: &FlowDataset,
        round: usize,
        smote: &Smote,
        stored_scaler: Option<&MinMaxScaler>,
    ) -> Result<RoundData> {
        let cfg = &self.config;
        let round_seed = cfg.round_seed.map(|s| s.wrapping_add(round as u64));

        let partition = train_test_split(data, cfg.test_ratio, round_seed)?;
        let (train, validation) = if cfg.validation_ratio > 0.0 {
            let inner = train_test_split(
                &partition.train,
                cfg.validation_ratio,
                round_seed.map(|s| s.wrapping_add(VALIDATION_SEED_OFFSET)),
            )?;
            (inner.train, Some(inner.test))
        } else {
            (partition.train, None)
        };

        let balanced = smote.balance(&train, round_seed)?;
        let scaler = match stored_scaler {
            Some(scaler) => scaler.clone(),
            None => MinMaxScaler::fit(&balanced.x)?,
        };

        log::debug!(
            "[round {}] train {} rows (balanced {:?}), validation {:?}, test {:?}",
            round,
            train.len(),
            balanced.class_counts(),
            validation.as_ref().map(FlowDataset::class_counts),
            partition.test.class_counts()
        );

        let x_validation = match &validation {
            Some(v) => Some((scaler.transform(&v.x)?, v.labels().to_vec())),
            None => None,
        };
        Ok(RoundData {
            x_train: scaler.transform(&balanced.x)?,
            y_train: balanced.labels().to_vec(),
            x_validation,
            x_test: scaler.transform(&partition.test.x)?,
            y_test: partition.test.labels().to_vec(),
            scaler,
        })
    }
}

fn failed(round: usize, kind: ClassifierKind, stage: FailureStage, error: ModelError) -> EvaluationRecord {
    EvaluationRecord {
        round,
        classifier: kind,
        outcome: RecordOutcome::Failed {
            stage,
            message: error.to_string(),
        },
    }
}

/// Score a fitted model on the round's validation and test partitions.
fn evaluate<M: ClassifierModel>(
    round: usize,
    kind: ClassifierKind,
    model: &M,
    source: ModelSource,
    fit_secs: f64,
    data: &RoundData,
) -> EvaluationRecord {
    let scored = (|| -> std::result::Result<ScoredOutcome, ModelError> {
        let validation_accuracy = match &data.x_validation {
            Some((x, y)) => Some(accuracy(y, &model.predict(x)?)),
            None => None,
        };

        let predict_start = Instant::now();
        let predicted = model.predict(&data.x_test)?;
        let predict_secs = predict_start.elapsed().as_secs_f64();

        Ok(ScoredOutcome {
            report: ClassificationReport::from_labels(&data.y_test, &predicted)?,
            fit_secs,
            predict_secs,
            validation_accuracy,
            source,
        })
    })();

    match scored {
        Ok(outcome) => EvaluationRecord {
            round,
            classifier: kind,
            outcome: RecordOutcome::Scored(outcome),
        },
        Err(e) => failed(round, kind, FailureStage::Predict, e),
    }
}
