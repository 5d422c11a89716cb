//! Exhaustive grid search with stratified k-fold cross-validation.
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, SearchSpace};
use crate::data_handling::FlowDataset;
use crate::error::{ModelError, PipelineError, Result};
use crate::models::{ClassifierKind, ClassifierModel};
use crate::stats::accuracy;

/// Cross-validated score of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub config: ModelConfig,
    pub fold_scores: Vec<f64>,
    /// Mean fold accuracy, `None` when the candidate failed.
    pub mean_score: Option<f64>,
    pub error: Option<String>,
}

/// Outcome of tuning one classifier family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub classifier: ClassifierKind,
    pub best_config: ModelConfig,
    pub best_score: f64,
    pub search_secs: f64,
    pub candidates: Vec<CandidateScore>,
}

/// The search record together with the winner refit on all the data.
#[derive(Debug)]
pub struct SearchOutcome<M> {
    pub result: SearchResult,
    pub best_estimator: M,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSearch {
    folds: usize,
    seed: u64,
}

impl GridSearch {
    pub fn new(folds: usize, seed: u64) -> Self {
        GridSearch { folds, seed }
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    /// Held-out index sets for each fold.
    ///
    /// Each class is shuffled with the search seed and dealt round-robin over
    /// the folds, so every fold keeps roughly the overall class ratio.
    pub fn stratified_folds(&self, y: &[i32]) -> Result<Vec<Vec<usize>>> {
        if self.folds < 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.folds
            )));
        }
        if y.len() < self.folds {
            return Err(PipelineError::InvalidConfig(format!(
                "cannot build {} folds from {} rows",
                self.folds,
                y.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut folds = vec![Vec::new(); self.folds];
        let mut next = 0usize;
        for class in [0, 1] {
            let mut members: Vec<usize> = y
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == class)
                .map(|(i, _)| i)
                .collect();
            members.shuffle(&mut rng);
            for idx in members {
                folds[next % self.folds].push(idx);
                next += 1;
            }
        }
        for fold in folds.iter_mut() {
            fold.sort_unstable();
        }
        Ok(folds)
    }

    /// Score every candidate of `space` around `base` and refit the best.
    pub fn search<M, F>(
        &self,
        space: &SearchSpace,
        base: &ModelConfig,
        data: &FlowDataset,
        build: F,
    ) -> Result<SearchOutcome<M>>
    where
        M: ClassifierModel,
        F: Fn(&ModelConfig) -> M + Sync,
    {
        let result = self.select(space, base, data, &build)?;
        let mut best_estimator = build(&result.best_config);
        best_estimator.fit(&data.x, data.labels())?;
        Ok(SearchOutcome { result, best_estimator })
    }

    /// Score every candidate of `space` around `base` without refitting.
    ///
    /// Candidates run in parallel; results keep enumeration order and the
    /// first candidate with the strictly highest mean accuracy wins.
    pub fn select<M, F>(
        &self,
        space: &SearchSpace,
        base: &ModelConfig,
        data: &FlowDataset,
        build: &F,
    ) -> Result<SearchResult>
    where
        M: ClassifierModel,
        F: Fn(&ModelConfig) -> M + Sync,
    {
        let start = Instant::now();
        let kind = space.kind();

        let candidates: Vec<ModelConfig> = space
            .candidates(base)?
            .into_iter()
            .map(|mut c| {
                c.seed = c.seed.or(Some(self.seed));
                c
            })
            .collect();

        let fold_sets = self.stratified_folds(data.labels())?;
        let splits: Vec<(FlowDataset, FlowDataset)> = fold_sets
            .iter()
            .map(|held_out| {
                let train_idx: Vec<usize> = (0..data.len())
                    .filter(|i| held_out.binary_search(i).is_err())
                    .collect();
                (data.select(&train_idx), data.select(held_out))
            })
            .collect();

        log::info!(
            "Grid search for {}: {} candidates x {} folds on {} rows",
            kind,
            candidates.len(),
            splits.len(),
            data.len()
        );

        let scores: Vec<CandidateScore> = candidates
            .par_iter()
            .map(|cfg| score_candidate(cfg, &splits, build))
            .collect();

        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in scores.iter().enumerate() {
            match (candidate.mean_score, &candidate.error) {
                (Some(score), _) => {
                    log::debug!("[{}] candidate {:?}: {:.5}", kind, candidate.config.model_type, score);
                    if best.map_or(true, |(_, b)| score > b) {
                        best = Some((i, score));
                    }
                }
                (None, Some(e)) => {
                    log::warn!("[{}] candidate {:?} failed: {}", kind, candidate.config.model_type, e)
                }
                (None, None) => {}
            }
        }

        let (best_idx, best_score) = best.ok_or(PipelineError::SearchFailed(kind))?;
        let best_config = scores[best_idx].config.clone();

        let search_secs = start.elapsed().as_secs_f64();
        log::info!(
            "Grid search for {} done in {:.2}s: best accuracy {:.5} with {:?}",
            kind,
            search_secs,
            best_score,
            best_config.model_type
        );

        Ok(SearchResult {
            classifier: kind,
            best_config,
            best_score,
            search_secs,
            candidates: scores,
        })
    }
}

fn score_candidate<M, F>(
    cfg: &ModelConfig,
    splits: &[(FlowDataset, FlowDataset)],
    build: &F,
) -> CandidateScore
where
    M: ClassifierModel,
    F: Fn(&ModelConfig) -> M,
{
    let run = || -> std::result::Result<Vec<f64>, ModelError> {
        let mut fold_scores = Vec::with_capacity(splits.len());
        for (fold, (train, test)) in splits.iter().enumerate() {
            let mut model = build(cfg);
            model.fit(&train.x, train.labels())?;
            let predicted = model.predict(&test.x)?;
            let score = accuracy(test.labels(), &predicted);
            log::trace!("fold {} of {:?}: {:.5}", fold, cfg.model_type, score);
            fold_scores.push(score);
        }
        Ok(fold_scores)
    };

    match run() {
        Ok(fold_scores) => {
            let mean = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            CandidateScore {
                config: cfg.clone(),
                fold_scores,
                mean_score: Some(mean),
                error: None,
            }
        }
        Err(e) => CandidateScore {
            config: cfg.clone(),
            fold_scores: Vec::new(),
            mean_score: None,
            error: Some(e.to_string()),
        },
    }
}
