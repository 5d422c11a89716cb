//! Synthetic minority oversampling (SMOTE) for the training partition.
use std::cmp::Ordering;
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::data_handling::{FlowDataset, ATTACK, BENIGN};
use crate::error::{PipelineError, Result};
use crate::math::Array1;

/// SMOTE with brute-force Euclidean neighbour search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Smote {
    k_neighbors: usize,
}

impl Default for Smote {
    fn default() -> Self {
        Smote { k_neighbors: 5 }
    }
}

impl Smote {
    pub fn new(k_neighbors: usize) -> Self {
        Smote { k_neighbors }
    }

    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    /// Oversample the minority class until both classes have equal counts.
    ///
    /// Original rows are kept in order and synthetic rows are appended. Each
    /// synthetic row lies on the segment between a minority row and one of
    /// its `k` nearest minority neighbours.
    pub fn balance(&self, train: &FlowDataset, seed: Option<u64>) -> Result<FlowDataset> {
        let [benign, attack] = train.class_counts();
        if benign == attack && benign > 0 {
            return Ok(train.clone());
        }

        let (minority_label, minority_count, majority_count) = if attack < benign {
            (ATTACK, attack, benign)
        } else {
            (BENIGN, benign, attack)
        };

        let k = self.k_neighbors;
        let required = k + 1;
        if k == 0 || minority_count < required {
            return Err(PipelineError::InsufficientMinority {
                available: minority_count,
                required,
                k,
            });
        }

        let minority: Vec<usize> = train
            .labels()
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == minority_label)
            .map(|(i, _)| i)
            .collect();

        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let n_synthetic = majority_count - minority_count;
        let bases: Vec<usize> = (0..n_synthetic)
            .map(|_| rng.gen_range(0..minority.len()))
            .collect();

        let mut unique_bases = bases.clone();
        unique_bases.sort_unstable();
        unique_bases.dedup();

        let neighbours: HashMap<usize, Vec<usize>> = unique_bases
            .par_iter()
            .map(|&b| (b, self.nearest(train, &minority, b)))
            .collect();

        log::debug!(
            "SMOTE: {} minority ({}) rows, generating {} synthetic rows from {} distinct bases",
            minority_count,
            minority_label,
            n_synthetic,
            unique_bases.len()
        );

        let mut x = train.x.clone();
        let mut y = train.y.to_vec();
        let mut synthetic = vec![0.0; train.n_features()];

        for base in bases {
            let nn = neighbours[&base][rng.gen_range(0..k)];
            let gap: f64 = rng.gen();
            let a = train.x.row_slice(minority[base]);
            let b = train.x.row_slice(minority[nn]);
            for ((s, &va), &vb) in synthetic.iter_mut().zip(a).zip(b) {
                *s = va + gap * (vb - va);
            }
            x.push_row(&synthetic);
            y.push(minority_label);
        }

        FlowDataset::new(x, Array1::from_vec(y))
    }

    /// Positions (into `minority`) of the k nearest other minority rows.
    fn nearest(&self, train: &FlowDataset, minority: &[usize], base: usize) -> Vec<usize> {
        let row = minority[base];
        let mut dists: Vec<(f64, usize)> = minority
            .iter()
            .enumerate()
            .filter(|&(pos, _)| pos != base)
            .map(|(pos, &other)| (train.x.row_distance_sq(row, other), pos))
            .collect();

        let by_distance =
            |a: &(f64, usize), b: &(f64, usize)| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1));

        let k = self.k_neighbors.min(dists.len());
        if k < dists.len() {
            dists.select_nth_unstable_by(k, by_distance);
            dists.truncate(k);
        }
        dists.sort_unstable_by(by_distance);
        dists.into_iter().map(|(_, pos)| pos).collect()
    }
}
