//! In-memory flow dataset and the train/test partitioner.
//!
//! `FlowDataset` keeps the feature matrix and the binary labels row-aligned;
//! every operation that drops or reorders rows goes through `select` so the
//! two can never drift apart.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};
use crate::math::{Array1, Array2};

/// Label of a benign flow.
pub const BENIGN: i32 = 0;
/// Label of an attack flow.
pub const ATTACK: i32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowDataset {
    pub x: Array2<f64>,
    pub y: Array1<i32>,
}

impl FlowDataset {
    pub fn new(x: Array2<f64>, y: Array1<i32>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(PipelineError::LengthMismatch {
                rows: x.nrows(),
                labels: y.len(),
            });
        }
        Ok(FlowDataset { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn labels(&self) -> &[i32] {
        self.y.as_slice()
    }

    /// Row counts as `[benign, attack]`.
    pub fn class_counts(&self) -> [usize; 2] {
        let attacks = self.y.iter().filter(|&&v| v == ATTACK).count();
        [self.len() - attacks, attacks]
    }

    /// New dataset holding the given rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> FlowDataset {
        FlowDataset {
            x: self.x.select_rows(indices),
            y: self.y.select(indices),
        }
    }

    pub fn log_input_data_summary(&self) {
        let [benign, attack] = self.class_counts();
        log::info!("----- Input Data Summary -----");
        log::info!("{} benign flows and {} attack flows", benign, attack);
        log::info!("{} feature columns", self.n_features());
        log::info!("------------------------------");
    }
}

/// One shuffled train/test partition.
#[derive(Debug, Clone)]
pub struct Partition {
    pub train: FlowDataset,
    pub test: FlowDataset,
}

/// Shuffle the rows and cut them into train and test partitions.
///
/// The test side receives `ceil(n * test_ratio)` rows. With `seed` set the
/// permutation is reproducible; otherwise it is drawn from OS entropy.
/// Both partitions must end up non-empty.
pub fn train_test_split(
    dataset: &FlowDataset,
    test_ratio: f64,
    seed: Option<u64>,
) -> Result<Partition> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(PipelineError::InvalidRatio(test_ratio));
    }

    let n = dataset.len();
    let n_test = (n as f64 * test_ratio).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::EmptyPartition {
            total: n,
            ratio: test_ratio,
        });
    }

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok(Partition {
        train: dataset.select(train_idx),
        test: dataset.select(test_idx),
    })
}
