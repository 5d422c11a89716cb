//! Synthetic flow data shared by the integration tests.
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cicids_classifiers::data_handling::FlowDataset;
use cicids_classifiers::math::{Array1, Array2};

pub const N_FEATURES: usize = 4;

/// Benign and attack flows that are separable on the first two features.
///
/// Feature 2 is noise shared by both classes and feature 3 lives on a much
/// larger scale so that scaling matters.
pub fn synthetic_flows(n_benign: usize, n_attack: usize, seed: u64) -> FlowDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Array2::empty(N_FEATURES);
    let mut y = Vec::with_capacity(n_benign + n_attack);

    for _ in 0..n_benign {
        x.push_row(&[
            rng.gen_range(0.0..0.4),
            rng.gen_range(0.0..0.4),
            rng.gen_range(0.0..1.0),
            rng.gen_range(100.0..200.0),
        ]);
        y.push(0);
    }
    for _ in 0..n_attack {
        x.push_row(&[
            rng.gen_range(0.6..1.0),
            rng.gen_range(0.6..1.0),
            rng.gen_range(0.0..1.0),
            rng.gen_range(150.0..250.0),
        ]);
        y.push(1);
    }

    FlowDataset::new(x, Array1::from_vec(y)).expect("rows and labels are aligned")
}

/// Render a dataset in the binarised CSV layout (features then label).
pub fn to_csv(dataset: &FlowDataset) -> String {
    let mut out = String::new();
    for (row, label) in dataset.x.rows().zip(dataset.labels()) {
        let fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        out.push_str(&fields.join(","));
        out.push_str(&format!(",{}\n", label));
    }
    out
}
