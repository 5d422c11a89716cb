//! Naive Bayes classifiers: Bernoulli (binarised features) and Gaussian.
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};

use crate::config::{BernoulliNbParams, GaussianNbParams};
use crate::error::ModelError;
use crate::math::Array2;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_training_set, check_width};

const MIN_VARIANCE: f64 = 1e-12;

fn log_priors(counts: [usize; 2]) -> [f64; 2] {
    let n = (counts[0] + counts[1]) as f64;
    [
        (counts[0] as f64 / n).ln(),
        (counts[1] as f64 / n).ln(),
    ]
}

fn argmax(scores: [f64; 2]) -> i32 {
    if scores[1] > scores[0] {
        1
    } else {
        0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BernoulliNb {
    params: BernoulliNbParams,
    class_log_prior: [f64; 2],
    /// Per class, per feature: ln P(x_j = 1 | c) and ln P(x_j = 0 | c).
    log_present: [Vec<f64>; 2],
    log_absent: [Vec<f64>; 2],
    fitted: bool,
}

impl BernoulliNb {
    pub fn new(params: BernoulliNbParams) -> Self {
        BernoulliNb {
            params,
            class_log_prior: [0.0; 2],
            log_present: [Vec::new(), Vec::new()],
            log_absent: [Vec::new(), Vec::new()],
            fitted: false,
        }
    }

    pub fn params(&self) -> &BernoulliNbParams {
        &self.params
    }

    fn joint_log_likelihood(&self, row: &[f64]) -> [f64; 2] {
        let mut scores = self.class_log_prior;
        for (class, score) in scores.iter_mut().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                *score += if v > self.params.binarize {
                    self.log_present[class][j]
                } else {
                    self.log_absent[class][j]
                };
            }
        }
        scores
    }
}

impl ClassifierModel for BernoulliNb {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<(), ModelError> {
        let counts = check_training_set(x, y)?;
        let alpha = self.params.alpha;
        if alpha < 0.0 {
            return Err(ModelError::Numeric(format!("alpha must be >= 0, got {}", alpha)));
        }

        let d = x.ncols();
        let mut present = [vec![0.0; d], vec![0.0; d]];
        for (row, &label) in x.rows().zip(y) {
            let class = label as usize;
            for (j, &v) in row.iter().enumerate() {
                if v > self.params.binarize {
                    present[class][j] += 1.0;
                }
            }
        }

        for class in 0..2 {
            let denom = counts[class] as f64 + 2.0 * alpha;
            let (log_present, log_absent): (Vec<f64>, Vec<f64>) = present[class]
                .iter()
                .map(|&c| {
                    let p = if denom > 0.0 { (c + alpha) / denom } else { 0.5 };
                    (p.ln(), (1.0 - p).ln())
                })
                .unzip();
            self.log_present[class] = log_present;
            self.log_absent[class] = log_absent;
        }

        self.class_log_prior = log_priors(counts);
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i32>, ModelError> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }
        check_width(self.log_present[0].len(), x)?;
        Ok(x.rows()
            .map(|row| argmax(self.joint_log_likelihood(row)))
            .collect())
    }

    fn name(&self) -> &str {
        "bernoulli_nb"
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GaussianNb {
    params: GaussianNbParams,
    class_log_prior: [f64; 2],
    means: [Vec<f64>; 2],
    variances: [Vec<f64>; 2],
    fitted: bool,
}

impl GaussianNb {
    pub fn new(params: GaussianNbParams) -> Self {
        GaussianNb {
            params,
            class_log_prior: [0.0; 2],
            means: [Vec::new(), Vec::new()],
            variances: [Vec::new(), Vec::new()],
            fitted: false,
        }
    }

    pub fn params(&self) -> &GaussianNbParams {
        &self.params
    }

    pub fn class_means(&self, class: usize) -> &[f64] {
        &self.means[class]
    }

    pub fn class_variances(&self, class: usize) -> &[f64] {
        &self.variances[class]
    }
}

fn column_moments(x: &Array2<f64>, rows: &[usize]) -> (Vec<f64>, Vec<f64>) {
    let d = x.ncols();
    if rows.is_empty() {
        return (vec![0.0; d], vec![1.0; d]);
    }
    let n = rows.len() as f64;
    let mut mean = vec![0.0; d];
    for &r in rows {
        for (m, v) in mean.iter_mut().zip(x.row_slice(r)) {
            *m += v;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut var = vec![0.0; d];
    for &r in rows {
        for ((s, v), m) in var.iter_mut().zip(x.row_slice(r)).zip(&mean) {
            *s += (v - m) * (v - m);
        }
    }
    var.iter_mut().for_each(|s| *s /= n);
    (mean, var)
}

impl ClassifierModel for GaussianNb {
    fn fit(&mut self, x: &Array2<f64>, y: &[i32]) -> Result<(), ModelError> {
        let counts = check_training_set(x, y)?;

        let all: Vec<usize> = (0..x.nrows()).collect();
        let (_, overall_var) = column_moments(x, &all);
        let epsilon = self.params.var_smoothing * overall_var.iter().cloned().fold(0.0, f64::max);

        for class in 0..2 {
            let rows: Vec<usize> = y
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l as usize == class)
                .map(|(i, _)| i)
                .collect();
            let (mean, mut var) = column_moments(x, &rows);
            var.iter_mut()
                .for_each(|v| *v = (*v + epsilon).max(MIN_VARIANCE));
            self.means[class] = mean;
            self.variances[class] = var;
        }

        self.class_log_prior = log_priors(counts);
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<i32>, ModelError> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }
        check_width(self.means[0].len(), x)?;

        let mut densities: [Vec<Normal>; 2] = [Vec::new(), Vec::new()];
        for class in 0..2 {
            densities[class] = self.means[class]
                .iter()
                .zip(&self.variances[class])
                .map(|(&m, &v)| {
                    Normal::new(m, v.sqrt()).map_err(|e| ModelError::Numeric(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(x.rows()
            .map(|row| {
                let mut scores = self.class_log_prior;
                for (class, score) in scores.iter_mut().enumerate() {
                    *score += densities[class]
                        .iter()
                        .zip(row)
                        .map(|(dist, &v)| dist.ln_pdf(v))
                        .sum::<f64>();
                }
                argmax(scores)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "gaussian_nb"
    }
}
