//! Feature scaling.
//!
//! `MinMaxScaler` learns per-column bounds from one training matrix and maps
//! every later matrix with those same bounds. It is serialisable so the
//! bounds used in training can be reapplied at inference time.
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, PipelineError, Result};
use crate::math::Array2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl MinMaxScaler {
    /// Learn column bounds from `x`. Rows are samples, columns features.
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        if x.is_empty() {
            return Err(PipelineError::Model(ModelError::EmptyInput));
        }

        let ncols = x.ncols();
        let mut min = vec![f64::INFINITY; ncols];
        let mut max = vec![f64::NEG_INFINITY; ncols];
        for row in x.rows() {
            for (c, &v) in row.iter().enumerate() {
                min[c] = min[c].min(v);
                max[c] = max[c].max(v);
            }
        }

        Ok(MinMaxScaler { min, max })
    }

    pub fn n_features(&self) -> usize {
        self.min.len()
    }

    /// Map `x` with the fitted bounds.
    ///
    /// Zero-range columns map to 0. Values outside the training range are
    /// not clipped and may fall outside [0, 1].
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(PipelineError::FeatureWidthMismatch {
                expected: self.n_features(),
                found: x.ncols(),
            });
        }

        let ncols = x.ncols();
        let mut col = 0usize;
        Ok(x.mapv(|&v| {
            let c = col % ncols;
            col += 1;
            let range = self.max[c] - self.min[c];
            if range > 0.0 {
                (v - self.min[c]) / range
            } else {
                0.0
            }
        }))
    }

    pub fn fit_transform(x: &Array2<f64>) -> Result<(Self, Array2<f64>)> {
        let scaler = Self::fit(x)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_column_into_unit_interval() {
        let x = Array2::from_shape_vec((3, 1), vec![10.0, 20.0, 30.0]).unwrap();
        let (_, scaled) = MinMaxScaler::fit_transform(&x).unwrap();
        assert_eq!(scaled.as_slice(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let x = Array2::from_shape_vec((2, 2), vec![1.0, 7.0, 3.0, 7.0]).unwrap();
        let (_, scaled) = MinMaxScaler::fit_transform(&x).unwrap();
        assert_eq!(scaled.as_slice(), &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn transform_does_not_refit_or_clip() {
        let train = Array2::from_shape_vec((2, 1), vec![0.0, 10.0]).unwrap();
        let scaler = MinMaxScaler::fit(&train).unwrap();
        let before = scaler.clone();

        let test = Array2::from_shape_vec((2, 1), vec![-5.0, 20.0]).unwrap();
        let scaled = scaler.transform(&test).unwrap();

        assert_eq!(scaled.as_slice(), &[-0.5, 2.0]);
        assert_eq!(scaler, before);
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let scaler = MinMaxScaler::fit(&Array2::from_shape_vec((1, 2), vec![0.0, 1.0]).unwrap()).unwrap();
        let narrow = Array2::from_shape_vec((1, 1), vec![0.0]).unwrap();
        assert!(matches!(
            scaler.transform(&narrow),
            Err(PipelineError::FeatureWidthMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn empty_matrix_cannot_be_fitted() {
        assert!(MinMaxScaler::fit(&Array2::empty(3)).is_err());
    }
}
