use crate::error::ModelError;
use crate::math::Array2;

/// Validate a training set and return the per-class counts `[benign, attack]`.
pub(crate) fn check_training_set(x: &Array2<f64>, y: &[i32]) -> Result<[usize; 2], ModelError> {
    if x.nrows() == 0 {
        return Err(ModelError::EmptyInput);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::LengthMismatch {
            rows: x.nrows(),
            labels: y.len(),
        });
    }

    let mut counts = [0usize; 2];
    for &label in y {
        match label {
            0 => counts[0] += 1,
            1 => counts[1] += 1,
            other => return Err(ModelError::InvalidLabel(other)),
        }
    }
    Ok(counts)
}

/// Same as [`check_training_set`] but also rejects single-class input.
pub(crate) fn check_two_classes(x: &Array2<f64>, y: &[i32]) -> Result<[usize; 2], ModelError> {
    let counts = check_training_set(x, y)?;
    if counts[0] == 0 {
        return Err(ModelError::SingleClass(1));
    }
    if counts[1] == 0 {
        return Err(ModelError::SingleClass(0));
    }
    Ok(counts)
}

pub(crate) fn check_width(expected: usize, x: &Array2<f64>) -> Result<(), ModelError> {
    if x.ncols() != expected {
        return Err(ModelError::FeatureMismatch {
            expected,
            found: x.ncols(),
        });
    }
    Ok(())
}

pub(crate) fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

/// Scale importances so they sum to one; all-zero input stays zero.
pub(crate) fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}
