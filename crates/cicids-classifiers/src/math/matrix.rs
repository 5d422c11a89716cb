use std::error::Error;
use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::math::vector::Array1;

/// Dense row-major matrix. Rows are samples, columns are features.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Array2<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T> Array2<T> {
    pub fn from_shape_vec(shape: (usize, usize), data: Vec<T>) -> Result<Self, ShapeError> {
        let (rows, cols) = shape;
        if data.len() != rows * cols {
            return Err(ShapeError {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// An empty matrix that still remembers its column count.
    pub fn empty(cols: usize) -> Self {
        Self {
            data: Vec::new(),
            rows: 0,
            cols,
        }
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn row_slice(&self, row: usize) -> &[T] {
        let start = self.offset(row, 0);
        &self.data[start..start + self.cols]
    }

    /// Iterate over rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.rows).map(move |r| self.row_slice(r))
    }

    /// Append one row. Panics if the width differs from the matrix width.
    pub fn push_row(&mut self, row: &[T])
    where
        T: Clone,
    {
        assert_eq!(row.len(), self.cols, "row width does not match matrix width");
        self.data.extend_from_slice(row);
        self.rows += 1;
    }

    pub fn column(&self, col: usize) -> Array1<T>
    where
        T: Clone,
    {
        assert!(col < self.cols, "column index out of bounds");
        (0..self.rows).map(|row| self[(row, col)].clone()).collect()
    }

    pub fn select_rows(&self, indices: &[usize]) -> Array2<T>
    where
        T: Clone,
    {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &row in indices {
            data.extend_from_slice(self.row_slice(row));
        }
        Array2 {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    pub fn mapv<U, F>(&self, mut f: F) -> Array2<U>
    where
        F: FnMut(&T) -> U,
    {
        Array2 {
            data: self.data.iter().map(|v| f(v)).collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }
}

impl Array2<f64> {
    /// Squared Euclidean distance between two rows.
    pub fn row_distance_sq(&self, a: usize, b: usize) -> f64 {
        self.row_slice(a)
            .iter()
            .zip(self.row_slice(b))
            .map(|(x, y)| (x - y) * (x - y))
            .sum()
    }

    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl<T> Index<(usize, usize)> for Array2<T> {
    type Output = T;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let offset = self.offset(index.0, index.1);
        &self.data[offset]
    }
}

#[derive(Debug, Clone)]
pub struct ShapeError {
    rows: usize,
    cols: usize,
    len: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid shape ({}, {}) for buffer of length {}",
            self.rows, self.cols, self.len
        )
    }
}

impl Error for ShapeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_rows_keeps_requested_order() {
        let x = Array2::from_shape_vec((3, 2), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let picked = x.select_rows(&[2, 0]);
        assert_eq!(picked.as_slice(), &[5.0, 6.0, 1.0, 2.0]);
        assert_eq!(picked.column(1).to_vec(), vec![6.0, 2.0]);
    }

    #[test]
    fn shape_must_match_buffer() {
        assert!(Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn push_row_keeps_width() {
        let mut m = Array2::empty(2);
        m.push_row(&[0.5, 1.5]);
        m.push_row(&[2.5, 3.5]);
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m[(1, 0)], 2.5);
        assert!((m.row_distance_sq(0, 1) - 8.0).abs() < 1e-12);
    }
}
