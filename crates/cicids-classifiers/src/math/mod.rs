//! Small dense containers used throughout the crate.
//!
//! `Array2` holds flow feature matrices (row-major, one row per flow) and
//! `Array1` holds label vectors. Both are serde-serializable so that fitted
//! models embedding them can be persisted as artifacts.
pub mod matrix;
pub mod vector;

pub use matrix::{Array2, ShapeError};
pub use vector::Array1;
