pub mod dataset;
pub mod predict;
pub mod train;
pub mod util;
