//! Readers and writers for flow data, dataset preparation and run results.
pub mod cicids;
pub mod flow_csv;
pub mod results;
