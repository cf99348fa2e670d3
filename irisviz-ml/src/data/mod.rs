//! Dataset provisioning: the bundled Iris table and column/class selections over it.

pub mod iris;
pub mod provision;

pub use provision::{Dataset, FeatureSelection, get_data, get_data_with};
