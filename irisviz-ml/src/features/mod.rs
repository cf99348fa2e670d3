//! Feature transforms applied ahead of every estimator.

pub mod scaler;

pub use scaler::StandardScaler;
