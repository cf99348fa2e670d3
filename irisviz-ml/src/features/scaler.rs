//! Z-score standardization.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::MlError;

/// Per-feature mean/scale learned from training data.
///
/// Scale is the population standard deviation; a constant column gets a
/// scale of 1 so it maps to zero instead of NaN.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: ArrayView2<f64>) -> Result<(), MlError> {
        if x.nrows() == 0 {
            return Err(MlError::invalid_input("cannot standardize an empty matrix"));
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| MlError::invalid_input("cannot standardize an empty matrix"))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, MlError> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(MlError::model("StandardScaler used before fit")),
        };
        if x.ncols() != mean.len() {
            return Err(MlError::config(format!(
                "expected {} features, got {}",
                mean.len(),
                x.ncols()
            )));
        }
        Ok((&x - mean) / scale)
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>, MlError> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Number of features seen during fit.
    pub fn n_features(&self) -> Option<usize> {
        self.mean.as_ref().map(|m| m.len())
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standardize() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(x.view()).unwrap();

        assert_eq!(scaler.mean().unwrap(), &array![3.0, 10.0]);
        let s = (8.0f64 / 3.0).sqrt();
        assert!((z[[0, 0]] + 2.0 / s).abs() < 1e-12);
        assert!(z[[1, 0]].abs() < 1e-12);
        // constant column maps to zero
        assert!(z.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(array![[1.0]].view()),
            Err(MlError::Model(_))
        ));
    }

    #[test]
    fn test_column_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(array![[1.0, 2.0], [2.0, 3.0]].view()).unwrap();
        let err = scaler.transform(array![[1.0, 2.0, 3.0]].view()).unwrap_err();
        assert!(err.is_config());
    }
}
