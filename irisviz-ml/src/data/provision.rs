//! Feature matrix / label vector provisioning.
//!
//! Every call builds fresh owned arrays from the bundled table; nothing is cached
//! process-wide, so tests can construct synthetic [`Dataset`]s with
//! [`Dataset::from_parts`] instead.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::DataConfig;
use crate::data::iris;
use crate::error::MlError;

/// Class index dropped by the binary restriction (virginica).
pub const DROPPED_CLASS: usize = 2;

/// An ordered choice of Iris columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSelection {
    pub columns: Vec<usize>,
}

impl FeatureSelection {
    pub fn new(columns: Vec<usize>) -> Self {
        Self { columns }
    }

    /// Petal length and petal width, the two most separable columns.
    pub fn petals() -> Self {
        Self::new(vec![2, 3])
    }

    /// Sepal length, sepal width and petal length.
    pub fn three_d() -> Self {
        Self::new(vec![0, 1, 2])
    }

    /// Default selection for a dimensionality.
    pub fn for_dims(dims: usize) -> Result<Self, MlError> {
        match dims {
            2 => Ok(Self::petals()),
            3 => Ok(Self::three_d()),
            other => Err(MlError::config(format!(
                "unsupported dimensionality {other}, expected 2 or 3"
            ))),
        }
    }

    /// Configured selection for a dimensionality.
    pub fn configured(data: &DataConfig, dims: usize) -> Result<Self, MlError> {
        match dims {
            2 => Ok(Self::new(data.features_2d.clone())),
            3 => Ok(Self::new(data.features_3d.clone())),
            other => Err(MlError::config(format!(
                "unsupported dimensionality {other}, expected 2 or 3"
            ))),
        }
    }

    pub fn dims(&self) -> usize {
        self.columns.len()
    }

    fn validate(&self) -> Result<(), MlError> {
        if !(2..=3).contains(&self.columns.len()) {
            return Err(MlError::config(format!(
                "feature selection must name 2 or 3 columns, got {}",
                self.columns.len()
            )));
        }
        if let Some(&bad) = self
            .columns
            .iter()
            .find(|&&c| c >= iris::FEATURE_NAMES.len())
        {
            return Err(MlError::config(format!(
                "column index {bad} out of range (table has {} columns)",
                iris::FEATURE_NAMES.len()
            )));
        }
        Ok(())
    }
}

/// A feature matrix with its labels and naming metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub labels: Array1<usize>,
    pub feature_names: Vec<String>,
    /// Names of the full label set, indexed by class.
    pub class_names: Vec<String>,
}

impl Dataset {
    /// Assemble a dataset from caller-supplied arrays.
    pub fn from_parts(
        features: Array2<f64>,
        labels: Array1<usize>,
        feature_names: Vec<String>,
        class_names: Vec<String>,
    ) -> Result<Self, MlError> {
        if features.nrows() != labels.len() {
            return Err(MlError::dataset(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        if feature_names.len() != features.ncols() {
            return Err(MlError::dataset(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                features.ncols()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= class_names.len()) {
            return Err(MlError::dataset(format!(
                "label {bad} has no class name ({} names)",
                class_names.len()
            )));
        }
        Ok(Self {
            features,
            labels,
            feature_names,
            class_names,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Distinct labels present, ascending.
    pub fn classes_present(&self) -> Vec<usize> {
        let mut classes: Vec<usize> = self.labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    /// Rows belonging to `class`, as a new matrix.
    pub fn rows_of_class(&self, class: usize) -> Array2<f64> {
        let idx: Vec<usize> = self
            .labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        self.features.select(ndarray::Axis(0), &idx)
    }
}

/// Provision the Iris features for `dims` (2 or 3), optionally dropping class 2.
pub fn get_data(dims: usize, binary: bool) -> Result<Dataset, MlError> {
    get_data_with(&FeatureSelection::for_dims(dims)?, binary)
}

/// Provision an explicit column selection, optionally dropping class 2.
pub fn get_data_with(selection: &FeatureSelection, binary: bool) -> Result<Dataset, MlError> {
    selection.validate()?;

    let keep: Vec<usize> = (0..iris::IRIS.len())
        .filter(|&i| !binary || iris::target(i) != DROPPED_CLASS)
        .collect();

    let features = Array2::from_shape_fn((keep.len(), selection.dims()), |(r, c)| {
        iris::IRIS[keep[r]][selection.columns[c]]
    });
    let labels: Array1<usize> = keep.iter().map(|&i| iris::target(i)).collect();

    let feature_names = selection
        .columns
        .iter()
        .map(|&c| iris::FEATURE_NAMES[c].to_string())
        .collect();
    let class_names = iris::CLASS_NAMES.iter().map(|s| s.to_string()).collect();

    tracing::debug!(
        rows = keep.len(),
        columns = ?selection.columns,
        binary,
        "Provisioned iris data"
    );

    Dataset::from_parts(features, labels, feature_names, class_names)
}
