//! Serializable output of a task run.

use ndarray::{ArrayD, ArrayView2};
use serde::{Deserialize, Serialize};

use super::TaskId;
use super::spec::RenderHint;
use crate::algorithms::ClassicalAlgorithm;
use crate::training::ClassificationMetrics;

/// Point ordering of every exported field.
pub const FIELD_LAYOUT: &str = "row_major_ij";

/// A dense array flattened in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportArray {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl ExportArray {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<&ArrayD<f64>> for ExportArray {
    fn from(array: &ArrayD<f64>) -> Self {
        // `iter` walks logical order regardless of memory layout.
        Self {
            shape: array.shape().to_vec(),
            values: array.iter().copied().collect(),
        }
    }
}

/// Training observations of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterSeries {
    pub class: usize,
    pub name: String,
    pub points: Vec<Vec<f64>>,
}

impl ScatterSeries {
    pub fn from_rows(class: usize, name: impl Into<String>, rows: ArrayView2<f64>) -> Self {
        Self {
            class,
            name: name.into(),
            points: rows.outer_iter().map(|r| r.to_vec()).collect(),
        }
    }
}

/// One named field over the task grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLayer {
    pub name: String,
    pub hint: RenderHint,
    pub field: ExportArray,
}

/// Everything one pipeline contributed to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPanel {
    pub model: String,
    pub algorithm: ClassicalAlgorithm,
    pub metrics: ClassificationMetrics,
    pub layers: Vec<FieldLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task: TaskId,
    pub title: String,
    pub binary: bool,
    pub feature_names: Vec<String>,
    pub class_names: Vec<String>,
    /// Coordinates of each grid axis, in feature order.
    pub axes: Vec<Vec<f64>>,
    pub shape: Vec<usize>,
    pub layout: String,
    pub scatter: Vec<ScatterSeries>,
    pub panels: Vec<ModelPanel>,
}

impl TaskReport {
    pub fn model_names(&self) -> Vec<String> {
        self.panels.iter().map(|p| p.model.clone()).collect()
    }

    pub fn panel(&self, model: &str) -> Option<&ModelPanel> {
        self.panels.iter().find(|p| p.model == model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn, array};

    #[test]
    fn test_export_array_row_major() {
        let a = Array::from_shape_vec(IxDyn(&[2, 3]), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let t = a.t().to_owned();
        let exported = ExportArray::from(&t);
        assert_eq!(exported.shape, vec![3, 2]);
        assert_eq!(exported.values, vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_scatter_from_rows() {
        let rows = array![[1.0, 2.0], [3.0, 4.0]];
        let s = ScatterSeries::from_rows(1, "versicolor", rows.view());
        assert_eq!(s.points, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }
}
