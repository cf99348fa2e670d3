//! Classification metrics.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Fraction of positions where `truth` and `pred` agree.
pub fn accuracy(truth: &Array1<usize>, pred: &Array1<usize>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth.iter().zip(pred.iter()).filter(|(a, b)| a == b).count();
    hits as f64 / truth.len() as f64
}

/// Accuracy plus a confusion matrix indexed `[true][predicted]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub confusion_matrix: Vec<Vec<usize>>,
}

impl ClassificationMetrics {
    pub fn compute(truth: &Array1<usize>, pred: &Array1<usize>, n_classes: usize) -> Self {
        let mut confusion_matrix = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in truth.iter().zip(pred.iter()) {
            if t < n_classes && p < n_classes {
                confusion_matrix[t][p] += 1;
            }
        }
        Self {
            accuracy: accuracy(truth, pred),
            confusion_matrix,
        }
    }

    /// Per-class recall; `None` for classes with no true rows.
    pub fn recall(&self) -> Vec<Option<f64>> {
        self.confusion_matrix
            .iter()
            .enumerate()
            .map(|(c, row)| {
                let total: usize = row.iter().sum();
                (total > 0).then(|| row[c] as f64 / total as f64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&array![0, 1, 2, 2], &array![0, 1, 1, 2]), 0.75);
        let empty = Array1::<usize>::zeros(0);
        assert_eq!(accuracy(&empty, &empty), 0.0);
    }

    #[test]
    fn test_confusion_matrix() {
        let m = ClassificationMetrics::compute(&array![0, 1, 2, 2], &array![0, 1, 1, 2], 3);
        assert_eq!(m.confusion_matrix, vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 1, 1]]);
        assert_eq!(m.recall(), vec![Some(1.0), Some(1.0), Some(0.5)]);

        let binary = ClassificationMetrics::compute(&array![0, 1], &array![0, 1], 3);
        assert_eq!(binary.recall()[2], None);
    }
}
