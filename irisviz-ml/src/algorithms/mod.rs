//! Classifier implementations and the uniform interface they share.
//!
//! Every estimator implements [`Classifier`]; [`Pipeline`] composes one with a
//! [`StandardScaler`](crate::features::StandardScaler) and is itself a
//! `Classifier`, so callers loop over `Vec<Pipeline>` without caring which
//! algorithm sits inside.

pub mod classical;
pub mod knn;
pub mod logistic;
pub mod naive_bayes;
pub mod pipeline;
pub mod svm;

pub use classical::ClassicalAlgorithm;
pub use knn::KNeighborsClassifier;
pub use logistic::LogisticRegression;
pub use naive_bayes::GaussianNaiveBayes;
pub use pipeline::{Pipeline, get_models, get_models_with};
pub use svm::SupportVectorClassifier;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::MlError;

/// Capability set shared by all classifiers.
pub trait Classifier: Send + Sync {
    /// Fit on `x` (rows = observations) and labels `y`. Refitting replaces state.
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), MlError>;

    /// Hard class label per row.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, MlError>;

    /// Per-class probabilities, one row per input row and one column per entry
    /// of [`classes`](Classifier::classes).
    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, MlError>;

    /// Whether `predict_proba` is available in the current configuration.
    fn supports_proba(&self) -> bool {
        true
    }

    /// Sorted class labels seen during fit.
    fn classes(&self) -> Option<&[usize]>;

    /// Feature count seen during fit.
    fn n_features(&self) -> Option<usize>;
}

/// Validate a training pair and return its sorted distinct labels.
pub(crate) fn check_training_data(
    x: &ArrayView2<f64>,
    y: &ArrayView1<usize>,
) -> Result<Vec<usize>, MlError> {
    if x.nrows() == 0 {
        return Err(MlError::invalid_input("training data has no rows"));
    }
    if x.nrows() != y.len() {
        return Err(MlError::invalid_input(format!(
            "{} training rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(MlError::invalid_input("training data contains NaN or inf"));
    }
    let mut classes = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    if classes.len() < 2 {
        return Err(MlError::invalid_input(format!(
            "need at least 2 classes to fit a classifier, got {}",
            classes.len()
        )));
    }
    Ok(classes)
}

/// Reject query matrices whose width differs from the fitted width.
pub(crate) fn check_query(x: &ArrayView2<f64>, n_features: usize) -> Result<(), MlError> {
    if x.ncols() != n_features {
        return Err(MlError::config(format!(
            "expected {} features, got {}",
            n_features,
            x.ncols()
        )));
    }
    Ok(())
}

/// Map each label to its position in `classes`.
pub(crate) fn encode_labels(y: &ArrayView1<usize>, classes: &[usize]) -> Vec<usize> {
    y.iter()
        .map(|l| classes.binary_search(l).unwrap_or_default())
        .collect()
}

/// Row-wise argmax mapped back to class labels; ties go to the lower index.
pub(crate) fn argmax_labels(scores: &Array2<f64>, classes: &[usize]) -> Array1<usize> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = i;
                }
            }
            classes[best]
        })
        .collect()
}

/// In-place softmax over each row of `scores`.
pub(crate) fn softmax_rows(scores: &mut Array2<f64>) {
    for mut row in scores.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_check_training_data() {
        let x = array![[0.0], [1.0], [2.0]];
        assert_eq!(
            check_training_data(&x.view(), &array![2, 0, 2].view()).unwrap(),
            vec![0, 2]
        );
        assert!(check_training_data(&x.view(), &array![1, 1, 1].view()).is_err());
        assert!(check_training_data(&x.view(), &array![0, 1].view()).is_err());
    }

    #[test]
    fn test_argmax_ties_prefer_lower() {
        let scores = array![[0.5, 0.5], [0.2, 0.8]];
        assert_eq!(argmax_labels(&scores, &[3, 7]), array![3, 7]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let mut s = array![[1000.0, 1000.0, 0.0], [-1.0, 0.0, 1.0]];
        softmax_rows(&mut s);
        for row in s.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert!((s[[0, 0]] - 0.5).abs() < 1e-12);
    }
}
