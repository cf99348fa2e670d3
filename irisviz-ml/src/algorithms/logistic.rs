//! Multinomial logistic regression with an L2 penalty, fit by full-batch gradient descent.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::{
    Classifier, argmax_labels, check_query, check_training_data, encode_labels, softmax_rows,
};
use crate::config::LogisticConfig;
use crate::error::MlError;

#[derive(Debug, Clone)]
struct Fitted {
    classes: Vec<usize>,
    /// (n_features, n_classes)
    weights: Array2<f64>,
    intercept: Array1<f64>,
}

/// Softmax regression minimizing `C * sum(cross_entropy) + 0.5 * ||W||^2`.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    config: LogisticConfig,
    fitted: Option<Fitted>,
    iterations: usize,
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            fitted: None,
            iterations: 0,
        }
    }

    /// Gradient steps taken by the last fit.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn fitted(&self) -> Result<&Fitted, MlError> {
        self.fitted
            .as_ref()
            .ok_or_else(|| MlError::model("LogisticRegression used before fit"))
    }

    fn scores(fitted: &Fitted, x: &ArrayView2<f64>) -> Array2<f64> {
        x.dot(&fitted.weights) + &fitted.intercept
    }
}

/// Upper bound on the curvature of the scaled objective.
///
/// The softmax cross-entropy Hessian is bounded by `0.5 * ||[x, 1]||^2` per row;
/// the L2 term adds `penalty`.
fn lipschitz_bound(x: &ArrayView2<f64>, penalty: f64) -> f64 {
    let max_sq = x
        .axis_iter(Axis(0))
        .map(|row| row.dot(&row))
        .fold(0.0f64, f64::max);
    0.5 * (max_sq + 1.0) + penalty
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), MlError> {
        let classes = check_training_data(&x, &y)?;
        let (n, d) = x.dim();
        let k = classes.len();

        let mut targets = Array2::<f64>::zeros((n, k));
        for (row, c) in encode_labels(&y, &classes).into_iter().enumerate() {
            targets[[row, c]] = 1.0;
        }

        // Dividing the objective by C*n keeps the step size independent of n.
        let penalty = 1.0 / (self.config.c * n as f64);
        let lr = self.config.learning_rate.min(1.0 / lipschitz_bound(&x, penalty));
        let mut fitted = Fitted {
            classes,
            weights: Array2::zeros((d, k)),
            intercept: Array1::zeros(k),
        };

        let mut iterations = 0;
        for _ in 0..self.config.max_iter {
            iterations += 1;
            let mut probs = Self::scores(&fitted, &x);
            softmax_rows(&mut probs);
            let residual = probs - &targets;

            let grad_w = x.t().dot(&residual) / n as f64 + &fitted.weights * penalty;
            let grad_b = residual
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(k));

            let max_grad = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0f64, |m, g| m.max(g.abs()));

            fitted.weights.scaled_add(-lr, &grad_w);
            fitted.intercept.scaled_add(-lr, &grad_b);

            if max_grad < self.config.tol {
                break;
            }
        }

        if fitted
            .weights
            .iter()
            .chain(fitted.intercept.iter())
            .any(|w| !w.is_finite())
        {
            return Err(MlError::model(format!(
                "logistic regression diverged after {iterations} iterations"
            )));
        }

        tracing::debug!(iterations, classes = k, lr, "LogisticRegression fit");
        self.iterations = iterations;
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, MlError> {
        let fitted = self.fitted()?;
        check_query(&x, fitted.weights.nrows())?;
        Ok(argmax_labels(&Self::scores(fitted, &x), &fitted.classes))
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, MlError> {
        let fitted = self.fitted()?;
        check_query(&x, fitted.weights.nrows())?;
        let mut probs = Self::scores(fitted, &x);
        softmax_rows(&mut probs);
        Ok(probs)
    }

    fn classes(&self) -> Option<&[usize]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }

    fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.weights.nrows())
    }
}
