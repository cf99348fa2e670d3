//! Gaussian naive Bayes.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::{Classifier, argmax_labels, check_query, check_training_data, encode_labels};
use crate::error::MlError;

#[derive(Debug, Clone)]
struct Fitted {
    classes: Vec<usize>,
    log_prior: Array1<f64>,
    /// Per-class feature means, (n_classes, n_features).
    theta: Array2<f64>,
    /// Per-class feature variances after smoothing.
    var: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct GaussianNaiveBayes {
    var_smoothing: f64,
    fitted: Option<Fitted>,
}

impl GaussianNaiveBayes {
    pub fn new(var_smoothing: f64) -> Self {
        Self {
            var_smoothing,
            fitted: None,
        }
    }

    fn fitted(&self) -> Result<&Fitted, MlError> {
        self.fitted
            .as_ref()
            .ok_or_else(|| MlError::model("GaussianNaiveBayes used before fit"))
    }

    fn joint_log_likelihood(fitted: &Fitted, x: &ArrayView2<f64>) -> Array2<f64> {
        let k = fitted.classes.len();
        let mut jll = Array2::zeros((x.nrows(), k));
        for c in 0..k {
            let theta = fitted.theta.row(c);
            let var = fitted.var.row(c);
            let norm: f64 = var
                .iter()
                .map(|v| (2.0 * std::f64::consts::PI * v).ln())
                .sum::<f64>()
                * -0.5;
            for (r, row) in x.axis_iter(Axis(0)).enumerate() {
                let mahal: f64 = row
                    .iter()
                    .zip(theta.iter().zip(var.iter()))
                    .map(|(xv, (m, v))| (xv - m) * (xv - m) / v)
                    .sum();
                jll[[r, c]] = fitted.log_prior[c] + norm - 0.5 * mahal;
            }
        }
        jll
    }
}

impl Classifier for GaussianNaiveBayes {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), MlError> {
        let classes = check_training_data(&x, &y)?;
        let encoded = encode_labels(&y, &classes);
        let (n, d) = x.dim();
        let k = classes.len();

        let max_var = x
            .var_axis(Axis(0), 0.0)
            .fold(0.0f64, |m, &v| m.max(v));
        let epsilon = self.var_smoothing * max_var;

        let mut theta = Array2::zeros((k, d));
        let mut var = Array2::zeros((k, d));
        let mut log_prior = Array1::zeros(k);
        for c in 0..k {
            let rows: Vec<usize> = (0..n).filter(|&i| encoded[i] == c).collect();
            let xc = x.select(Axis(0), &rows);
            if let Some(mean) = xc.mean_axis(Axis(0)) {
                theta.row_mut(c).assign(&mean);
            }
            var.row_mut(c)
                .assign(&(xc.var_axis(Axis(0), 0.0) + epsilon));
            log_prior[c] = (rows.len() as f64 / n as f64).ln();
        }

        if var.iter().any(|&v| v <= 0.0) {
            return Err(MlError::invalid_input(
                "a class has zero variance on every feature; raise var_smoothing",
            ));
        }

        self.fitted = Some(Fitted {
            classes,
            log_prior,
            theta,
            var,
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, MlError> {
        let fitted = self.fitted()?;
        check_query(&x, fitted.theta.ncols())?;
        Ok(argmax_labels(
            &Self::joint_log_likelihood(fitted, &x),
            &fitted.classes,
        ))
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, MlError> {
        let fitted = self.fitted()?;
        check_query(&x, fitted.theta.ncols())?;
        let mut jll = Self::joint_log_likelihood(fitted, &x);
        super::softmax_rows(&mut jll);
        Ok(jll)
    }

    fn classes(&self) -> Option<&[usize]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }

    fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.theta.ncols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_class_statistics() {
        let x = array![[1.0], [3.0], [10.0], [14.0]];
        let y = array![0, 0, 1, 1];
        let mut model = GaussianNaiveBayes::new(1e-9);
        model.fit(x.view(), y.view()).unwrap();

        let fitted = model.fitted.as_ref().unwrap();
        assert_eq!(fitted.theta, array![[2.0], [12.0]]);
        assert!((fitted.var[[0, 0]] - 1.0).abs() < 1e-6);
        assert!((fitted.var[[1, 0]] - 4.0).abs() < 1e-6);

        assert_eq!(model.predict(array![[2.5], [11.0]].view()).unwrap(), array![0, 1]);
    }

    #[test]
    fn test_probabilities_normalized() {
        let x = array![[0.0, 0.0], [0.5, 0.2], [4.0, 4.0], [4.2, 3.9], [8.0, 0.0], [8.1, 0.3]];
        let y = array![0, 0, 1, 1, 2, 2];
        let mut model = GaussianNaiveBayes::new(1e-9);
        model.fit(x.view(), y.view()).unwrap();
        let p = model.predict_proba(array![[4.0, 2.0], [100.0, -50.0]].view()).unwrap();
        for row in p.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }
}
