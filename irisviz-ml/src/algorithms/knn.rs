//! k-nearest-neighbours with uniform weights and Euclidean distance.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::{
    Classifier, argmax_labels, check_query, check_training_data, encode_labels,
};
use crate::error::MlError;

#[derive(Debug, Clone)]
struct Fitted {
    classes: Vec<usize>,
    x: Array2<f64>,
    /// Encoded label (index into `classes`) per training row.
    y: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct KNeighborsClassifier {
    k: usize,
    fitted: Option<Fitted>,
}

impl KNeighborsClassifier {
    pub fn new(k: usize) -> Self {
        Self { k, fitted: None }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn fitted(&self) -> Result<&Fitted, MlError> {
        self.fitted
            .as_ref()
            .ok_or_else(|| MlError::model("KNeighborsClassifier used before fit"))
    }

    /// Class vote fractions per query row.
    fn vote_fractions(&self, fitted: &Fitted, x: &ArrayView2<f64>) -> Array2<f64> {
        let k = self.k.min(fitted.x.nrows());
        let n_classes = fitted.classes.len();
        let mut out = Array2::zeros((x.nrows(), n_classes));
        let mut dist: Vec<(f64, usize)> = Vec::with_capacity(fitted.x.nrows());

        for (q, query) in x.axis_iter(Axis(0)).enumerate() {
            dist.clear();
            for (i, train) in fitted.x.axis_iter(Axis(0)).enumerate() {
                let d2: f64 = train
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                dist.push((d2, i));
            }
            // Equidistant neighbours resolve by training order.
            dist.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            for &(_, i) in &dist[..k] {
                out[[q, fitted.y[i]]] += 1.0;
            }
        }
        out / k as f64
    }
}

impl Classifier for KNeighborsClassifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), MlError> {
        if self.k == 0 {
            return Err(MlError::config("k must be at least 1"));
        }
        let classes = check_training_data(&x, &y)?;
        let encoded = encode_labels(&y, &classes);
        self.fitted = Some(Fitted {
            classes,
            x: x.to_owned(),
            y: encoded,
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, MlError> {
        let fitted = self.fitted()?;
        check_query(&x, fitted.x.ncols())?;
        Ok(argmax_labels(
            &self.vote_fractions(fitted, &x),
            &fitted.classes,
        ))
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, MlError> {
        let fitted = self.fitted()?;
        check_query(&x, fitted.x.ncols())?;
        Ok(self.vote_fractions(fitted, &x))
    }

    fn classes(&self) -> Option<&[usize]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }

    fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.x.ncols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_vote_fractions() {
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0]];
        let y = array![0, 0, 1, 1, 1];
        let mut model = KNeighborsClassifier::new(3);
        model.fit(x.view(), y.view()).unwrap();

        let p = model.predict_proba(array![[0.5], [10.5]].view()).unwrap();
        assert_eq!(p.row(0).to_vec(), vec![2.0 / 3.0, 1.0 / 3.0]);
        assert_eq!(p.row(1).to_vec(), vec![0.0, 1.0]);
        assert_eq!(model.predict(array![[0.5]].view()).unwrap(), array![0]);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let x = array![[0.0], [1.0]];
        let mut model = KNeighborsClassifier::new(5);
        model.fit(x.view(), array![4, 9].view()).unwrap();
        let p = model.predict_proba(array![[0.0]].view()).unwrap();
        assert_eq!(p.row(0).to_vec(), vec![0.5, 0.5]);
        // tie goes to the lower class label
        assert_eq!(model.predict(array![[0.0]].view()).unwrap(), array![4]);
    }

    #[test]
    fn test_memorizes_with_k1() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0]];
        let y = array![0, 1, 2];
        let mut model = KNeighborsClassifier::new(1);
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.predict(x.view()).unwrap(), y);
    }
}
