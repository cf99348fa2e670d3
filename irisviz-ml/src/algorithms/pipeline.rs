//! Named standardize-then-classify pipelines.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use super::{ClassicalAlgorithm, Classifier, check_query};
use crate::config::ModelsConfig;
use crate::error::MlError;
use crate::features::StandardScaler;

/// A `StandardScaler` followed by one estimator.
///
/// Fit once on the full training pair, then queried read-only.
pub struct Pipeline {
    name: String,
    algorithm: ClassicalAlgorithm,
    scaler: StandardScaler,
    estimator: Box<dyn Classifier>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("fitted", &self.is_fitted())
            .finish()
    }
}

impl Pipeline {
    pub fn new(algorithm: ClassicalAlgorithm) -> Self {
        Self {
            name: algorithm.display_name(),
            estimator: algorithm.build(),
            algorithm,
            scaler: StandardScaler::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn algorithm(&self) -> &ClassicalAlgorithm {
        &self.algorithm
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn is_fitted(&self) -> bool {
        self.estimator.n_features().is_some()
    }

    fn standardize(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>, MlError> {
        let n_features = self
            .scaler
            .n_features()
            .ok_or_else(|| MlError::model(format!("pipeline '{}' used before fit", self.name)))?;
        check_query(x, n_features)?;
        self.scaler.transform(x.view())
    }
}

impl Classifier for Pipeline {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<(), MlError> {
        let z = self.scaler.fit_transform(x)?;
        self.estimator.fit(z.view(), y)?;
        tracing::debug!(model = %self.name, rows = x.nrows(), "Pipeline fit");
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>, MlError> {
        let z = self.standardize(&x)?;
        self.estimator.predict(z.view())
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, MlError> {
        if !self.estimator.supports_proba() {
            return Err(MlError::config(format!(
                "model '{}' does not support probability estimates",
                self.name
            )));
        }
        let z = self.standardize(&x)?;
        self.estimator.predict_proba(z.view())
    }

    fn supports_proba(&self) -> bool {
        self.estimator.supports_proba()
    }

    fn classes(&self) -> Option<&[usize]> {
        self.estimator.classes()
    }

    fn n_features(&self) -> Option<usize> {
        self.scaler.n_features()
    }
}

/// The four default pipelines, fresh and unfit.
pub fn get_models() -> Vec<Pipeline> {
    get_models_with(&ModelsConfig::default())
}

/// The four pipelines built from configured hyperparameters.
pub fn get_models_with(models: &ModelsConfig) -> Vec<Pipeline> {
    ClassicalAlgorithm::lineup(models)
        .into_iter()
        .map(Pipeline::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SvmConfig;
    use crate::data::get_data;
    use crate::training::metrics::accuracy;

    #[test]
    fn test_get_models_fresh() {
        let models = get_models();
        let names: Vec<&str> = models.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["Log Reg", "KNN (k=5)", "SVM (RBF)", "Naive Bayes"]);
        assert!(models.iter().all(|m| !m.is_fitted()));
        assert!(models.iter().all(|m| m.supports_proba()));
    }

    #[test]
    fn test_all_pipelines_learn_petals() {
        let ds = get_data(2, false).unwrap();
        for mut model in get_models() {
            model.fit(ds.features.view(), ds.labels.view()).unwrap();
            let pred = model.predict(ds.features.view()).unwrap();
            let acc = accuracy(&ds.labels, &pred);
            assert!(acc > 0.9, "{} accuracy {acc}", model.name());
            assert_eq!(model.classes(), Some(&[0, 1, 2][..]));
        }
    }

    #[test]
    fn test_unfit_pipeline_errors() {
        let model = &get_models()[0];
        let err = model.predict(ndarray::array![[1.0, 2.0]].view()).unwrap_err();
        assert!(matches!(err, MlError::Model(_)));
    }

    #[test]
    fn test_probability_disabled_is_config_error() {
        let ds = get_data(2, true).unwrap();
        let mut model = Pipeline::new(ClassicalAlgorithm::Svm(SvmConfig {
            probability: false,
            ..SvmConfig::default()
        }));
        model.fit(ds.features.view(), ds.labels.view()).unwrap();
        assert!(model.predict(ds.features.view()).is_ok());
        assert!(model.predict_proba(ds.features.view()).unwrap_err().is_config());
    }
}
