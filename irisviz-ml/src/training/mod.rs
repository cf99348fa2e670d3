//! Fitting the lineup and scoring it on its own training data.

pub mod metrics;

pub use metrics::{ClassificationMetrics, accuracy};

use crate::algorithms::{Classifier, Pipeline};
use crate::data::Dataset;
use crate::error::MlError;

/// Fit `model` on the whole dataset and score it on the same rows.
pub fn fit_and_score(model: &mut Pipeline, data: &Dataset) -> Result<ClassificationMetrics, MlError> {
    let start = std::time::Instant::now();
    model.fit(data.features.view(), data.labels.view())?;
    let pred = model.predict(data.features.view())?;
    let metrics = ClassificationMetrics::compute(&data.labels, &pred, data.class_names.len());
    tracing::info!(
        model = model.name(),
        accuracy = metrics.accuracy,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Model fitted"
    );
    Ok(metrics)
}
