//! Querying a fitted classifier at every lattice point.

use ndarray::{Array1, Array2, ArrayD, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::algorithms::Classifier;
use crate::error::MlError;

/// What to ask the model for at each point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMode {
    Class,
    Probability,
}

/// Flat per-point results, in grid point order.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Classes(Array1<usize>),
    /// `(n_points, n_classes)`
    Probabilities(Array2<f64>),
}

/// Evaluation reshaped to the lattice's axis shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Shape `[r0, r1(, r2)]`.
    Classes(ArrayD<usize>),
    /// Shape `[r0, r1(, r2), n_classes]`.
    Probabilities(ArrayD<f64>),
}

impl Field {
    /// Probability field of one class column, shaped like the lattice.
    pub fn class_probability(&self, column: usize) -> Result<ArrayD<f64>, MlError> {
        match self {
            Self::Probabilities(p) => {
                let last = Axis(p.ndim() - 1);
                if column >= p.len_of(last) {
                    return Err(MlError::invalid_input(format!(
                        "class column {column} out of range ({} classes)",
                        p.len_of(last)
                    )));
                }
                Ok(p.index_axis(last, column).to_owned())
            }
            Self::Classes(_) => Err(MlError::invalid_input(
                "class probabilities requested from a hard-label field",
            )),
        }
    }

    /// Class labels as floats, for renderers that only take scalar fields.
    pub fn classes_as_f64(&self) -> Option<ArrayD<f64>> {
        match self {
            Self::Classes(c) => Some(c.mapv(|v| v as f64)),
            Self::Probabilities(_) => None,
        }
    }
}

/// Evaluate `model` at every row of `points`.
///
/// Fails with a configuration error when the point width differs from the
/// model's fitted width, or when probabilities are requested from a model
/// that cannot produce them.
pub fn evaluate(
    model: &dyn Classifier,
    points: ArrayView2<f64>,
    mode: EvalMode,
) -> Result<Evaluation, MlError> {
    let n_features = model
        .n_features()
        .ok_or_else(|| MlError::model("cannot evaluate an unfit model"))?;
    if points.ncols() != n_features {
        return Err(MlError::config(format!(
            "grid points have {} columns, model expects {}",
            points.ncols(),
            n_features
        )));
    }

    let start = std::time::Instant::now();
    let evaluation = match mode {
        EvalMode::Class => Evaluation::Classes(model.predict(points)?),
        EvalMode::Probability => {
            if !model.supports_proba() {
                return Err(MlError::config(
                    "probability mode requested from a model without probability estimates",
                ));
            }
            Evaluation::Probabilities(model.predict_proba(points)?)
        }
    };
    tracing::debug!(
        points = points.nrows(),
        ?mode,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Grid evaluated"
    );
    Ok(evaluation)
}
