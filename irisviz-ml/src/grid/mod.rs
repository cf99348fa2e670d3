//! Regular sampling lattices over a padded bounding box of the features.
//!
//! Axis order follows the feature column order, and the flat point list is
//! row-major: axis 0 varies slowest, the last axis fastest. Reshaping a flat
//! per-point result to [`Grid::shape`] therefore puts the value for
//! `(axes[0][i], axes[1][j], axes[2][k])` at index `[i, j, k]`.

pub mod evaluate;

pub use evaluate::{EvalMode, Evaluation, Field, evaluate};

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::MlError;

/// Axes narrower than this are widened symmetrically around their center.
pub const MIN_SPAN: f64 = 1e-6;

/// Largest lattice a single grid may hold.
pub const MAX_GRID_POINTS: usize = 4_000_000;

/// Number of lattice points for `shape`, rejecting lattices above [`MAX_GRID_POINTS`].
pub fn point_count(shape: &[usize]) -> Result<usize, MlError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .filter(|&total| total <= MAX_GRID_POINTS)
        .ok_or_else(|| {
            MlError::config(format!(
                "grid of shape {shape:?} exceeds {MAX_GRID_POINTS} points"
            ))
        })
}

/// Inclusive `[lo, hi]` range of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub lo: f64,
    pub hi: f64,
}

impl AxisRange {
    pub fn span(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }
}

/// Per-column padded bounds of a feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub ranges: Vec<AxisRange>,
}

impl BoundingBox {
    /// `[min - margin, max + margin]` for each column.
    pub fn from_features(features: ArrayView2<f64>, margin: f64) -> Result<Self, MlError> {
        if features.nrows() == 0 {
            return Err(MlError::config("cannot bound an empty feature matrix"));
        }
        if !(margin.is_finite() && margin >= 0.0) {
            return Err(MlError::config(format!("invalid margin {margin}")));
        }
        let mut ranges = Vec::with_capacity(features.ncols());
        for (c, column) in features.axis_iter(Axis(1)).enumerate() {
            let (min, max) = column
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            if !(min.is_finite() && max.is_finite()) {
                return Err(MlError::invalid_input(format!(
                    "column {c} contains non-finite values"
                )));
            }
            let mut range = AxisRange {
                lo: min - margin,
                hi: max + margin,
            };
            if range.span() < MIN_SPAN {
                let mid = (range.lo + range.hi) / 2.0;
                tracing::warn!(column = c, lo = range.lo, hi = range.hi, "Degenerate axis widened");
                range = AxisRange {
                    lo: mid - MIN_SPAN / 2.0,
                    hi: mid + MIN_SPAN / 2.0,
                };
            }
            ranges.push(range);
        }
        Ok(Self { ranges })
    }
}

/// `n` evenly spaced values from `lo` to `hi`, both endpoints exact.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Array1<f64> {
    match n {
        0 => Array1::zeros(0),
        1 => Array1::from_elem(1, lo),
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            Array1::from_shape_fn(n, |i| if i == n - 1 { hi } else { lo + step * i as f64 })
        }
    }
}

/// Per-axis coordinates plus their flattened Cartesian product.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    axes: Vec<Array1<f64>>,
    points: Array2<f64>,
}

/// Build a `resolution`-per-axis lattice over the padded bounds of `features`.
pub fn make_grid(
    features: ArrayView2<f64>,
    resolution: usize,
    margin: f64,
) -> Result<Grid, MlError> {
    let dims = features.ncols();
    if !(2..=3).contains(&dims) {
        return Err(MlError::config(format!(
            "grid needs 2 or 3 feature columns, got {dims}"
        )));
    }
    if resolution < 2 {
        return Err(MlError::config(format!(
            "grid resolution must be >= 2, got {resolution}"
        )));
    }
    let bounds = BoundingBox::from_features(features, margin)?;
    let grid = Grid::from_axes(
        bounds
            .ranges
            .iter()
            .map(|r| linspace(r.lo, r.hi, resolution))
            .collect(),
    )?;
    tracing::debug!(dims, resolution, points = grid.len(), "Grid built");
    Ok(grid)
}

impl Grid {
    /// Lattice from explicit per-axis coordinates (any lengths >= 1).
    pub fn from_axes(axes: Vec<Array1<f64>>) -> Result<Self, MlError> {
        if axes.is_empty() || axes.iter().any(|a| a.is_empty()) {
            return Err(MlError::config("every grid axis needs at least one coordinate"));
        }
        let shape: Vec<usize> = axes.iter().map(|a| a.len()).collect();
        let strides = row_major_strides(&shape);
        let total = point_count(&shape)?;
        let points = Array2::from_shape_fn((total, axes.len()), |(flat, axis)| {
            axes[axis][(flat / strides[axis]) % shape[axis]]
        });
        Ok(Self { axes, points })
    }

    pub fn axes(&self) -> &[Array1<f64>] {
        &self.axes
    }

    /// Flat `(n_points, dims)` point matrix.
    pub fn points(&self) -> ArrayView2<'_, f64> {
        self.points.view()
    }

    pub fn dims(&self) -> usize {
        self.axes.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.len()).collect()
    }

    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// Row of [`points`](Grid::points) holding lattice cell `index`.
    pub fn flat_index(&self, index: &[usize]) -> Option<usize> {
        let shape = self.shape();
        if index.len() != shape.len() || index.iter().zip(&shape).any(|(i, s)| i >= s) {
            return None;
        }
        Some(
            index
                .iter()
                .zip(row_major_strides(&shape))
                .map(|(i, stride)| i * stride)
                .sum(),
        )
    }

    /// Coordinates of lattice cell `index`.
    pub fn coordinate(&self, index: &[usize]) -> Option<Vec<f64>> {
        let flat = self.flat_index(index)?;
        Some(self.points.row(flat).to_vec())
    }

    /// Reshape a flat evaluation into the lattice's axis shape.
    pub fn reshape(&self, evaluation: Evaluation) -> Result<Field, MlError> {
        let shape = self.shape();
        match evaluation {
            Evaluation::Classes(values) => {
                self.check_len(values.len())?;
                let values = values
                    .into_shape_with_order(shape)
                    .map_err(|e| MlError::invalid_input(e.to_string()))?;
                Ok(Field::Classes(values.into_dyn()))
            }
            Evaluation::Probabilities(probs) => {
                self.check_len(probs.nrows())?;
                let mut full = shape;
                full.push(probs.ncols());
                let probs = probs
                    .as_standard_layout()
                    .into_owned()
                    .into_shape_with_order(full)
                    .map_err(|e| MlError::invalid_input(e.to_string()))?;
                Ok(Field::Probabilities(probs.into_dyn()))
            }
        }
    }

    fn check_len(&self, n: usize) -> Result<(), MlError> {
        if n != self.len() {
            return Err(MlError::invalid_input(format!(
                "{n} values for a grid of {} points",
                self.len()
            )));
        }
        Ok(())
    }
}

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}
