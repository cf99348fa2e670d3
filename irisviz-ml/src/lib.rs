//! # irisviz-ml: Classifier decision fields over the Iris dataset
//!
//! Provisions Iris feature matrices, fits a fixed lineup of standardized
//! classifiers and samples them over dense 2D/3D grids. The sampled fields
//! feed heatmap, isosurface and volume renderers.
//!
//! ## Flow
//!
//! 1. [`data::get_data`] builds a feature matrix and label vector.
//! 2. [`algorithms::get_models`] returns four unfit [`Pipeline`]s.
//! 3. [`grid::make_grid`] lays a lattice over the padded data bounds.
//! 4. [`grid::evaluate`] queries a fitted model at every lattice point;
//!    [`grid::Grid::reshape`] turns the result into an axis-shaped field.
//!
//! [`tasks`] strings these together into the five visualization tasks and
//! [`export`] writes their reports as JSON.

// Foundation
pub mod config;
pub mod error;

// Data and preprocessing
pub mod data;
pub mod features;

// Models
pub mod algorithms;
pub mod training;

// Sampling
pub mod grid;

// Tasks and output
pub mod export;
pub mod tasks;

// Re-exports
pub use algorithms::{Classifier, Pipeline, get_models};
pub use config::{VizConfig, load_config};
pub use data::{Dataset, get_data};
pub use error::MlError;
pub use export::{FieldSink, JsonFieldWriter};
pub use grid::{EvalMode, Grid, evaluate, make_grid};
pub use tasks::{TaskId, TaskReport, run_task};
