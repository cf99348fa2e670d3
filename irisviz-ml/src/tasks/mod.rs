//! The five visualization tasks.
//!
//! A task provisions its data, lays a grid over it, fits every pipeline of the
//! lineup and turns each model's grid evaluation into render-ready field
//! layers. The result is a [`TaskReport`] handed to a
//! [`FieldSink`](crate::export::FieldSink).

pub mod report;
pub mod spec;

pub use report::{ExportArray, FIELD_LAYOUT, FieldLayer, ModelPanel, ScatterSeries, TaskReport};
pub use spec::{Colorscale, FieldKind, LayerSpec, RenderHint, TaskSpec};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::algorithms::{Classifier, Pipeline, get_models_with};
use crate::config::VizConfig;
use crate::data::get_data_with;
use crate::error::MlError;
use crate::grid::{EvalMode, Field, Grid, evaluate, make_grid};
use crate::training::fit_and_score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskId {
    Task1,
    Task2,
    Task3,
    Task4Boundary,
    Task4Probability,
}

impl TaskId {
    pub fn all() -> [TaskId; 5] {
        [
            Self::Task1,
            Self::Task2,
            Self::Task3,
            Self::Task4Boundary,
            Self::Task4Probability,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task1 => "task1",
            Self::Task2 => "task2",
            Self::Task3 => "task3",
            Self::Task4Boundary => "task4_boundary",
            Self::Task4Probability => "task4_probability",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Task1 => "Task 1: 2D Model Comparison Matrix",
            Self::Task2 => "Task 2: 3D Decision Boundaries (Binary)",
            Self::Task3 => "Task 3: 3D Probability Map (Volume + Iso-Surface)",
            Self::Task4Boundary => "Task 4A: Multi-Class Decision Boundaries (Hard Split)",
            Self::Task4Probability => "Task 4B: Multi-Class Probability Cores (3D)",
        }
    }

    /// File name of the exported report.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "task1" | "1" => Ok(Self::Task1),
            "task2" | "2" => Ok(Self::Task2),
            "task3" | "3" => Ok(Self::Task3),
            "task4_boundary" | "task4a" | "4a" => Ok(Self::Task4Boundary),
            "task4_probability" | "task4b" | "4b" => Ok(Self::Task4Probability),
            other => Err(MlError::config(format!(
                "unknown task '{other}', expected one of: {}",
                Self::all().map(|t| t.as_str()).join(", ")
            ))),
        }
    }
}

/// Run one task end to end.
pub fn run_task(task: TaskId, config: &VizConfig) -> Result<TaskReport, MlError> {
    run_spec(&TaskSpec::for_task(task, config), config)
}

/// Run a prepared task description.
pub fn run_spec(spec: &TaskSpec, config: &VizConfig) -> Result<TaskReport, MlError> {
    let start = std::time::Instant::now();
    let data = get_data_with(&spec.selection, spec.binary)?;
    let grid = make_grid(data.features.view(), spec.resolution, spec.margin)?;

    let scatter = data
        .classes_present()
        .into_iter()
        .map(|c| ScatterSeries::from_rows(c, data.class_names[c].clone(), data.rows_of_class(c).view()))
        .collect();

    let mut panels = Vec::new();
    for mut model in get_models_with(&config.models) {
        let metrics = fit_and_score(&mut model, &data)?;
        let layers = model_layers(spec, &model, &grid)?;
        panels.push(ModelPanel {
            model: model.name().to_string(),
            algorithm: model.algorithm().clone(),
            metrics,
            layers,
        });
    }

    tracing::info!(
        task = %spec.task,
        points = grid.len(),
        models = panels.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Task complete"
    );

    Ok(TaskReport {
        task: spec.task,
        title: spec.task.title().to_string(),
        binary: spec.binary,
        feature_names: data.feature_names,
        class_names: data.class_names,
        axes: grid.axes().iter().map(|a| a.to_vec()).collect(),
        shape: grid.shape(),
        layout: FIELD_LAYOUT.to_string(),
        scatter,
        panels,
    })
}

/// Evaluate a fitted model once per needed mode and cut out each layer.
fn model_layers(spec: &TaskSpec, model: &Pipeline, grid: &Grid) -> Result<Vec<FieldLayer>, MlError> {
    let probabilities = if spec.needs_probabilities() {
        Some(grid.reshape(evaluate(model, grid.points(), EvalMode::Probability)?)?)
    } else {
        None
    };
    let decisions = if spec.needs_decisions() {
        Some(grid.reshape(evaluate(model, grid.points(), EvalMode::Class)?)?)
    } else {
        None
    };

    spec.layers
        .iter()
        .map(|layer| {
            let field = match layer {
                LayerSpec::Probability { class, .. } => {
                    let column = class_column(model, *class)?;
                    probabilities
                        .as_ref()
                        .ok_or_else(|| MlError::model("probability field missing"))?
                        .class_probability(column)?
                }
                LayerSpec::Decision { .. } => decisions
                    .as_ref()
                    .and_then(Field::classes_as_f64)
                    .ok_or_else(|| MlError::model("decision field missing"))?,
            };
            Ok(FieldLayer {
                name: layer.name().to_string(),
                hint: layer.hint().clone(),
                field: ExportArray::from(&field),
            })
        })
        .collect()
}

/// Probability column holding `class` for a fitted model.
fn class_column(model: &Pipeline, class: usize) -> Result<usize, MlError> {
    model
        .classes()
        .and_then(|classes| classes.iter().position(|&c| c == class))
        .ok_or_else(|| {
            MlError::invalid_input(format!("model '{}' was not fit on class {class}", model.name()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coarse() -> VizConfig {
        let mut config = VizConfig::default();
        config.grid.resolutions.set_all(6);
        config
    }

    #[test]
    fn test_task_id_parse() {
        assert_eq!("task4_boundary".parse::<TaskId>().unwrap(), TaskId::Task4Boundary);
        assert_eq!("4B".parse::<TaskId>().unwrap(), TaskId::Task4Probability);
        assert!("task5".parse::<TaskId>().unwrap_err().is_config());
        for id in TaskId::all() {
            assert_eq!(id.to_string().parse::<TaskId>().unwrap(), id);
        }
        assert_eq!(
            serde_json::to_value(TaskId::Task4Probability).unwrap(),
            "task4_probability"
        );
    }

    #[test]
    fn test_task1_report() {
        let report = run_task(TaskId::Task1, &coarse()).unwrap();
        assert_eq!(report.shape, vec![6, 6]);
        assert_eq!(report.panels.len(), 4);
        assert_eq!(report.scatter.len(), 3);
        assert_eq!(report.scatter[0].points.len(), 50);
        for panel in &report.panels {
            assert!(panel.metrics.accuracy > 0.9, "{}", panel.model);
            assert_eq!(panel.layers.len(), 4);
            for layer in &panel.layers {
                assert_eq!(layer.field.shape, vec![6, 6]);
                assert_eq!(layer.field.len(), 36);
            }
            let decision = &panel.layers[3].field;
            assert!(decision.values.iter().all(|v| [0.0, 1.0, 2.0].contains(v)));
        }
    }

    #[test]
    fn test_binary_task_uses_class_one() {
        let report = run_task(TaskId::Task2, &coarse()).unwrap();
        assert!(report.binary);
        assert_eq!(report.scatter.len(), 2);
        assert_eq!(report.shape, vec![6, 6, 6]);
        let panel = report.panel("Naive Bayes").unwrap();
        let values = &panel.layers[0].field.values;
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(values.iter().any(|&p| p > 0.5) && values.iter().any(|&p| p < 0.5));
    }
}
