//! Per-task data selection, grid settings and the field layers each model contributes.

use serde::{Deserialize, Serialize};

use super::TaskId;
use crate::config::VizConfig;
use crate::data::FeatureSelection;

/// How a renderer should draw a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Smooth 2D heatmap of a continuous field.
    Heatmap,
    /// Hard-edged 2D heatmap of class labels.
    Decision,
    /// 3D isosurfaces between `value_range` bounds.
    Isosurface,
    /// Semi-transparent 3D volume rendering.
    Volume,
}

/// A named colorscale or explicit `(position, color)` stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Colorscale {
    Named(String),
    Stops(Vec<(f64, String)>),
}

impl Colorscale {
    fn named(name: &str) -> Self {
        Self::Named(name.to_string())
    }

    fn stops(stops: &[(f64, &str)]) -> Self {
        Self::Stops(stops.iter().map(|&(p, c)| (p, c.to_string())).collect())
    }
}

/// Sequential scales per class for probability layers.
const CLASS_SCALES: [&str; 3] = ["Blues", "Oranges", "Greens"];

/// Light class colors for hard decision regions.
const DECISION_STOPS: [(f64, &str); 3] = [(0.0, "#a6cee3"), (0.5, "#fdbf6f"), (1.0, "#b2df8a")];

/// Saturated class colors for 3D decision volumes.
const REGION_STOPS: [(f64, &str); 3] = [(0.0, "#1f77b4"), (0.5, "#ff7f0e"), (1.0, "#2ca02c")];

/// Rendering hints attached to an exported field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderHint {
    pub kind: FieldKind,
    pub colorscale: Colorscale,
    /// Value bounds (heatmap color range or iso bounds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_range: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

/// One field a task derives from each fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LayerSpec {
    /// Probability of one class label.
    Probability {
        class: usize,
        name: String,
        hint: RenderHint,
    },
    /// Hard class predictions.
    Decision { name: String, hint: RenderHint },
}

impl LayerSpec {
    pub fn name(&self) -> &str {
        match self {
            Self::Probability { name, .. } | Self::Decision { name, .. } => name,
        }
    }

    pub fn hint(&self) -> &RenderHint {
        match self {
            Self::Probability { hint, .. } | Self::Decision { hint, .. } => hint,
        }
    }
}

/// Everything needed to run one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task: TaskId,
    pub selection: FeatureSelection,
    /// Drop class 2 before fitting.
    pub binary: bool,
    pub resolution: usize,
    pub margin: f64,
    pub layers: Vec<LayerSpec>,
}

impl TaskSpec {
    pub fn for_task(task: TaskId, config: &VizConfig) -> Self {
        let res = &config.grid.resolutions;
        let selection_2d = FeatureSelection::new(config.data.features_2d.clone());
        let selection_3d = FeatureSelection::new(config.data.features_3d.clone());
        let margin_3d = config.grid.margin_3d;

        match task {
            TaskId::Task1 => {
                let mut layers: Vec<LayerSpec> = (0..3)
                    .map(|class| LayerSpec::Probability {
                        class,
                        name: format!("Class {class} Prob"),
                        hint: RenderHint {
                            kind: FieldKind::Heatmap,
                            colorscale: Colorscale::named(CLASS_SCALES[class]),
                            value_range: Some([0.0, 1.0]),
                            surface_count: None,
                            opacity: None,
                        },
                    })
                    .collect();
                layers.push(LayerSpec::Decision {
                    name: "Decision".to_string(),
                    hint: RenderHint {
                        kind: FieldKind::Decision,
                        colorscale: Colorscale::stops(&DECISION_STOPS),
                        value_range: None,
                        surface_count: None,
                        opacity: None,
                    },
                });
                Self {
                    task,
                    selection: selection_2d,
                    binary: false,
                    resolution: res.task1,
                    margin: config.grid.margin_2d,
                    layers,
                }
            }
            TaskId::Task2 => Self {
                task,
                selection: selection_3d,
                binary: true,
                resolution: res.task2,
                margin: margin_3d,
                layers: vec![LayerSpec::Probability {
                    class: 1,
                    name: "Boundary".to_string(),
                    hint: RenderHint {
                        kind: FieldKind::Isosurface,
                        colorscale: Colorscale::named("Gray"),
                        value_range: Some([0.45, 0.55]),
                        surface_count: Some(1),
                        opacity: Some(0.6),
                    },
                }],
            },
            TaskId::Task3 => Self {
                task,
                selection: selection_3d,
                binary: true,
                resolution: res.task3,
                margin: margin_3d,
                layers: vec![
                    LayerSpec::Probability {
                        class: 1,
                        name: "Prob Volume".to_string(),
                        hint: RenderHint {
                            kind: FieldKind::Volume,
                            colorscale: Colorscale::named("RdBu_r"),
                            value_range: Some([0.1, 0.9]),
                            surface_count: Some(15),
                            opacity: Some(0.1),
                        },
                    },
                    LayerSpec::Probability {
                        class: 1,
                        name: "Boundary (P=0.5)".to_string(),
                        hint: RenderHint {
                            kind: FieldKind::Isosurface,
                            colorscale: Colorscale::stops(&[(0.0, "gray"), (1.0, "gray")]),
                            value_range: Some([0.5, 0.5]),
                            surface_count: Some(1),
                            opacity: Some(0.6),
                        },
                    },
                ],
            },
            TaskId::Task4Boundary => Self {
                task,
                selection: selection_3d,
                binary: false,
                resolution: res.task4_boundary,
                margin: margin_3d,
                layers: vec![LayerSpec::Decision {
                    name: "Boundary Region".to_string(),
                    hint: RenderHint {
                        kind: FieldKind::Volume,
                        colorscale: Colorscale::stops(&REGION_STOPS),
                        value_range: Some([0.0, 2.0]),
                        surface_count: Some(3),
                        opacity: Some(0.15),
                    },
                }],
            },
            TaskId::Task4Probability => Self {
                task,
                selection: selection_3d,
                binary: false,
                resolution: res.task4_probability,
                margin: margin_3d,
                layers: (0..3)
                    .map(|class| LayerSpec::Probability {
                        class,
                        name: format!("Class {class} Core"),
                        hint: RenderHint {
                            kind: FieldKind::Isosurface,
                            colorscale: Colorscale::named(CLASS_SCALES[class]),
                            value_range: Some([0.5, 0.99]),
                            surface_count: Some(3),
                            opacity: Some(0.3),
                        },
                    })
                    .collect(),
            },
        }
    }

    pub fn needs_probabilities(&self) -> bool {
        self.layers
            .iter()
            .any(|l| matches!(l, LayerSpec::Probability { .. }))
    }

    pub fn needs_decisions(&self) -> bool {
        self.layers
            .iter()
            .any(|l| matches!(l, LayerSpec::Decision { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_defaults() {
        let config = VizConfig::default();

        let t1 = TaskSpec::for_task(TaskId::Task1, &config);
        assert_eq!(t1.selection.columns, vec![2, 3]);
        assert_eq!((t1.resolution, t1.margin, t1.binary), (100, 1.0, false));
        assert_eq!(t1.layers.len(), 4);
        assert!(t1.needs_probabilities() && t1.needs_decisions());

        let t2 = TaskSpec::for_task(TaskId::Task2, &config);
        assert_eq!(t2.selection.columns, vec![0, 1, 2]);
        assert_eq!((t2.resolution, t2.margin, t2.binary), (20, 0.5, true));
        assert!(!t2.needs_decisions());

        let t4a = TaskSpec::for_task(TaskId::Task4Boundary, &config);
        assert!(!t4a.needs_probabilities());
        assert_eq!(t4a.layers[0].hint().kind, FieldKind::Volume);

        let t4b = TaskSpec::for_task(TaskId::Task4Probability, &config);
        assert_eq!(t4b.resolution, 25);
        assert_eq!(t4b.layers[2].name(), "Class 2 Core");
    }

    #[test]
    fn test_colorscale_serialization() {
        let json = serde_json::to_value(Colorscale::named("Blues")).unwrap();
        assert_eq!(json, serde_json::json!("Blues"));
        let json = serde_json::to_value(Colorscale::stops(&[(0.0, "gray")])).unwrap();
        assert_eq!(json, serde_json::json!([[0.0, "gray"]]));
    }
}
