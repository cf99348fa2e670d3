//! Configuration system for irisviz.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from the user config directory (`config.toml`) and/or
//! `.irisviz/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::MlError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VizConfig {
    /// Dataset column selection.
    #[serde(default)]
    pub data: DataConfig,
    /// Sampling grid margins and per-task resolutions.
    #[serde(default)]
    pub grid: GridConfig,
    /// Classifier hyperparameters.
    #[serde(default)]
    pub models: ModelsConfig,
    /// Field export settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which Iris columns feed the 2D and 3D tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Column indices for the 2D tasks.
    #[serde(default = "default_features_2d")]
    pub features_2d: Vec<usize>,
    /// Column indices for the 3D tasks.
    #[serde(default = "default_features_3d")]
    pub features_3d: Vec<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            features_2d: default_features_2d(),
            features_3d: default_features_3d(),
        }
    }
}

fn default_features_2d() -> Vec<usize> {
    vec![2, 3]
}

fn default_features_3d() -> Vec<usize> {
    vec![0, 1, 2]
}

/// Grid construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Padding beyond the observed min/max for 2D grids.
    #[serde(default = "default_margin_2d")]
    pub margin_2d: f64,
    /// Padding beyond the observed min/max for 3D grids.
    #[serde(default = "default_margin_3d")]
    pub margin_3d: f64,
    #[serde(default)]
    pub resolutions: TaskResolutions,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            margin_2d: default_margin_2d(),
            margin_3d: default_margin_3d(),
            resolutions: TaskResolutions::default(),
        }
    }
}

fn default_margin_2d() -> f64 {
    1.0
}

fn default_margin_3d() -> f64 {
    0.5
}

/// Points per axis for each task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResolutions {
    #[serde(default = "default_res_task1")]
    pub task1: usize,
    #[serde(default = "default_res_coarse")]
    pub task2: usize,
    #[serde(default = "default_res_fine")]
    pub task3: usize,
    #[serde(default = "default_res_coarse")]
    pub task4_boundary: usize,
    #[serde(default = "default_res_fine")]
    pub task4_probability: usize,
}

impl Default for TaskResolutions {
    fn default() -> Self {
        Self {
            task1: default_res_task1(),
            task2: default_res_coarse(),
            task3: default_res_fine(),
            task4_boundary: default_res_coarse(),
            task4_probability: default_res_fine(),
        }
    }
}

impl TaskResolutions {
    /// Override every task's resolution with one value.
    pub fn set_all(&mut self, resolution: usize) {
        self.task1 = resolution;
        self.task2 = resolution;
        self.task3 = resolution;
        self.task4_boundary = resolution;
        self.task4_probability = resolution;
    }
}

fn default_res_task1() -> usize {
    100
}

fn default_res_coarse() -> usize {
    20
}

fn default_res_fine() -> usize {
    25
}

/// Hyperparameters for the four pipelines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default)]
    pub logistic: LogisticConfig,
    #[serde(default)]
    pub knn: KnnConfig,
    #[serde(default)]
    pub svm: SvmConfig,
    #[serde(default)]
    pub naive_bayes: NaiveBayesConfig,
}

/// Multinomial logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse L2 regularization strength.
    #[serde(default = "default_c")]
    pub c: f64,
    #[serde(default = "default_lr_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Stop once the gradient's max-norm drops below this.
    #[serde(default = "default_lr_tol")]
    pub tol: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: default_c(),
            max_iter: default_lr_max_iter(),
            learning_rate: default_learning_rate(),
            tol: default_lr_tol(),
        }
    }
}

fn default_c() -> f64 {
    1.0
}

fn default_lr_max_iter() -> usize {
    5000
}

fn default_learning_rate() -> f64 {
    0.25
}

fn default_lr_tol() -> f64 {
    1e-6
}

/// k-nearest neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnConfig {
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

fn default_k() -> usize {
    5
}

/// RBF-kernel support vector classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmConfig {
    #[serde(default = "default_c")]
    pub c: f64,
    /// Kernel coefficient; `None` means `1 / (n_features * X.var())`.
    #[serde(default)]
    pub gamma: Option<f64>,
    /// Fit Platt sigmoids so `predict_proba` is available.
    #[serde(default = "default_true")]
    pub probability: bool,
    #[serde(default = "default_svm_tol")]
    pub tol: f64,
    #[serde(default = "default_svm_max_iter")]
    pub max_iter: usize,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: default_c(),
            gamma: None,
            probability: true,
            tol: default_svm_tol(),
            max_iter: default_svm_max_iter(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_svm_tol() -> f64 {
    1e-3
}

fn default_svm_max_iter() -> usize {
    100_000
}

/// Gaussian naive Bayes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesConfig {
    /// Fraction of the largest feature variance added to every variance.
    #[serde(default = "default_var_smoothing")]
    pub var_smoothing: f64,
}

impl Default for NaiveBayesConfig {
    fn default() -> Self {
        Self {
            var_smoothing: default_var_smoothing(),
        }
    }
}

fn default_var_smoothing() -> f64 {
    1e-9
}

/// Field export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Pretty-print exported JSON.
    #[serde(default)]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            pretty: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "irisviz", "irisviz")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `IRISVIZ_`)
/// 3. Workspace-local config (`.irisviz/config.toml`)
/// 4. User config (`<config dir>/irisviz/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&VizConfig>,
) -> Result<VizConfig, MlError> {
    let mut figment = Figment::from(Serialized::defaults(VizConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".irisviz").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // IRISVIZ_GRID__MARGIN_3D, IRISVIZ_MODELS__KNN__K, ...
    figment = figment.merge(Env::prefixed("IRISVIZ_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: VizConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}

/// Directory for rolling log files, if the platform exposes one.
pub fn log_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.data_dir().join("logs"))
}

impl VizConfig {
    /// Render as TOML in the layout `load_config` reads back.
    pub fn to_toml(&self) -> Result<String, MlError> {
        toml::to_string_pretty(self).map_err(|e| MlError::config(e.to_string()))
    }

    /// Reject settings the grid evaluator cannot work with.
    pub fn validate(&self) -> Result<(), MlError> {
        if self.data.features_2d.len() != 2 {
            return Err(MlError::config(format!(
                "features_2d must name 2 columns, got {}",
                self.data.features_2d.len()
            )));
        }
        if self.data.features_3d.len() != 3 {
            return Err(MlError::config(format!(
                "features_3d must name 3 columns, got {}",
                self.data.features_3d.len()
            )));
        }
        let r = &self.grid.resolutions;
        for (task, res) in [
            ("task1", r.task1),
            ("task2", r.task2),
            ("task3", r.task3),
            ("task4_boundary", r.task4_boundary),
            ("task4_probability", r.task4_probability),
        ] {
            if res < 2 {
                return Err(MlError::config(format!(
                    "resolution for {task} must be >= 2, got {res}"
                )));
            }
            let dims = if task == "task1" { 2 } else { 3 };
            crate::grid::point_count(&vec![res; dims])
                .map_err(|e| MlError::config(format!("resolution for {task}: {e}")))?;
        }
        if !(self.grid.margin_2d >= 0.0 && self.grid.margin_3d >= 0.0) {
            return Err(MlError::config("grid margins must be non-negative"));
        }
        if self.models.knn.k == 0 {
            return Err(MlError::config("knn.k must be at least 1"));
        }
        if self.models.logistic.c <= 0.0 || self.models.svm.c <= 0.0 {
            return Err(MlError::config("regularization C must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VizConfig::default();
        assert_eq!(config.data.features_2d, vec![2, 3]);
        assert_eq!(config.data.features_3d, vec![0, 1, 2]);
        assert_eq!(config.grid.margin_2d, 1.0);
        assert_eq!(config.grid.margin_3d, 0.5);
        assert_eq!(config.grid.resolutions.task1, 100);
        assert_eq!(config.grid.resolutions.task4_probability, 25);
        assert_eq!(config.models.knn.k, 5);
        assert!(config.models.svm.probability);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = VizConfig::default();
        let toml_str = config.to_toml().unwrap();
        let deserialized: VizConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: VizConfig = toml::from_str("[models.knn]\nk = 7\n").unwrap();
        assert_eq!(config.models.knn.k, 7);
        assert_eq!(config.models.svm.c, 1.0);
        assert_eq!(config.grid.resolutions.task2, 20);
    }

    #[test]
    fn test_workspace_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".irisviz");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[grid]\nmargin_3d = 0.75\n\n[output]\npretty = true\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.grid.margin_3d, 0.75);
        assert!(config.output.pretty);
        assert_eq!(config.grid.margin_2d, 1.0);
    }

    #[test]
    fn test_overrides_win() {
        let mut overrides = VizConfig::default();
        overrides.grid.resolutions.set_all(7);
        let config = load_config(None, Some(&overrides)).unwrap();
        assert_eq!(config.grid.resolutions.task1, 7);
        assert_eq!(config.grid.resolutions.task4_boundary, 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = VizConfig::default();
        config.grid.resolutions.task3 = 1;
        assert!(config.validate().unwrap_err().is_config());

        let mut config = VizConfig::default();
        config.data.features_3d = vec![0, 1];
        assert!(config.validate().is_err());

        let mut config = VizConfig::default();
        config.models.knn.k = 0;
        assert!(config.validate().is_err());

        let mut config = VizConfig::default();
        config.grid.resolutions.set_all(1000);
        assert!(config.validate().unwrap_err().is_config());
        config.grid.resolutions.set_all(200);
        // 200^2 fits for the 2D task, 200^3 does not for the 3D ones.
        assert!(config.validate().unwrap_err().to_string().contains("task2"));
    }
}
