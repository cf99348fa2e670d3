//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use anyhow::Context;
use irisviz_ml::algorithms::get_models_with;
use irisviz_ml::data::{Dataset, FeatureSelection, get_data_with};
use irisviz_ml::error::MlError;
use irisviz_ml::export::{FieldSink, JsonFieldWriter, run_into};
use irisviz_ml::tasks::{TaskId, TaskReport};
use irisviz_ml::training::{ClassificationMetrics, fit_and_score};
use irisviz_ml::{VizConfig, load_config};
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            task,
            out,
            resolution,
            pretty,
        } => handle_run(&task, out, resolution, pretty, workspace),
        Commands::List => handle_list(),
        Commands::Evaluate { dims, binary } => handle_evaluate(dims, binary, workspace),
        Commands::Config { action } => handle_config(action, workspace),
    }
}

fn load(workspace: &Path) -> anyhow::Result<VizConfig> {
    load_config(Some(workspace), None).context("Failed to load config")
}

/// Expand a `--task` argument into task ids.
fn parse_tasks(selector: &str) -> anyhow::Result<Vec<TaskId>> {
    if selector.eq_ignore_ascii_case("all") {
        return Ok(TaskId::all().to_vec());
    }
    selector
        .split(',')
        .map(|s| s.parse::<TaskId>().map_err(anyhow::Error::from))
        .collect()
}

/// Output directory: explicit flag, else config, relative paths under the workspace.
fn resolve_out_dir(out: Option<PathBuf>, config: &VizConfig, workspace: &Path) -> PathBuf {
    let dir = out.unwrap_or_else(|| config.output.dir.clone());
    if dir.is_absolute() {
        dir
    } else {
        workspace.join(dir)
    }
}

fn handle_run(
    selector: &str,
    out: Option<PathBuf>,
    resolution: Option<usize>,
    pretty: bool,
    workspace: &Path,
) -> anyhow::Result<()> {
    let tasks = parse_tasks(selector)?;
    let mut config = load(workspace)?;
    if let Some(resolution) = resolution {
        config.grid.resolutions.set_all(resolution);
        config.validate()?;
    }

    let out_dir = resolve_out_dir(out, &config, workspace);
    let writer = JsonFieldWriter::open(&out_dir, pretty || config.output.pretty)
        .with_context(|| format!("Failed to open {}", out_dir.display()))?;
    let mut sink = PrintingSink { inner: writer };
    run_into(&tasks, &config, &mut sink).context("Task run failed")?;

    tracing::debug!(manifest = %sink.inner.manifest_path().display(), "Manifest written");
    println!(
        "Wrote {} report(s) to {}",
        sink.inner.entries().len(),
        out_dir.display()
    );
    Ok(())
}

/// Prints a per-model summary of each report before writing it.
struct PrintingSink {
    inner: JsonFieldWriter,
}

impl FieldSink for PrintingSink {
    fn accept(&mut self, report: &TaskReport) -> Result<(), MlError> {
        println!("{:<18} {}", report.task.as_str(), report.title);
        for panel in &report.panels {
            println!("    {:<14} accuracy {:.3}", panel.model, panel.metrics.accuracy);
        }
        self.inner.accept(report)
    }

    fn finish(&mut self) -> Result<(), MlError> {
        self.inner.finish()
    }
}

fn handle_list() -> anyhow::Result<()> {
    for task in TaskId::all() {
        println!("{:<18} {}", task.as_str(), task.title());
    }
    Ok(())
}

/// Fit the configured lineup on the configured columns for `dims`.
fn score_models(
    dims: usize,
    binary: bool,
    config: &VizConfig,
) -> anyhow::Result<(Dataset, Vec<(String, ClassificationMetrics)>)> {
    let selection = FeatureSelection::configured(&config.data, dims)?;
    let data = get_data_with(&selection, binary)?;
    let mut scores = Vec::new();
    for mut model in get_models_with(&config.models) {
        let metrics = fit_and_score(&mut model, &data)?;
        scores.push((model.name().to_string(), metrics));
    }
    Ok((data, scores))
}

fn handle_evaluate(dims: usize, binary: bool, workspace: &Path) -> anyhow::Result<()> {
    let config = load(workspace)?;
    let (data, scores) = score_models(dims, binary, &config)?;
    println!(
        "{} rows, features: {}",
        data.n_rows(),
        data.feature_names.join(", ")
    );
    for (name, metrics) in scores {
        println!("  {:<14} {:.3}", name, metrics.accuracy);
    }
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".irisviz");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = VizConfig::default().to_toml()?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace)?;
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_tasks() {
        assert_eq!(parse_tasks("all").unwrap().len(), 5);
        assert_eq!(
            parse_tasks("task1,task4_probability").unwrap(),
            vec![TaskId::Task1, TaskId::Task4Probability]
        );
        assert!(parse_tasks("task9").is_err());
    }

    #[test]
    fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace).unwrap();

        let config_path = workspace.join(".irisviz").join("config.toml");
        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: VizConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, VizConfig::default());
    }

    #[test]
    fn test_config_init_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();
        let config_path = workspace.join(".irisviz").join("config.toml");

        handle_command(
            Commands::Config {
                action: ConfigAction::Init,
            },
            workspace,
        )
        .unwrap();
        std::fs::write(&config_path, "[models.knn]\nk = 9\n").unwrap();
        handle_command(
            Commands::Config {
                action: ConfigAction::Init,
            },
            workspace,
        )
        .unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert_eq!(content, "[models.knn]\nk = 9\n");
    }

    #[test]
    fn test_run_writes_reports() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        let command = Commands::Run {
            task: "task2".to_string(),
            out: Some(PathBuf::from("fields")),
            resolution: Some(4),
            pretty: false,
        };
        handle_command(command, workspace).unwrap();

        let out = workspace.join("fields");
        assert!(out.join("task2.json").exists());
        let manifest = JsonFieldWriter::load_manifest(&out).unwrap().unwrap();
        assert_eq!(manifest.tasks.len(), 1);
        assert_eq!(manifest.tasks[0].models.len(), 4);
    }

    #[test]
    fn test_run_rejects_bad_resolution() {
        let dir = TempDir::new().unwrap();
        let command = Commands::Run {
            task: "task1".to_string(),
            out: None,
            resolution: Some(1),
            pretty: false,
        };
        assert!(handle_command(command, dir.path()).is_err());
    }

    #[test]
    fn test_evaluate_uses_configured_columns() {
        let dir = TempDir::new().unwrap();
        let cfg_dir = dir.path().join(".irisviz");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[data]\nfeatures_3d = [1, 2, 3]\n").unwrap();

        let config = load(dir.path()).unwrap();
        let (data, scores) = score_models(3, false, &config).unwrap();
        assert_eq!(
            data.feature_names,
            vec!["sepal width (cm)", "petal length (cm)", "petal width (cm)"]
        );
        assert_eq!(scores.len(), 4);

        let mut coarse = config.clone();
        coarse.grid.resolutions.set_all(3);
        let report = irisviz_ml::run_task(TaskId::Task4Boundary, &coarse).unwrap();
        assert_eq!(report.feature_names, data.feature_names);
    }

    #[test]
    fn test_run_keeps_earlier_reports_in_manifest() {
        let dir = TempDir::new().unwrap();
        for task in ["task1", "task2"] {
            let command = Commands::Run {
                task: task.to_string(),
                out: Some(PathBuf::from("fields")),
                resolution: Some(3),
                pretty: false,
            };
            handle_command(command, dir.path()).unwrap();
        }
        let manifest = JsonFieldWriter::load_manifest(&dir.path().join("fields"))
            .unwrap()
            .unwrap();
        let tasks: Vec<TaskId> = manifest.tasks.iter().map(|e| e.task).collect();
        assert_eq!(tasks, vec![TaskId::Task1, TaskId::Task2]);
    }

    #[test]
    fn test_out_dir_resolution() {
        let config = VizConfig::default();
        let ws = Path::new("/tmp/ws");
        assert_eq!(resolve_out_dir(None, &config, ws), ws.join("output"));
        assert_eq!(
            resolve_out_dir(Some(PathBuf::from("/abs")), &config, ws),
            PathBuf::from("/abs")
        );
    }
}
