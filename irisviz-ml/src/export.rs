//! Handing finished task reports to a renderer.
//!
//! [`JsonFieldWriter`] writes one `<task_id>.json` per report plus a
//! `manifest.json` index. Field arrays are stored as `{ "shape", "values" }`
//! with values flattened row-major over the grid axes.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MlError;
use crate::tasks::{TaskId, TaskReport};

/// Destination for task reports.
pub trait FieldSink {
    /// Accept one finished report.
    fn accept(&mut self, report: &TaskReport) -> Result<(), MlError>;

    /// Called once after the last report of a run.
    fn finish(&mut self) -> Result<(), MlError> {
        Ok(())
    }
}

/// One exported task in the run manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub task: TaskId,
    pub title: String,
    pub file: String,
    pub models: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub tasks: Vec<ManifestEntry>,
}

/// Writes reports as JSON files into a directory.
#[derive(Debug)]
pub struct JsonFieldWriter {
    dir: PathBuf,
    pretty: bool,
    entries: Vec<ManifestEntry>,
}

impl JsonFieldWriter {
    /// Writer over `dir`, keeping entries of any manifest already there.
    pub fn open(dir: impl Into<PathBuf>, pretty: bool) -> Result<Self, MlError> {
        let dir = dir.into();
        let entries = Self::load_manifest(&dir)?
            .map(|m| m.tasks)
            .unwrap_or_default();
        Ok(Self {
            dir,
            pretty,
            entries,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join("manifest.json")
    }

    /// Read a previously written manifest.
    pub fn load_manifest(dir: &Path) -> Result<Option<Manifest>, MlError> {
        let path = dir.join("manifest.json");
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), MlError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        std::fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl FieldSink for JsonFieldWriter {
    fn accept(&mut self, report: &TaskReport) -> Result<(), MlError> {
        let file = report.task.file_name();
        let path = self.dir.join(&file);
        self.write_json(&path, report)?;
        tracing::info!(task = %report.task, path = %path.display(), "Fields exported");

        self.entries.retain(|e| e.task != report.task);
        self.entries.push(ManifestEntry {
            task: report.task,
            title: report.title.clone(),
            file,
            models: report.model_names(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), MlError> {
        let manifest = Manifest {
            generated_at: Utc::now(),
            tasks: self.entries.clone(),
        };
        self.write_json(&self.manifest_path(), &manifest)
    }
}

/// Run `tasks` in order, feeding each report to `sink`, then finish the sink.
pub fn run_into(
    tasks: &[TaskId],
    config: &crate::config::VizConfig,
    sink: &mut dyn FieldSink,
) -> Result<(), MlError> {
    for &task in tasks {
        let report = crate::tasks::run_task(task, config)?;
        sink.accept(&report)?;
    }
    tracing::debug!(tasks = tasks.len(), "Run delivered to sink");
    sink.finish()
}
