//! Plan YAML loader with validation.
//!
//! Reads a `PROJECT_PLAN.yaml` file into a [`PlanSnapshot`] and validates:
//! - The document is a mapping with a `project` mapping and a `tasks` sequence.
//! - Every task is a mapping with an integer `id`.
//!
//! Repeated task ids are kept as listed. `dependencies` entries that are not
//! ids are kept as text in [`Task::invalid_dependencies`] rather than failing
//! the load.
//!
//! The loader never logs; callers decide how to report a [`PlanError`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use super::model::{PlanSnapshot, ProjectMeta, Task, TaskId, TaskPriority, TaskStatus};

/// Default plan file name, looked up relative to the working directory.
pub const DEFAULT_PLAN_FILE: &str = "PROJECT_PLAN.yaml";

const MISSING_TITLE: &str = "No Title";
const MISSING_META: &str = "N/A";

/// Errors that can occur while loading a plan file.
///
/// Sources are held behind `Arc` so the error can be cloned into the
/// coordinator's `Failed` state and handed to observers.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("plan file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("YAML parse error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Arc<serde_yaml::Error>,
    },

    #[error("invalid plan {}: {issue}", path.display())]
    Validation { path: PathBuf, issue: PlanIssue },

    #[error("loading {} panicked: {message}", path.display())]
    LoadPanicked { path: PathBuf, message: String },
}

impl PlanError {
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::Validation { path, .. }
            | Self::LoadPanicked { path, .. } => path,
        }
    }
}

/// Structural problems found in an otherwise well-formed YAML document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanIssue {
    #[error("document is empty")]
    EmptyDocument,

    #[error("top level must be a mapping")]
    NotAMapping,

    #[error("missing `project` mapping")]
    MissingProject,

    #[error("missing `tasks` sequence")]
    MissingTasks,

    #[error("task #{index} is not a mapping")]
    TaskNotAMapping { index: usize },

    #[error("task #{index} has no integer `id`")]
    MissingTaskId { index: usize },
}

/// Something the reload coordinator can load snapshots from.
///
/// [`PlanFile`] is the production implementation; tests substitute their own.
pub trait PlanSource: Send + Sync + 'static {
    /// Path reported in logs and errors.
    fn path(&self) -> &Path;

    /// Produce a fresh snapshot. Called off the rendering thread.
    fn load(&self) -> Result<PlanSnapshot, PlanError>;
}

/// A plan file on disk.
#[derive(Debug, Clone)]
pub struct PlanFile {
    path: PathBuf,
}

impl PlanFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PlanSource for PlanFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<PlanSnapshot, PlanError> {
        load_plan(&self.path)
    }
}

/// Read and validate the plan file at `path`.
pub fn load_plan(path: &Path) -> Result<PlanSnapshot, PlanError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            PlanError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            PlanError::Io {
                path: path.to_path_buf(),
                source: Arc::new(e),
            }
        }
    })?;
    parse_plan(&content, path)
}

/// Parse and validate plan YAML. `path` is only used for error reporting.
pub fn parse_plan(content: &str, path: &Path) -> Result<PlanSnapshot, PlanError> {
    if content.trim().is_empty() {
        return Err(PlanError::Validation {
            path: path.to_path_buf(),
            issue: PlanIssue::EmptyDocument,
        });
    }
    let document: Value = serde_yaml::from_str(content).map_err(|e| PlanError::Parse {
        path: path.to_path_buf(),
        source: Arc::new(e),
    })?;
    build_snapshot(&document).map_err(|issue| PlanError::Validation {
        path: path.to_path_buf(),
        issue,
    })
}

fn build_snapshot(document: &Value) -> Result<PlanSnapshot, PlanIssue> {
    let root = match document {
        Value::Null => return Err(PlanIssue::EmptyDocument),
        Value::Mapping(map) => map,
        _ => return Err(PlanIssue::NotAMapping),
    };

    let project = root
        .get("project")
        .and_then(Value::as_mapping)
        .ok_or(PlanIssue::MissingProject)?;
    let entries = root
        .get("tasks")
        .and_then(Value::as_sequence)
        .ok_or(PlanIssue::MissingTasks)?;

    let tasks = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| build_task(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    let context = root
        .get("context")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(PlanSnapshot {
        project: ProjectMeta {
            name: scalar_text(project.get("name")).unwrap_or_else(|| MISSING_META.to_string()),
            version: scalar_text(project.get("version"))
                .unwrap_or_else(|| MISSING_META.to_string()),
        },
        tasks,
        context,
        loaded_at: Utc::now(),
    })
}

fn build_task(index: usize, entry: &Value) -> Result<Task, PlanIssue> {
    let map: &Mapping = entry
        .as_mapping()
        .ok_or(PlanIssue::TaskNotAMapping { index })?;

    let id = map
        .get("id")
        .and_then(task_id)
        .ok_or(PlanIssue::MissingTaskId { index })?;

    let entries: &[Value] = match map.get("dependencies") {
        None | Some(Value::Null) => &[],
        Some(Value::Sequence(deps)) => deps,
        // A single scalar is treated as a one-element list.
        Some(other) => std::slice::from_ref(other),
    };
    let mut dependencies = Vec::with_capacity(entries.len());
    let mut invalid_dependencies = Vec::new();
    for dep in entries {
        match task_id(dep) {
            Some(dep_id) => dependencies.push(dep_id),
            None => invalid_dependencies.push(entry_text(dep)),
        }
    }

    Ok(Task {
        id,
        title: scalar_text(map.get("title")).unwrap_or_else(|| MISSING_TITLE.to_string()),
        description: scalar_text(map.get("description")),
        status: TaskStatus::from_plan_value(map.get("status").and_then(Value::as_str)),
        priority: TaskPriority::from_plan_value(map.get("priority").and_then(Value::as_str)),
        dependencies,
        invalid_dependencies,
    })
}

/// Resolve an id from an integer or a string of digits.
fn task_id(value: &Value) -> Option<TaskId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Render a scalar as text; `None` for null, sequences and mappings.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Display text for a dependency entry that is not an id.
fn entry_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        other => scalar_text(Some(other)).unwrap_or_else(|| "?".to_string()),
    }
}
