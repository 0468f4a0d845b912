//! Plan data types.
//!
//! These are the validated, immutable in-memory forms of a `PROJECT_PLAN.yaml`
//! document. Raw YAML is turned into them by [`super::loader`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task identifier as written in the plan file.
pub type TaskId = i64;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Status of a task.
///
/// Unrecognized or missing values load as [`TaskStatus::Unknown`]; that
/// variant exists for display only and carries no meaning in the
/// dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Done")]
    Done,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "blocked")]
    Blocked,
    #[serde(rename = "unknown")]
    Unknown,
}

impl TaskStatus {
    pub fn is_done(self) -> bool {
        self == Self::Done
    }

    /// Parse a status as written in the plan file, falling back to
    /// [`TaskStatus::Unknown`].
    pub fn from_plan_value(value: Option<&str>) -> Self {
        value
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Done => "Done",
            Self::InProgress => "in_progress",
            Self::Pending => "pending",
            Self::Blocked => "blocked",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Done" => Ok(Self::Done),
            "in_progress" => Ok(Self::InProgress),
            "pending" => Ok(Self::Pending),
            "blocked" => Ok(Self::Blocked),
            other => Err(TaskStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskStatus`] string.
#[derive(Debug, Clone)]
pub struct TaskStatusParseError(pub String);

impl fmt::Display for TaskStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task status: {:?}", self.0)
    }
}

impl std::error::Error for TaskStatusParseError {}

// ---------------------------------------------------------------------------

/// Priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
    Unknown,
}

impl TaskPriority {
    /// Sort rank used when picking the next task: lower ranks first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
            Self::Unknown => 99,
        }
    }

    /// Parse a priority as written in the plan file, falling back to
    /// [`TaskPriority::Unknown`].
    pub fn from_plan_value(value: Option<&str>) -> Self {
        value
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskPriority {
    type Err = TaskPriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(TaskPriorityParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskPriority`] string.
#[derive(Debug, Clone)]
pub struct TaskPriorityParseError(pub String);

impl fmt::Display for TaskPriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task priority: {:?}", self.0)
    }
}

impl std::error::Error for TaskPriorityParseError {}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Project metadata from the `project:` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub name: String,
    pub version: String,
}

/// A single entry of the `tasks:` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Ids this task waits on. May name tasks that do not exist.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    /// Dependency entries that are not task ids, as written. They can never
    /// be met, so they keep the task blocked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_dependencies: Vec<String>,
}

impl Task {
    /// Total dependency entries, valid or not.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len() + self.invalid_dependencies.len()
    }

    /// Dependencies joined for display, or `"None"`.
    pub fn dependencies_label(&self) -> String {
        if self.dependency_count() == 0 {
            return "None".to_string();
        }
        self.dependencies
            .iter()
            .map(|d| d.to_string())
            .chain(self.invalid_dependencies.iter().cloned())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One fully loaded, validated reading of the plan file.
///
/// Snapshots are never mutated; a reload produces a new one that replaces
/// the old one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSnapshot {
    pub project: ProjectMeta,
    pub tasks: Vec<Task>,
    /// Free-text `context:` block, empty when absent.
    pub context: String,
    pub loaded_at: DateTime<Utc>,
}

impl PlanSnapshot {
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn into_shared(self) -> SharedSnapshot {
        Arc::new(self)
    }
}

/// Snapshot handle handed to observers.
pub type SharedSnapshot = Arc<PlanSnapshot>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_plan_spellings() {
        assert_eq!("Done".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("done".parse::<TaskStatus>().is_err());
        assert_eq!(TaskStatus::from_plan_value(Some("done")), TaskStatus::Unknown);
        assert_eq!(
            "in_progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert!("finished".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn unknown_values_fall_back() {
        assert_eq!(TaskStatus::from_plan_value(Some("review")), TaskStatus::Unknown);
        assert_eq!(TaskStatus::from_plan_value(None), TaskStatus::Unknown);
        assert_eq!(TaskPriority::from_plan_value(Some("urgent")), TaskPriority::Unknown);
    }

    #[test]
    fn priority_rank_order() {
        assert!(TaskPriority::High.rank() < TaskPriority::Medium.rank());
        assert!(TaskPriority::Medium.rank() < TaskPriority::Low.rank());
        assert_eq!(TaskPriority::Unknown.rank(), 99);
    }

    #[test]
    fn display_matches_plan_spelling() {
        for status in [
            TaskStatus::Done,
            TaskStatus::InProgress,
            TaskStatus::Pending,
            TaskStatus::Blocked,
        ] {
            assert_eq!(status.to_string().parse::<TaskStatus>().unwrap(), status);
        }
    }

    #[test]
    fn dependencies_label() {
        let mut task = Task {
            id: 1,
            title: "t".into(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Low,
            dependencies: vec![],
            invalid_dependencies: vec![],
        };
        assert_eq!(task.dependencies_label(), "None");
        task.dependencies = vec![3, 7];
        assert_eq!(task.dependencies_label(), "3, 7");
        task.invalid_dependencies = vec!["later".into()];
        assert_eq!(task.dependencies_label(), "3, 7, later");
        assert_eq!(task.dependency_count(), 3);
    }
}
