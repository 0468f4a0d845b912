//! `metsuke status` command: one-shot load and summary of the plan.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use metsuke_core::plan::{ProjectMeta, load_plan};
use metsuke_core::{DependencyMetrics, PlanSnapshot, TaskSummary, analysis};

/// Machine-readable form of `metsuke status --json`.
#[derive(Debug, Serialize)]
pub struct StatusReport<'a> {
    pub path: &'a Path,
    pub project: &'a ProjectMeta,
    pub progress_percent: f64,
    pub summary: TaskSummary,
    pub metrics: DependencyMetrics,
}

impl<'a> StatusReport<'a> {
    pub fn new(path: &'a Path, snapshot: &'a PlanSnapshot) -> Self {
        let summary = TaskSummary::from_tasks(&snapshot.tasks);
        Self {
            path,
            project: &snapshot.project,
            progress_percent: summary.progress_percent(),
            summary,
            metrics: analysis::compute(&snapshot.tasks),
        }
    }
}

/// Run the status command.
pub fn run_status(path: &Path, json: bool) -> Result<()> {
    let snapshot =
        load_plan(path).with_context(|| format!("failed to load plan {}", path.display()))?;
    let report = StatusReport::new(path, &snapshot);

    if json {
        let out = serde_json::to_string_pretty(&report).context("failed to serialize status")?;
        println!("{out}");
    } else {
        print!("{report}");
    }
    Ok(())
}

/// Plain-text rendering, laid out like the dashboard panels.
impl fmt::Display for StatusReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        let m = &self.metrics;

        writeln!(
            f,
            "Project: {} (version {})",
            self.project.name, self.project.version
        )?;
        writeln!(f, "Plan: {}", self.path.display())?;
        writeln!(f)?;

        if s.total == 0 {
            return writeln!(f, "No tasks found.");
        }

        writeln!(
            f,
            "Progress: {}/{} ({:.1}%)",
            s.done, s.total, self.progress_percent
        )?;
        writeln!(
            f,
            "  Done: {} | In Progress: {} | Pending: {} | Blocked: {}",
            s.done, s.in_progress, s.pending, s.blocked
        )?;
        writeln!(f)?;

        writeln!(f, "Priority Breakdown:")?;
        writeln!(f, "  High priority: {}", s.high)?;
        writeln!(f, "  Medium priority: {}", s.medium)?;
        writeln!(f, "  Low priority: {}", s.low)?;
        writeln!(f)?;

        writeln!(f, "Dependency Metrics:")?;
        writeln!(f, "  Tasks with no dependencies: {}", m.tasks_with_no_deps)?;
        writeln!(f, "  Tasks ready to work on: {}", m.ready_to_work)?;
        writeln!(f, "  Tasks blocked by dependencies: {}", m.blocked_by_deps)?;
        if let Some(id) = m.most_depended_on_id {
            writeln!(
                f,
                "  Most depended-on task: #{id} ({} dependents)",
                m.most_depended_on_count
            )?;
        }
        writeln!(f, "  Avg dependencies per task: {:.1}", m.avg_deps_per_task)?;
        writeln!(f)?;

        writeln!(f, "Next Task to Work On:")?;
        match &m.next_task {
            Some(task) => {
                writeln!(f, "  #{} {}", task.id, task.title)?;
                writeln!(f, "  Priority: {}", task.priority)?;
                writeln!(f, "  Dependencies: {}", task.dependencies_label())
            }
            None => writeln!(f, "  N/A - No task available"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use metsuke_core::plan::parse_plan;

    use super::*;

    const PLAN: &str = "\
project:
  name: Demo
  version: 2.0.0
tasks:
  - id: 1
    title: Root
    status: Done
    priority: high
    dependencies: []
  - id: 2
    title: Build it
    status: pending
    priority: medium
    dependencies: [1]
  - id: 3
    title: Ship it
    status: pending
    priority: high
    dependencies: [2]
";

    fn snapshot() -> PlanSnapshot {
        parse_plan(PLAN, Path::new("PROJECT_PLAN.yaml")).unwrap()
    }

    #[test]
    fn text_report_lists_metrics_and_next_task() {
        let snapshot = snapshot();
        let path = PathBuf::from("PROJECT_PLAN.yaml");
        let text = StatusReport::new(&path, &snapshot).to_string();

        assert!(text.contains("Project: Demo (version 2.0.0)"));
        assert!(text.contains("Progress: 1/3 (33.3%)"));
        assert!(text.contains("Done: 1 | In Progress: 0 | Pending: 2 | Blocked: 0"));
        assert!(text.contains("High priority: 2"));
        assert!(text.contains("Tasks ready to work on: 1"));
        assert!(text.contains("Tasks blocked by dependencies: 1"));
        assert!(text.contains("Most depended-on task: #1 (1 dependents)"));
        assert!(text.contains("#2 Build it"));
        assert!(text.contains("Dependencies: 1"));
    }

    #[test]
    fn text_report_for_empty_plan() {
        let snapshot =
            parse_plan("project:\n  name: Empty\ntasks: []\n", Path::new("p.yaml")).unwrap();
        let path = PathBuf::from("p.yaml");
        let text = StatusReport::new(&path, &snapshot).to_string();

        assert!(text.contains("Project: Empty (version N/A)"));
        assert!(text.contains("No tasks found."));
        assert!(!text.contains("Next Task"));
    }

    #[test]
    fn text_report_without_ready_task() {
        let yaml = "\
project: {name: Stuck}
tasks:
  - {id: 1, title: Wait, status: pending, priority: high, dependencies: [9, later]}
";
        let snapshot = parse_plan(yaml, Path::new("p.yaml")).unwrap();
        let path = PathBuf::from("p.yaml");
        let text = format!("{}", StatusReport::new(&path, &snapshot));

        assert!(text.contains("Tasks blocked by dependencies: 1"));
        assert!(text.contains("Most depended-on task: #9 (1 dependents)"));
        assert!(text.contains("Avg dependencies per task: 2.0"));
        assert!(text.ends_with("Next Task to Work On:\n  N/A - No task available\n"));
    }

    #[test]
    fn json_report_has_stable_fields() {
        let snapshot = snapshot();
        let path = PathBuf::from("PROJECT_PLAN.yaml");
        let value = serde_json::to_value(StatusReport::new(&path, &snapshot)).unwrap();

        assert_eq!(value["project"]["name"], "Demo");
        assert_eq!(value["summary"]["total"], 3);
        assert_eq!(value["metrics"]["ready_to_work"], 1);
        assert_eq!(value["metrics"]["next_task"]["id"], 2);
        assert_eq!(value["metrics"]["next_task"]["priority"], "medium");
    }

    #[test]
    fn missing_plan_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = run_status(&tmp.path().join("PROJECT_PLAN.yaml"), false).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load plan"));
    }
}
