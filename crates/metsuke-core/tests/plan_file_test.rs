//! Loads the repository's own `PROJECT_PLAN.yaml` end to end.

use std::path::PathBuf;

use metsuke_core::plan::load_plan;
use metsuke_core::{TaskPriority, TaskStatus, TaskSummary, analysis};

fn repository_plan() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join("PROJECT_PLAN.yaml")
}

#[test]
fn repository_plan_loads() {
    let snapshot = load_plan(&repository_plan()).unwrap();

    assert_eq!(snapshot.project.name, "Metsuke");
    assert_eq!(snapshot.project.version, "0.1.0");
    assert!(snapshot.context.contains("terminal dashboard"));
    assert_eq!(snapshot.tasks.len(), 7);

    let loader = snapshot.task(4).unwrap();
    assert_eq!(loader.status, TaskStatus::InProgress);
    assert_eq!(loader.priority, TaskPriority::High);
    assert_eq!(loader.dependencies, vec![1, 2, 3]);
    assert!(snapshot.task(6).unwrap().description.is_none());
}

#[test]
fn repository_plan_metrics() {
    let snapshot = load_plan(&repository_plan()).unwrap();
    let metrics = analysis::compute(&snapshot.tasks);

    // 4 and 7 have no unmet deps; 5 and 6 wait on 4.
    assert_eq!(metrics.ready_to_work, 2);
    assert_eq!(metrics.blocked_by_deps, 2);
    // 1 and 4 both have two dependents; 1 is referenced first.
    assert_eq!(metrics.most_depended_on_id, Some(1));
    assert_eq!(metrics.most_depended_on_count, 2);
    assert_eq!(metrics.next_task.as_ref().map(|t| t.id), Some(4));

    let summary = TaskSummary::from_tasks(&snapshot.tasks);
    assert_eq!(summary.total, 7);
    assert_eq!(summary.done, 3);
}
