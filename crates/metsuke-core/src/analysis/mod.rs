//! Dependency metrics over a plan's task list.
//!
//! Everything here is a pure function of the task slice: the same tasks in
//! the same order always produce identical results, including tie-breaks.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::plan::{Task, TaskId, TaskPriority, TaskStatus};

/// Aggregate dependency metrics and the recommended next task.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DependencyMetrics {
    /// Tasks whose dependency list is empty.
    pub tasks_with_no_deps: usize,
    /// Non-Done tasks whose dependencies are all Done.
    pub ready_to_work: usize,
    /// Non-Done tasks with at least one unmet or dangling dependency.
    pub blocked_by_deps: usize,
    /// The id referenced by the most dependency lists. May be dangling.
    pub most_depended_on_id: Option<TaskId>,
    pub most_depended_on_count: usize,
    pub avg_deps_per_task: f64,
    pub next_task: Option<Task>,
}

/// How a single task stands with respect to its dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskReadiness {
    Done,
    Ready,
    /// Dependency ids that are not Done, in declaration order. Empty when
    /// only invalid entries block the task.
    Blocked { unmet: Vec<TaskId> },
}

/// Ids of every Done task.
pub fn done_ids(tasks: &[Task]) -> HashSet<TaskId> {
    tasks
        .iter()
        .filter(|t| t.status.is_done())
        .map(|t| t.id)
        .collect()
}

/// Classify one task. Dangling ids and invalid entries are never Done, so
/// they block for as long as they are listed.
pub fn readiness(task: &Task, done: &HashSet<TaskId>) -> TaskReadiness {
    if task.status.is_done() {
        return TaskReadiness::Done;
    }
    let unmet: Vec<TaskId> = task
        .dependencies
        .iter()
        .copied()
        .filter(|dep| !done.contains(dep))
        .collect();
    if unmet.is_empty() && task.invalid_dependencies.is_empty() {
        TaskReadiness::Ready
    } else {
        TaskReadiness::Blocked { unmet }
    }
}

/// Compute [`DependencyMetrics`] for `tasks`.
pub fn compute(tasks: &[Task]) -> DependencyMetrics {
    if tasks.is_empty() {
        return DependencyMetrics::default();
    }

    let done = done_ids(tasks);

    // Dependents counter kept in first-seen order so ties resolve the same
    // way on every run.
    let mut dependents: Vec<(TaskId, usize)> = Vec::new();
    let mut slot: HashMap<TaskId, usize> = HashMap::new();

    let mut total_deps = 0usize;
    let mut no_deps = 0usize;
    let mut blocked = 0usize;
    let mut ready: Vec<&Task> = Vec::new();

    for task in tasks {
        total_deps += task.dependency_count();
        if task.dependency_count() == 0 {
            no_deps += 1;
        }

        for dep in &task.dependencies {
            let idx = *slot.entry(*dep).or_insert_with(|| {
                dependents.push((*dep, 0));
                dependents.len() - 1
            });
            dependents[idx].1 += 1;
        }

        match readiness(task, &done) {
            TaskReadiness::Done => {}
            TaskReadiness::Ready => ready.push(task),
            TaskReadiness::Blocked { .. } => blocked += 1,
        }
    }

    let mut most: Option<(TaskId, usize)> = None;
    for &(id, count) in &dependents {
        if most.is_none_or(|(_, best)| count > best) {
            most = Some((id, count));
        }
    }

    let next_task = ready
        .iter()
        .min_by_key(|t| (t.priority.rank(), t.id))
        .map(|t| (*t).clone());

    DependencyMetrics {
        tasks_with_no_deps: no_deps,
        ready_to_work: ready.len(),
        blocked_by_deps: blocked,
        most_depended_on_id: most.map(|(id, _)| id),
        most_depended_on_count: most.map(|(_, count)| count).unwrap_or(0),
        avg_deps_per_task: total_deps as f64 / tasks.len() as f64,
        next_task,
    }
}

/// Status and priority counts behind the progress and priority panels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub total: usize,
    pub done: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub blocked: usize,
    pub unknown_status: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown_priority: usize,
}

impl TaskSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut summary = Self {
            total: tasks.len(),
            ..Self::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Done => summary.done += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::Blocked => summary.blocked += 1,
                TaskStatus::Unknown => summary.unknown_status += 1,
            }
            match task.priority {
                TaskPriority::High => summary.high += 1,
                TaskPriority::Medium => summary.medium += 1,
                TaskPriority::Low => summary.low += 1,
                TaskPriority::Unknown => summary.unknown_priority += 1,
            }
        }
        summary
    }

    /// Percentage of Done tasks, 0.0 for an empty plan.
    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.done as f64 / self.total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: TaskId, status: TaskStatus, priority: TaskPriority, deps: &[TaskId]) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: None,
            status,
            priority,
            dependencies: deps.to_vec(),
            invalid_dependencies: vec![],
        }
    }

    fn pending(id: TaskId, priority: TaskPriority, deps: &[TaskId]) -> Task {
        task(id, TaskStatus::Pending, priority, deps)
    }

    #[test]
    fn empty_task_list() {
        let m = compute(&[]);
        assert_eq!(m, DependencyMetrics::default());
        assert!(m.next_task.is_none());
        assert_eq!(m.avg_deps_per_task, 0.0);
    }

    #[test]
    fn next_task_prefers_priority_then_lowest_id() {
        let tasks = vec![
            pending(3, TaskPriority::Low, &[]),
            pending(1, TaskPriority::High, &[]),
            pending(2, TaskPriority::High, &[]),
        ];
        let m = compute(&tasks);
        assert_eq!(m.next_task.map(|t| t.id), Some(1));
        assert_eq!(m.ready_to_work, 3);
    }

    #[test]
    fn unknown_priority_ranks_last() {
        let tasks = vec![
            pending(1, TaskPriority::Unknown, &[]),
            pending(9, TaskPriority::Low, &[]),
        ];
        assert_eq!(compute(&tasks).next_task.map(|t| t.id), Some(9));
    }

    #[test]
    fn chain_marks_dependent_blocked() {
        let tasks = vec![
            pending(1, TaskPriority::Medium, &[]),
            pending(2, TaskPriority::High, &[1]),
        ];
        let m = compute(&tasks);
        assert_eq!(m.ready_to_work, 1);
        assert_eq!(m.blocked_by_deps, 1);
        assert_eq!(m.most_depended_on_id, Some(1));
        assert_eq!(m.most_depended_on_count, 1);
        assert_eq!(m.next_task.map(|t| t.id), Some(1));
        assert_eq!(m.avg_deps_per_task, 0.5);
    }

    #[test]
    fn done_dependency_unblocks() {
        let tasks = vec![
            task(1, TaskStatus::Done, TaskPriority::High, &[]),
            pending(2, TaskPriority::Low, &[1]),
        ];
        let m = compute(&tasks);
        assert_eq!(m.ready_to_work, 1);
        assert_eq!(m.blocked_by_deps, 0);
        assert_eq!(m.next_task.map(|t| t.id), Some(2));
    }

    #[test]
    fn lowercase_done_does_not_unblock_dependent() {
        let yaml = "\
project:
  name: Case
tasks:
  - id: 1
    status: done
    priority: high
  - id: 2
    status: pending
    priority: low
    dependencies: [1]
";
        let snapshot = crate::plan::parse_plan(yaml, std::path::Path::new("plan.yaml")).unwrap();
        assert_eq!(snapshot.tasks[0].status, TaskStatus::Unknown);

        let m = compute(&snapshot.tasks);
        assert_eq!(m.ready_to_work, 1);
        assert_eq!(m.blocked_by_deps, 1);
        assert_eq!(m.next_task.map(|t| t.id), Some(1));
        assert_eq!(TaskSummary::from_tasks(&snapshot.tasks).done, 0);
    }

    #[test]
    fn invalid_dependency_entry_blocks_without_a_dependent_count() {
        let mut waiting = pending(2, TaskPriority::High, &[1]);
        waiting.invalid_dependencies = vec!["x".into()];
        let tasks = vec![task(1, TaskStatus::Done, TaskPriority::Low, &[]), waiting];

        let m = compute(&tasks);
        assert_eq!(m.ready_to_work, 0);
        assert_eq!(m.blocked_by_deps, 1);
        assert_eq!(m.tasks_with_no_deps, 1);
        assert_eq!(m.avg_deps_per_task, 1.0);
        assert_eq!(m.most_depended_on_id, Some(1));
        assert_eq!(m.most_depended_on_count, 1);
        assert!(m.next_task.is_none());
        assert_eq!(
            readiness(&tasks[1], &done_ids(&tasks)),
            TaskReadiness::Blocked { unmet: vec![] }
        );
    }

    #[test]
    fn repeated_id_counts_done_if_any_copy_is_done() {
        let tasks = vec![
            task(1, TaskStatus::Pending, TaskPriority::High, &[]),
            task(1, TaskStatus::Done, TaskPriority::High, &[]),
            pending(2, TaskPriority::Low, &[1]),
        ];
        let m = compute(&tasks);
        assert_eq!(m.ready_to_work, 2);
        assert_eq!(m.blocked_by_deps, 0);
        assert_eq!(m.next_task.map(|t| t.id), Some(1));
    }

    #[test]
    fn dangling_dependency_always_blocks_and_is_counted() {
        let tasks = vec![
            task(1, TaskStatus::Done, TaskPriority::High, &[]),
            pending(2, TaskPriority::High, &[1, 99]),
            pending(3, TaskPriority::High, &[99]),
        ];
        let m = compute(&tasks);
        assert_eq!(m.blocked_by_deps, 2);
        assert_eq!(m.ready_to_work, 0);
        assert!(m.next_task.is_none());
        assert_eq!(m.most_depended_on_id, Some(99));
        assert_eq!(m.most_depended_on_count, 2);
    }

    #[test]
    fn most_depended_on_tie_goes_to_first_seen() {
        // 5 is referenced first (by task 1), then 4; both end with two
        // dependents.
        let tasks = vec![
            pending(1, TaskPriority::Low, &[5, 4]),
            pending(2, TaskPriority::Low, &[4]),
            pending(3, TaskPriority::Low, &[5]),
            pending(4, TaskPriority::Low, &[]),
            pending(5, TaskPriority::Low, &[]),
        ];
        let m = compute(&tasks);
        assert_eq!(m.most_depended_on_id, Some(5));
        assert_eq!(m.most_depended_on_count, 2);
    }

    #[test]
    fn no_dependencies_anywhere() {
        let tasks = vec![
            pending(1, TaskPriority::Low, &[]),
            task(2, TaskStatus::Done, TaskPriority::Low, &[]),
            task(3, TaskStatus::InProgress, TaskPriority::Low, &[]),
        ];
        let m = compute(&tasks);
        assert_eq!(m.tasks_with_no_deps, 3);
        assert_eq!(m.blocked_by_deps, 0);
        assert!(m.most_depended_on_id.is_none());
        assert_eq!(m.most_depended_on_count, 0);
    }

    #[test]
    fn done_tasks_are_neither_ready_nor_blocked() {
        let tasks = vec![
            task(1, TaskStatus::Done, TaskPriority::High, &[42]),
            pending(2, TaskPriority::High, &[42]),
            task(3, TaskStatus::Blocked, TaskPriority::Low, &[]),
        ];
        let m = compute(&tasks);
        let done = tasks.iter().filter(|t| t.status.is_done()).count();
        assert_eq!(m.ready_to_work + m.blocked_by_deps + done, tasks.len());
        // A task marked `blocked` with no deps is still ready by the graph.
        assert_eq!(m.ready_to_work, 1);
        assert_eq!(m.blocked_by_deps, 1);
    }

    #[test]
    fn compute_is_deterministic() {
        let tasks = vec![
            pending(10, TaskPriority::Medium, &[3, 2]),
            pending(2, TaskPriority::Medium, &[3]),
            task(3, TaskStatus::Done, TaskPriority::High, &[]),
            pending(4, TaskPriority::Medium, &[2, 3]),
        ];
        let first = compute(&tasks);
        for _ in 0..10 {
            assert_eq!(compute(&tasks), first);
        }
    }

    #[test]
    fn readiness_lists_unmet_in_order() {
        let done: HashSet<TaskId> = [1].into_iter().collect();
        let t = pending(5, TaskPriority::Low, &[3, 1, 2]);
        assert_eq!(
            readiness(&t, &done),
            TaskReadiness::Blocked { unmet: vec![3, 2] }
        );
    }

    #[test]
    fn summary_counts_and_progress() {
        let tasks = vec![
            task(1, TaskStatus::Done, TaskPriority::High, &[]),
            task(2, TaskStatus::InProgress, TaskPriority::Medium, &[]),
            task(3, TaskStatus::Pending, TaskPriority::Low, &[]),
            task(4, TaskStatus::Unknown, TaskPriority::Unknown, &[]),
        ];
        let s = TaskSummary::from_tasks(&tasks);
        assert_eq!(s.total, 4);
        assert_eq!(s.done, 1);
        assert_eq!(s.in_progress, 1);
        assert_eq!(s.unknown_status, 1);
        assert_eq!(s.high, 1);
        assert_eq!(s.unknown_priority, 1);
        assert_eq!(s.progress_percent(), 25.0);
        assert_eq!(TaskSummary::default().progress_percent(), 0.0);
    }
}
