//! Shared test utilities for metsuke integration tests.
//!
//! Provides:
//! - [`PlanDir`]: a temporary directory holding a `PROJECT_PLAN.yaml`.
//! - [`FixtureTask`] / [`plan_yaml`]: build plan documents without hand-writing YAML.
//! - [`RecordingObserver`]: a [`PlanObserver`] that remembers every callback.
//! - [`pump_until`]: drive a [`PlanSession`] until a condition holds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use metsuke_core::plan::PlanSource;
use metsuke_core::{DependencyMetrics, PlanObserver, PlanSession, SessionError, SharedSnapshot};
use tempfile::TempDir;

/// Plan file name used by the fixtures.
pub const PLAN_FILE: &str = "PROJECT_PLAN.yaml";

// -----------------------------------------------------------------------
// Plan documents
// -----------------------------------------------------------------------

/// One task line for [`plan_yaml`].
#[derive(Debug, Clone)]
pub struct FixtureTask {
    pub id: i64,
    pub title: String,
    pub status: &'static str,
    pub priority: &'static str,
    pub dependencies: Vec<i64>,
}

impl FixtureTask {
    pub fn new(id: i64, status: &'static str, priority: &'static str) -> Self {
        Self {
            id,
            title: format!("Task {id}"),
            status,
            priority,
            dependencies: Vec::new(),
        }
    }

    pub fn depends_on(mut self, deps: &[i64]) -> Self {
        self.dependencies = deps.to_vec();
        self
    }
}

/// Render a plan document for project `name` with the given tasks.
pub fn plan_yaml(name: &str, tasks: &[FixtureTask]) -> String {
    let mut out = format!("project:\n  name: {name}\n  version: 0.1.0\ncontext: |\n  Context for {name}.\ntasks:\n");
    if tasks.is_empty() {
        out.push_str("  []\n");
    }
    for task in tasks {
        let deps = task
            .dependencies
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "  - id: {}\n    title: {}\n    status: {}\n    priority: {}\n    dependencies: [{}]\n",
            task.id, task.title, task.status, task.priority, deps
        ));
    }
    out
}

/// A small plan with a done root, a ready task and a blocked task.
pub fn sample_plan_yaml() -> String {
    plan_yaml(
        "Metsuke",
        &[
            FixtureTask::new(1, "Done", "high"),
            FixtureTask::new(2, "pending", "medium").depends_on(&[1]),
            FixtureTask::new(3, "pending", "high").depends_on(&[2]),
        ],
    )
}

// -----------------------------------------------------------------------
// On-disk fixture
// -----------------------------------------------------------------------

/// Temporary directory containing a plan file. Removed on drop.
pub struct PlanDir {
    dir: TempDir,
}

impl PlanDir {
    /// Create the directory and write `content` as the plan file.
    pub fn with_plan(content: &str) -> Self {
        let fixture = Self::empty();
        fixture.write(content);
        fixture
    }

    /// Create the directory without a plan file.
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn plan_path(&self) -> PathBuf {
        self.dir.path().join(PLAN_FILE)
    }

    /// Overwrite the plan file in place.
    pub fn write(&self, content: &str) {
        std::fs::write(self.plan_path(), content).expect("failed to write plan file");
    }

    /// Write a sibling file that is not the plan.
    pub fn write_other(&self, name: &str, content: &str) {
        std::fs::write(self.dir.path().join(name), content).expect("failed to write file");
    }
}

// -----------------------------------------------------------------------
// Observer
// -----------------------------------------------------------------------

/// Observer that records every callback for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub snapshots: Vec<SharedSnapshot>,
    pub metrics: Vec<DependencyMetrics>,
    pub errors: Vec<SessionError>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_snapshot(&self) -> Option<&SharedSnapshot> {
        self.snapshots.last()
    }

    pub fn last_metrics(&self) -> Option<&DependencyMetrics> {
        self.metrics.last()
    }
}

impl PlanObserver for RecordingObserver {
    fn on_snapshot_published(&mut self, snapshot: &SharedSnapshot) {
        self.snapshots.push(snapshot.clone());
    }

    fn on_metrics_computed(&mut self, metrics: &DependencyMetrics) {
        self.metrics.push(metrics.clone());
    }

    fn on_error(&mut self, error: &SessionError) {
        self.errors.push(error.clone());
    }
}

// -----------------------------------------------------------------------
// Driving a session
// -----------------------------------------------------------------------

/// Await session messages until `done` returns true or `timeout` elapses.
///
/// Returns whether the condition was met.
pub async fn pump_until<S, F>(
    session: &mut PlanSession<S>,
    observer: &mut RecordingObserver,
    timeout: Duration,
    mut done: F,
) -> bool
where
    S: PlanSource,
    F: FnMut(&RecordingObserver) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !done(&*observer) {
        if tokio::time::timeout_at(deadline, session.next(observer))
            .await
            .is_err()
        {
            return done(&*observer);
        }
    }
    true
}
