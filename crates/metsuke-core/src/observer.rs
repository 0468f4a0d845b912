//! The interface the presentation layer implements to receive reload results.

use thiserror::Error;

use crate::analysis::DependencyMetrics;
use crate::plan::{PlanError, SharedSnapshot};
use crate::watcher::WatchError;

/// Any non-fatal failure surfaced to the presentation layer.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// Receives every publish and every failure, on the thread that drives the
/// coordinator.
///
/// For each successful reload the coordinator calls
/// [`on_snapshot_published`](Self::on_snapshot_published) and then
/// [`on_metrics_computed`](Self::on_metrics_computed), exactly once each.
pub trait PlanObserver {
    fn on_snapshot_published(&mut self, snapshot: &SharedSnapshot);

    fn on_metrics_computed(&mut self, metrics: &DependencyMetrics);

    fn on_error(&mut self, error: &SessionError);
}

/// Observer that ignores everything. Useful when only the coordinator's own
/// state is of interest.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PlanObserver for NoopObserver {
    fn on_snapshot_published(&mut self, _snapshot: &SharedSnapshot) {}

    fn on_metrics_computed(&mut self, _metrics: &DependencyMetrics) {}

    fn on_error(&mut self, _error: &SessionError) {}
}

// Compile-time assertion: PlanObserver must be usable as a trait object.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanObserver) {}
};
