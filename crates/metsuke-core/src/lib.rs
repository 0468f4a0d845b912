//! Core engine for the Metsuke plan dashboard.
//!
//! - [`plan`] loads and validates `PROJECT_PLAN.yaml` into immutable snapshots.
//! - [`analysis`] derives dependency metrics and the next task to work on.
//! - [`watcher`] watches the plan file's directory on a background thread.
//! - [`reload`] serializes reloads and publishes results to a [`PlanObserver`].
//! - [`session`] wires the above into an initialize/shutdown lifecycle.
//! - [`logging`] captures `tracing` output for the dashboard's log panel.

pub mod analysis;
pub mod logging;
pub mod observer;
pub mod plan;
pub mod reload;
pub mod session;
pub mod watcher;

pub use analysis::{DependencyMetrics, TaskReadiness, TaskSummary};
pub use logging::LogBuffer;
pub use observer::{NoopObserver, PlanObserver, SessionError};
pub use plan::{PlanError, PlanSnapshot, SharedSnapshot, Task, TaskPriority, TaskStatus};
pub use reload::{ReloadCoordinator, ReloadHandle, ReloadState, ReloadStats, ReloadTrigger};
pub use session::PlanSession;
pub use watcher::{ChangeWatcher, WatchError, WatchStatus};
