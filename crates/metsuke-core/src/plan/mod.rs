//! Plan file model and loading.

pub mod loader;
pub mod model;

pub use loader::{
    DEFAULT_PLAN_FILE, PlanError, PlanFile, PlanIssue, PlanSource, load_plan, parse_plan,
};
pub use model::{
    PlanSnapshot, ProjectMeta, SharedSnapshot, Task, TaskId, TaskPriority, TaskStatus,
};
