//! TUI application state.
//!
//! [`App`] is the dashboard's [`PlanObserver`]: the session publishes into it
//! from the UI thread, and the renderer only ever reads from it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};

use metsuke_core::{
    DependencyMetrics, LogBuffer, PlanObserver, SessionError, SharedSnapshot, TaskSummary,
};

use crate::config::MetsukeConfig;

/// Which view the TUI is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Help,
}

/// Application state for the TUI.
pub struct App {
    pub plan_path: PathBuf,
    pub current_view: View,
    pub snapshot: Option<SharedSnapshot>,
    pub metrics: DependencyMetrics,
    pub summary: TaskSummary,
    pub last_loaded: Option<DateTime<Local>>,
    pub last_error: Option<String>,
    pub selected_task: usize,
    pub show_log: bool,
    pub logs: LogBuffer,
    pub tick_rate: Duration,
    pub should_quit: bool,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(config: &MetsukeConfig, logs: LogBuffer) -> Self {
        Self {
            plan_path: config.plan_path.clone(),
            current_view: View::Dashboard,
            snapshot: None,
            metrics: DependencyMetrics::default(),
            summary: TaskSummary::default(),
            last_loaded: None,
            last_error: None,
            selected_task: 0,
            show_log: config.show_log,
            logs,
            tick_rate: config.tick_rate,
            should_quit: false,
            status_message: None,
        }
    }

    pub fn task_count(&self) -> usize {
        self.snapshot.as_ref().map_or(0, |s| s.tasks.len())
    }

    /// Plan context for the help view.
    pub fn context(&self) -> &str {
        self.snapshot.as_ref().map_or("", |s| s.context.as_str())
    }

    // -- Navigation --

    pub fn navigate_back(&mut self) {
        match self.current_view {
            View::Dashboard => self.should_quit = true,
            View::Help => self.current_view = View::Dashboard,
        }
    }

    pub fn show_help(&mut self) {
        self.current_view = View::Help;
    }

    pub fn toggle_log(&mut self) {
        self.show_log = !self.show_log;
        tracing::info!(
            visible = self.show_log,
            "log view display toggled {}",
            if self.show_log { "on" } else { "off" }
        );
    }

    pub fn move_up(&mut self) {
        if self.current_view == View::Dashboard && self.selected_task > 0 {
            self.selected_task -= 1;
        }
    }

    pub fn move_down(&mut self) {
        let count = self.task_count();
        if self.current_view == View::Dashboard && count > 0 && self.selected_task < count - 1 {
            self.selected_task += 1;
        }
    }

    fn clamp_selection(&mut self) {
        let count = self.task_count();
        if self.selected_task >= count {
            self.selected_task = count.saturating_sub(1);
        }
    }
}

impl PlanObserver for App {
    fn on_snapshot_published(&mut self, snapshot: &SharedSnapshot) {
        self.summary = TaskSummary::from_tasks(&snapshot.tasks);
        self.snapshot = Some(Arc::clone(snapshot));
        self.last_loaded = Some(snapshot.loaded_at.with_timezone(&Local));
        self.last_error = None;
        self.clamp_selection();
    }

    fn on_metrics_computed(&mut self, metrics: &DependencyMetrics) {
        self.metrics = metrics.clone();
    }

    fn on_error(&mut self, error: &SessionError) {
        // The last good snapshot stays on screen.
        self.last_error = Some(error.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
