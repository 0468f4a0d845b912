//! Process-level lifecycle for one watched plan file.
//!
//! A [`PlanSession`] ties the pieces together: it owns the
//! [`ReloadCoordinator`] and the [`ChangeWatcher`], arms the watcher with a
//! [`ReloadHandle`] so file events only enqueue reload requests, and queues
//! the initial load. The presentation layer drives it from its own thread with
//! [`PlanSession::pump`] (or awaits [`PlanSession::next`]) and calls
//! [`PlanSession::shutdown`] on exit.

use std::path::{Path, PathBuf};

use crate::observer::PlanObserver;
use crate::plan::{PlanFile, PlanSource};
use crate::reload::{ReloadCoordinator, ReloadHandle, ReloadTrigger};
use crate::watcher::{ChangeWatcher, WatchStatus};

pub struct PlanSession<S: PlanSource = PlanFile> {
    coordinator: ReloadCoordinator<S>,
    watcher: ChangeWatcher,
    plan_path: PathBuf,
    shut_down: bool,
}

impl PlanSession<PlanFile> {
    /// Start a session for the plan file at `path`.
    ///
    /// Never fails: a watcher that cannot be set up is reported through the
    /// first [`pump`](Self::pump) as an observer error, and the session keeps
    /// working with manual reloads.
    pub fn initialize(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::with_source(PlanFile::new(path.clone()), path)
    }
}

impl<S: PlanSource> PlanSession<S> {
    /// Start a session that loads from `source` and watches `plan_path`.
    pub fn with_source(source: S, plan_path: PathBuf) -> Self {
        let coordinator = ReloadCoordinator::new(source);
        let mut session = Self {
            coordinator,
            watcher: ChangeWatcher::new(),
            plan_path,
            shut_down: false,
        };
        session.arm_watcher();
        session.handle().request_reload(ReloadTrigger::Initial);
        session
    }

    pub fn plan_path(&self) -> &Path {
        &self.plan_path
    }

    pub fn coordinator(&self) -> &ReloadCoordinator<S> {
        &self.coordinator
    }

    pub fn handle(&self) -> ReloadHandle {
        self.coordinator.handle()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_watching()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// User-triggered refresh. Re-arms the watcher first if it is not running.
    pub fn request_manual_reload(&mut self) {
        if self.shut_down {
            return;
        }
        if !self.watcher.is_watching() {
            self.arm_watcher();
        }
        self.handle().request_reload(ReloadTrigger::Manual);
    }

    /// Apply queued work without blocking. See [`ReloadCoordinator::pump`].
    pub fn pump(&mut self, observer: &mut dyn PlanObserver) -> usize {
        self.coordinator.pump(observer)
    }

    /// Wait for and apply the next queued message.
    pub async fn next(&mut self, observer: &mut dyn PlanObserver) {
        self.coordinator.next(observer).await
    }

    /// Stop the watcher (blocking until its thread has exited) and refuse
    /// further reloads. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.watcher.stop();
        self.coordinator.close();
        self.shut_down = true;
        tracing::info!(path = %self.plan_path.display(), "plan session shut down");
    }

    fn arm_watcher(&mut self) {
        let Some(file_name) = self.plan_path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!(
                path = %self.plan_path.display(),
                "plan path has no usable file name, not watching"
            );
            return;
        };
        let file_name = file_name.to_string();
        let directory = self
            .plan_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let handle = self.handle();
        match self.watcher.start(&directory, &file_name, handle.clone()) {
            Ok(WatchStatus::Watching) | Ok(WatchStatus::TargetMissing) => {}
            Err(e) => {
                tracing::warn!(error = %e, "file watcher setup failed");
                handle.report_watch_error(e);
            }
        }
    }
}

impl<S: PlanSource> Drop for PlanSession<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
