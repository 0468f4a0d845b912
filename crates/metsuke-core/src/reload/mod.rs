//! Reload coordination: the single place where plan state changes.
//!
//! Any thread may ask for a reload through a [`ReloadHandle`]; the request
//! lands on an unbounded channel owned by the [`ReloadCoordinator`]. The
//! thread that owns the coordinator drains that channel with
//! [`ReloadCoordinator::pump`] or [`ReloadCoordinator::next`], and only that
//! thread mutates the current snapshot, metrics and error state.
//!
//! State machine:
//!
//! ```text
//! Idle      -> Loading   (request)
//! Published -> Loading   (request)
//! Failed    -> Loading   (request)
//! Loading   -> Published (load ok)
//! Loading   -> Failed    (load error)
//! ```
//!
//! At most one load is in flight. A request that arrives while `Loading` is
//! remembered as a single trailing reload, started as soon as the current
//! load finishes; further requests during the same load are dropped.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::analysis::{self, DependencyMetrics};
use crate::observer::{PlanObserver, SessionError};
use crate::plan::{PlanError, PlanSnapshot, PlanSource, SharedSnapshot};
use crate::watcher::{ChangeSink, WatchError};

/// Why a reload was requested. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    Initial,
    FileChanged,
    Manual,
    Trailing,
}

impl fmt::Display for ReloadTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initial => "initial",
            Self::FileChanged => "file_changed",
            Self::Manual => "manual",
            Self::Trailing => "trailing",
        };
        f.write_str(s)
    }
}

/// Coordinator state.
#[derive(Debug, Clone)]
pub enum ReloadState {
    Idle,
    Loading,
    Published(SharedSnapshot),
    Failed(PlanError),
}

impl ReloadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Published(_) => "published",
            Self::Failed(_) => "failed",
        }
    }
}

/// Counters for what the coordinator has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStats {
    pub loads_started: u64,
    pub published: u64,
    pub failed: u64,
    /// Requests folded into an in-flight or already-queued reload.
    pub coalesced: u64,
}

/// Messages carried by the coordinator's queue.
#[derive(Debug)]
pub enum Dispatch {
    Reload(ReloadTrigger),
    Loaded(Result<PlanSnapshot, PlanError>),
    WatchFailed(WatchError),
}

/// Cloneable, thread-safe entry point into a [`ReloadCoordinator`].
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: mpsc::UnboundedSender<Dispatch>,
}

impl ReloadHandle {
    /// Ask for a reload. Never blocks; a closed coordinator drops the request.
    pub fn request_reload(&self, trigger: ReloadTrigger) {
        if self.tx.send(Dispatch::Reload(trigger)).is_err() {
            tracing::debug!(%trigger, "reload requested after coordinator shut down");
        }
    }

    /// Surface a watcher failure through the coordinator's queue.
    pub fn report_watch_error(&self, error: WatchError) {
        let _ = self.tx.send(Dispatch::WatchFailed(error));
    }
}

impl ChangeSink for ReloadHandle {
    fn changed(&self) {
        self.request_reload(ReloadTrigger::FileChanged);
    }

    fn failed(&self, error: WatchError) {
        self.report_watch_error(error);
    }
}

/// Serializes reloads and publishes results to a [`PlanObserver`].
pub struct ReloadCoordinator<S: PlanSource> {
    source: Arc<S>,
    state: ReloadState,
    last_good: Option<SharedSnapshot>,
    metrics: Option<DependencyMetrics>,
    last_error: Option<SessionError>,
    trailing: bool,
    accepting: bool,
    stats: ReloadStats,
    tx: mpsc::UnboundedSender<Dispatch>,
    rx: mpsc::UnboundedReceiver<Dispatch>,
}

impl<S: PlanSource> ReloadCoordinator<S> {
    pub fn new(source: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source: Arc::new(source),
            state: ReloadState::Idle,
            last_good: None,
            metrics: None,
            last_error: None,
            trailing: false,
            accepting: true,
            stats: ReloadStats::default(),
            tx,
            rx,
        }
    }

    pub fn handle(&self) -> ReloadHandle {
        ReloadHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> &ReloadState {
        &self.state
    }

    /// Most recently published snapshot, kept across failed reloads.
    pub fn snapshot(&self) -> Option<&SharedSnapshot> {
        self.last_good.as_ref()
    }

    /// Metrics for [`Self::snapshot`].
    pub fn metrics(&self) -> Option<&DependencyMetrics> {
        self.metrics.as_ref()
    }

    /// Error from the latest reload or watcher failure, cleared on publish.
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    pub fn stats(&self) -> ReloadStats {
        self.stats
    }

    /// Stop starting new loads. A load already in flight still publishes.
    pub fn close(&mut self) {
        self.accepting = false;
        self.trailing = false;
    }

    /// Apply every queued message without waiting. Returns how many were
    /// applied.
    pub fn pump(&mut self, observer: &mut dyn PlanObserver) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.apply(message, observer);
            applied += 1;
        }
        applied
    }

    /// Wait for the next queued message and apply it.
    pub async fn next(&mut self, observer: &mut dyn PlanObserver) {
        // The coordinator holds a sender, so the channel never closes.
        if let Some(message) = self.rx.recv().await {
            self.apply(message, observer);
        }
    }

    /// Run one step of the state machine.
    pub fn apply(&mut self, message: Dispatch, observer: &mut dyn PlanObserver) {
        match message {
            Dispatch::Reload(trigger) => self.on_request(trigger),
            Dispatch::Loaded(result) => {
                self.on_loaded(result, observer);
                if self.trailing && self.accepting {
                    self.trailing = false;
                    self.begin_load(ReloadTrigger::Trailing);
                }
            }
            Dispatch::WatchFailed(error) => {
                let error = SessionError::Watch(error);
                tracing::warn!(error = %error, "watcher reported an error");
                observer.on_error(&error);
                self.last_error = Some(error);
            }
        }
    }

    fn on_request(&mut self, trigger: ReloadTrigger) {
        if !self.accepting {
            tracing::debug!(%trigger, "ignoring reload request after shutdown");
            return;
        }
        if self.state.is_loading() {
            self.stats.coalesced += 1;
            if self.trailing {
                tracing::debug!(%trigger, "reload already queued, dropping request");
            } else {
                tracing::debug!(%trigger, "load in flight, queueing one trailing reload");
                self.trailing = true;
            }
            return;
        }
        self.begin_load(trigger);
    }

    fn begin_load(&mut self, trigger: ReloadTrigger) {
        self.state = ReloadState::Loading;
        self.stats.loads_started += 1;
        tracing::info!(
            %trigger,
            path = %self.source.path().display(),
            "reloading plan data"
        );

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let job = move || {
            // A panicking source must still answer, or the state stays Loading.
            let result = panic::catch_unwind(AssertUnwindSafe(|| source.load())).unwrap_or_else(
                |payload| {
                    Err(PlanError::LoadPanicked {
                        path: source.path().to_path_buf(),
                        message: panic_message(&*payload),
                    })
                },
            );
            let _ = tx.send(Dispatch::Loaded(result));
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                // Detached; the result comes back through the queue.
                let _ = runtime.spawn_blocking(job);
            }
            // No runtime: load here; the result is still applied from the
            // queue like any other.
            Err(_) => job(),
        }
    }

    fn on_loaded(
        &mut self,
        result: Result<PlanSnapshot, PlanError>,
        observer: &mut dyn PlanObserver,
    ) {
        match result {
            Ok(snapshot) => {
                let snapshot = snapshot.into_shared();
                let metrics = analysis::compute(&snapshot.tasks);
                tracing::info!(
                    project = %snapshot.project.name,
                    tasks = snapshot.tasks.len(),
                    ready = metrics.ready_to_work,
                    blocked = metrics.blocked_by_deps,
                    "plan data loaded"
                );

                self.stats.published += 1;
                self.state = ReloadState::Published(Arc::clone(&snapshot));
                self.last_good = Some(Arc::clone(&snapshot));
                self.metrics = Some(metrics.clone());
                self.last_error = None;

                observer.on_snapshot_published(&snapshot);
                observer.on_metrics_computed(&metrics);
            }
            Err(error) => {
                match &error {
                    PlanError::NotFound { path } => {
                        tracing::warn!(path = %path.display(), "plan file not found");
                    }
                    other => tracing::error!(error = %other, "failed to load plan data"),
                }

                self.stats.failed += 1;
                self.state = ReloadState::Failed(error.clone());
                let error = SessionError::Plan(error);
                observer.on_error(&error);
                self.last_error = Some(error);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
