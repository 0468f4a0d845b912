//! Filesystem watcher for the plan file.
//!
//! Watches the plan file's containing directory (non-recursively) so editors
//! that save through rename or atomic replace are still seen. notify delivers
//! raw events to a forwarding thread owned by [`ChangeWatcher`]; that thread
//! filters for the target file and calls a [`ChangeSink`], which is expected
//! to enqueue work and return. Nothing on the watcher threads touches plan or
//! UI state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

/// Errors from setting up or running the watcher.
#[derive(Debug, Clone, Error)]
pub enum WatchError {
    #[error("cannot watch {}: {source}", path.display())]
    Setup {
        path: PathBuf,
        #[source]
        source: Arc<notify::Error>,
    },

    #[error("failed to start watcher thread: {source}")]
    Spawn {
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("file watcher error: {source}")]
    Runtime {
        #[source]
        source: Arc<notify::Error>,
    },
}

/// Outcome of [`ChangeWatcher::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStatus {
    Watching,
    /// The target file did not exist, so nothing is being watched.
    TargetMissing,
}

/// Receiver of watcher notifications. Called on the watcher thread.
pub trait ChangeSink: Send + 'static {
    /// The watched file was created or modified.
    fn changed(&self);

    /// notify reported an error after setup.
    fn failed(&self, _error: WatchError) {}
}

impl<F> ChangeSink for F
where
    F: Fn() + Send + 'static,
{
    fn changed(&self) {
        self()
    }
}

enum WatchMessage {
    Fs(notify::Result<Event>),
    Stop,
}

struct Worker {
    tx: mpsc::Sender<WatchMessage>,
    thread: JoinHandle<()>,
}

/// Owns the notify watcher and its forwarding thread.
#[derive(Default)]
pub struct ChangeWatcher {
    worker: Option<Worker>,
    target: Option<PathBuf>,
}

impl ChangeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_watching(&self) -> bool {
        self.worker.is_some()
    }

    /// Absolute path of the file being watched, if any.
    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    /// Start watching `directory/file_name`. A running watch is stopped first.
    ///
    /// If the file does not exist a warning is logged and
    /// [`WatchStatus::TargetMissing`] is returned; the caller re-arms by
    /// calling `start` again.
    pub fn start(
        &mut self,
        directory: &Path,
        file_name: &str,
        sink: impl ChangeSink,
    ) -> Result<WatchStatus, WatchError> {
        self.stop();

        let directory = if directory.as_os_str().is_empty() {
            Path::new(".")
        } else {
            directory
        };
        let target = directory.join(file_name);
        if !target.exists() {
            tracing::warn!(
                path = %target.display(),
                "cannot watch plan file: file does not exist"
            );
            return Ok(WatchStatus::TargetMissing);
        }
        let target = resolve(&target);
        let watch_dir = resolve(directory);

        let (tx, rx) = mpsc::channel::<WatchMessage>();
        let fs_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The receiver is gone once the forwarding thread has exited.
            let _ = fs_tx.send(WatchMessage::Fs(res));
        })
        .map_err(|e| WatchError::Setup {
            path: watch_dir.clone(),
            source: Arc::new(e),
        })?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Setup {
                path: watch_dir.clone(),
                source: Arc::new(e),
            })?;

        let thread_target = target.clone();
        let thread = std::thread::Builder::new()
            .name("metsuke-watcher".to_string())
            .spawn(move || forward_events(watcher, rx, thread_target, sink))
            .map_err(|e| WatchError::Spawn {
                source: Arc::new(e),
            })?;

        tracing::info!(
            directory = %watch_dir.display(),
            file = file_name,
            "started watching for plan changes"
        );

        self.worker = Some(Worker { tx, thread });
        self.target = Some(target);
        Ok(WatchStatus::Watching)
    }

    /// Stop watching and wait for the forwarding thread to exit.
    ///
    /// Idempotent. Once this returns the sink will not be called again.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.tx.send(WatchMessage::Stop);
        if worker.thread.join().is_err() {
            tracing::error!("file watcher thread panicked");
        }
        if let Some(target) = self.target.take() {
            tracing::info!(path = %target.display(), "stopped file watcher");
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn forward_events(
    watcher: RecommendedWatcher,
    rx: mpsc::Receiver<WatchMessage>,
    target: PathBuf,
    sink: impl ChangeSink,
) {
    // Dropped when the loop ends, which tears down notify's own thread.
    let _watcher = watcher;

    while let Ok(message) = rx.recv() {
        match message {
            WatchMessage::Stop => break,
            WatchMessage::Fs(Ok(event)) => {
                if is_target_event(&event, &target) {
                    tracing::debug!(
                        path = %target.display(),
                        kind = ?event.kind,
                        "detected plan file modification"
                    );
                    sink.changed();
                }
            }
            WatchMessage::Fs(Err(e)) => {
                tracing::warn!(error = %e, "file watcher error");
                sink.failed(WatchError::Runtime {
                    source: Arc::new(e),
                });
            }
        }
    }
}

/// Whether `event` is a create or modify of exactly `target`.
///
/// `target` must already be absolute; event paths are resolved before the
/// comparison.
pub fn is_target_event(event: &Event, target: &Path) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    event.paths.iter().any(|p| resolve(p) == target)
}

/// Canonical path when it exists, otherwise the lexically absolute path.
fn resolve(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};

    fn modify(path: &Path) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(path.to_path_buf())
    }

    #[test]
    fn matches_modification_of_target() {
        let tmp = tempfile::TempDir::new().unwrap();
        let plan = tmp.path().join("PROJECT_PLAN.yaml");
        std::fs::write(&plan, "x").unwrap();
        let target = resolve(&plan);

        assert!(is_target_event(&modify(&plan), &target));
        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(plan.clone());
        assert!(is_target_event(&created, &target));
    }

    #[test]
    fn ignores_unrelated_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let plan = tmp.path().join("PROJECT_PLAN.yaml");
        let other = tmp.path().join("notes.md");
        std::fs::write(&plan, "x").unwrap();
        std::fs::write(&other, "y").unwrap();

        assert!(!is_target_event(&modify(&other), &resolve(&plan)));
    }

    #[test]
    fn ignores_removal_and_access() {
        let tmp = tempfile::TempDir::new().unwrap();
        let plan = tmp.path().join("PROJECT_PLAN.yaml");
        std::fs::write(&plan, "x").unwrap();
        let target = resolve(&plan);

        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(plan.clone());
        assert!(!is_target_event(&removed, &target));
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(plan.clone());
        assert!(!is_target_event(&access, &target));
    }

    #[test]
    fn missing_target_is_not_watched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut watcher = ChangeWatcher::new();
        let status = watcher
            .start(tmp.path(), "PROJECT_PLAN.yaml", || {})
            .unwrap();
        assert_eq!(status, WatchStatus::TargetMissing);
        assert!(!watcher.is_watching());
        assert!(watcher.target().is_none());
    }

    #[test]
    fn stop_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("PROJECT_PLAN.yaml"), "x").unwrap();
        let mut watcher = ChangeWatcher::new();
        watcher
            .start(tmp.path(), "PROJECT_PLAN.yaml", || {})
            .unwrap();
        assert!(watcher.is_watching());
        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_watching());
    }
}
