//! `metsuke watch` command: headless session that prints a line per reload.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use chrono::Local;
use tokio_util::sync::CancellationToken;

use metsuke_core::{
    DependencyMetrics, PlanObserver, PlanSession, SessionError, SharedSnapshot, TaskSummary,
};

/// Observer that prints one line per published snapshot or error.
#[derive(Default)]
pub struct LoggingObserver {
    current: Option<SharedSnapshot>,
    pub published: usize,
    pub errors: usize,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlanObserver for LoggingObserver {
    fn on_snapshot_published(&mut self, snapshot: &SharedSnapshot) {
        self.current = Some(Arc::clone(snapshot));
    }

    fn on_metrics_computed(&mut self, metrics: &DependencyMetrics) {
        self.published += 1;
        if let Some(snapshot) = &self.current {
            let line = publish_line(snapshot, metrics);
            println!("[{}] {line}", Local::now().format("%H:%M:%S"));
        }
    }

    fn on_error(&mut self, error: &SessionError) {
        self.errors += 1;
        println!("[{}] error: {error}", Local::now().format("%H:%M:%S"));
    }
}

/// One-line summary of a published snapshot.
pub fn publish_line(snapshot: &SharedSnapshot, metrics: &DependencyMetrics) -> String {
    let summary = TaskSummary::from_tasks(&snapshot.tasks);
    let next = match &metrics.next_task {
        Some(task) => format!("next #{} {} ({})", task.id, task.title, task.priority),
        None => "no task available".to_string(),
    };
    format!(
        "{} {}: {}/{} done ({:.1}%), {} ready, {} blocked, {}",
        snapshot.project.name,
        snapshot.project.version,
        summary.done,
        summary.total,
        summary.progress_percent(),
        metrics.ready_to_work,
        metrics.blocked_by_deps,
        next,
    )
}

/// Run the watch command until Ctrl+C.
pub async fn run_watch(plan_path: &Path) -> Result<()> {
    println!("Watching {} (Ctrl+C to stop)", plan_path.display());

    // Set up graceful shutdown: first signal cancels, second force-exits.
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let got_first_signal = Arc::new(AtomicBool::new(false));
    let got_first_clone = Arc::clone(&got_first_signal);

    tokio::spawn(async move {
        loop {
            tokio::signal::ctrl_c().await.ok();
            if got_first_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\nForce exit.");
                std::process::exit(130);
            }
            eprintln!("\nStopping watcher (Ctrl+C again to force)...");
            cancel_clone.cancel();
        }
    });

    let mut session = PlanSession::initialize(plan_path);
    let mut observer = LoggingObserver::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = session.next(&mut observer) => {}
        }
    }

    session.shutdown();
    println!(
        "Stopped. {} reload(s) published, {} error(s).",
        observer.published, observer.errors
    );
    Ok(())
}
