//! Integration tests for [`ChangeWatcher`] against the real filesystem.

use std::sync::mpsc;
use std::time::Duration;

use metsuke_core::{ChangeWatcher, WatchStatus};
use metsuke_test_utils::{PLAN_FILE, PlanDir, sample_plan_yaml};

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(500);

fn start_watching(fixture: &PlanDir) -> (ChangeWatcher, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel();
    let mut watcher = ChangeWatcher::new();
    let status = watcher
        .start(fixture.dir(), PLAN_FILE, move || {
            let _ = tx.send(());
        })
        .unwrap();
    assert_eq!(status, WatchStatus::Watching);
    (watcher, rx)
}

fn drain(rx: &mpsc::Receiver<()>) {
    while rx.recv_timeout(Duration::from_millis(100)).is_ok() {}
}

#[test]
fn target_write_is_reported() {
    let fixture = PlanDir::with_plan(&sample_plan_yaml());
    let (mut watcher, rx) = start_watching(&fixture);
    assert!(watcher.is_watching());
    assert!(watcher.target().is_some_and(|t| t.ends_with(PLAN_FILE)));

    fixture.write("project:\n  name: Changed\ntasks: []\n");

    assert!(rx.recv_timeout(WAIT).is_ok(), "expected a change notification");
    watcher.stop();
}

#[test]
fn atomic_replace_is_reported() {
    let fixture = PlanDir::with_plan(&sample_plan_yaml());
    let (mut watcher, rx) = start_watching(&fixture);

    let staged = fixture.dir().join("PROJECT_PLAN.yaml.tmp");
    std::fs::write(&staged, "project:\n  name: Replaced\ntasks: []\n").unwrap();
    std::fs::rename(&staged, fixture.plan_path()).unwrap();

    assert!(rx.recv_timeout(WAIT).is_ok(), "expected a notification for rename");
    watcher.stop();
}

#[test]
fn sibling_files_are_ignored() {
    let fixture = PlanDir::with_plan(&sample_plan_yaml());
    let (mut watcher, rx) = start_watching(&fixture);

    fixture.write_other("README.md", "hello\n");
    fixture.write_other("other.yaml", "a: 1\n");

    assert!(rx.recv_timeout(QUIET).is_err());
    watcher.stop();
}

#[test]
fn stop_is_idempotent_and_silences_events() {
    let fixture = PlanDir::with_plan(&sample_plan_yaml());
    let (mut watcher, rx) = start_watching(&fixture);

    watcher.stop();
    watcher.stop();
    assert!(!watcher.is_watching());
    drain(&rx);

    fixture.write("project:\n  name: Late\ntasks: []\n");
    assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn missing_target_is_not_watched() {
    let fixture = PlanDir::empty();
    let mut watcher = ChangeWatcher::new();

    let status = watcher.start(fixture.dir(), PLAN_FILE, || {}).unwrap();

    assert_eq!(status, WatchStatus::TargetMissing);
    assert!(!watcher.is_watching());
    assert!(watcher.target().is_none());
}

#[test]
fn restart_after_target_appears() {
    let fixture = PlanDir::empty();
    let mut watcher = ChangeWatcher::new();
    assert_eq!(
        watcher.start(fixture.dir(), PLAN_FILE, || {}).unwrap(),
        WatchStatus::TargetMissing
    );

    fixture.write(&sample_plan_yaml());
    let (tx, rx) = mpsc::channel();
    let status = watcher
        .start(fixture.dir(), PLAN_FILE, move || {
            let _ = tx.send(());
        })
        .unwrap();
    assert_eq!(status, WatchStatus::Watching);

    fixture.write("project:\n  name: Again\ntasks: []\n");
    assert!(rx.recv_timeout(WAIT).is_ok());
    watcher.stop();
}
