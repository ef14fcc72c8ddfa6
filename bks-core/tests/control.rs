//! Cooperative pause, termination, and throttle behavior.

mod common;

use std::fs;
use std::time::{Duration, Instant};

use bks_core::prelude::*;
use bks_core::{INDEX_FILE_NAME, ViewEvent};
use common::*;
use tempfile::TempDir;

fn fixture() -> (TempDir, Settings) {
    let root = tempfile::tempdir().unwrap();
    let src = root.path().join("src");
    fs::create_dir(&src).unwrap();
    let mut settings = Settings::new(src, root.path().join("dst"), "pw");
    settings.workers = 1;
    (root, settings)
}

#[test]
fn termination_before_dispatch_processes_nothing() {
    let (_root, settings) = fixture();
    fs::create_dir(settings.src_dir.join("sub")).unwrap();
    fs::write(settings.src_dir.join("a.txt"), b"data").unwrap();

    let events = run_backup_with_control(&settings, &[ControlMessage::Termination]);

    assert!(events.iter().any(|e| matches!(e, ViewEvent::Finished)));
    assert!(
        !events.iter().any(|e| matches!(e, ViewEvent::StartDir { .. })),
        "no job may be dispatched after termination"
    );
    assert!(!settings.dst_dir.join(INDEX_FILE_NAME).exists());
}

#[test]
fn pause_then_resume_completes_the_run() {
    let (_root, settings) = fixture();
    fs::write(settings.src_dir.join("a.txt"), b"data").unwrap();

    let events = run_backup_with_control(
        &settings,
        &[ControlMessage::StopWorkers, ControlMessage::ResumeWorkers],
    );

    assert!(events.iter().any(|e| matches!(e, ViewEvent::Finished)));
    assert!(error_events(&events).is_empty());
    assert!(settings.dst_dir.join(INDEX_FILE_NAME).is_file());
}

#[test]
fn finished_is_the_last_event_of_a_normal_run() {
    let (_root, settings) = fixture();
    fs::create_dir(settings.src_dir.join("sub")).unwrap();
    fs::write(settings.src_dir.join("sub/a.txt"), b"data").unwrap();

    let events = run_backup(&settings);
    assert!(matches!(events.last(), Some(ViewEvent::Finished)));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ViewEvent::Finished))
            .count(),
        1
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ViewEvent::AddWorker { .. }))
            .count(),
        1
    );
}

#[test]
fn throttle_enforces_the_configured_floor() {
    let (_root, mut settings) = fixture();
    settings.limit = Limit { size: 1, wait: 1 };
    fs::write(settings.src_dir.join("a.bin"), b"x").unwrap();
    fs::write(settings.src_dir.join("b.bin"), b"y").unwrap();

    let start = Instant::now();
    let events = run_backup(&settings);
    assert!(error_events(&events).is_empty());
    // Two archived bytes against a 1-byte budget: two 1-second pauses.
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[test]
fn throttle_ignores_unchanged_files() {
    let (_root, mut settings) = fixture();
    fs::write(settings.src_dir.join("a.bin"), b"x").unwrap();
    run_backup(&settings);

    // Re-run with a throttle; the unchanged file is skipped, not paid for.
    settings.limit = Limit { size: 1, wait: 2 };
    let start = Instant::now();
    run_backup(&settings);
    assert!(start.elapsed() < Duration::from_secs(2));
}
