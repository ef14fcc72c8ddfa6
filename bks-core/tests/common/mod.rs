#![allow(dead_code)] // each test binary uses its own subset of these helpers

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use bks_core::prelude::*;
use crossbeam_channel::unbounded;

pub fn run_backup(settings: &Settings) -> Vec<ViewEvent> {
    run(settings, true, &[])
}

pub fn run_restore(settings: &Settings) -> Vec<ViewEvent> {
    run(settings, false, &[])
}

pub fn run_backup_with_control(settings: &Settings, control: &[ControlMessage]) -> Vec<ViewEvent> {
    run(settings, true, control)
}

fn run(settings: &Settings, is_backup: bool, control: &[ControlMessage]) -> Vec<ViewEvent> {
    let (view_tx, view_rx) = unbounded::<ViewEvent>();
    let (control_tx, control_rx) = unbounded::<ControlMessage>();
    for msg in control {
        control_tx.send(*msg).unwrap();
    }
    let result = if is_backup {
        backup(settings, &view_tx, &control_rx)
    } else {
        restore(settings, &view_tx, &control_rx)
    };
    result.unwrap();
    drop(view_tx);
    view_rx.iter().collect()
}

/// Relative path -> contents for every regular file under `root`.
pub fn tree_files(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut out = BTreeMap::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            out.insert(rel, fs::read(entry.path()).unwrap());
        }
    }
    out
}

/// Relative paths of every directory under `root`, excluding `root` itself.
pub fn tree_dirs(root: &Path) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for entry in walkdir::WalkDir::new(root).min_depth(1) {
        let entry = entry.unwrap();
        if entry.file_type().is_dir() {
            out.insert(
                entry
                    .path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned(),
            );
        }
    }
    out
}

/// 16 chars of `[a-z0-9]`, optionally followed by `.bks`.
pub fn is_hidden_name(name: &str) -> bool {
    let base = name.strip_suffix(".bks").unwrap_or(name);
    base.len() == 16
        && base
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

pub fn error_events(events: &[ViewEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ViewEvent::Error { detail, .. } => Some(detail.clone()),
            _ => None,
        })
        .collect()
}
