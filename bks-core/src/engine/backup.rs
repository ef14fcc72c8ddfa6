//! Per-directory backup transactions.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::archive::stream;
use crate::engine::manager;
use crate::engine::message::{ControlMessage, Job, ViewEvent};
use crate::engine::worker::{
    StepContext, StepError, Throttle, WorkerLink, create_dir_0755, mtime_nanos, worker_loop,
};
use crate::error::Result;
use crate::index::entry::{DirEntry, EntryKind};
use crate::index::store::{self, INDEX_FILE_NAME};
use crate::settings::Settings;
use crate::util::naming;

/// Mirror `settings.src_dir` into an encrypted, name-hidden copy under
/// `settings.dst_dir`.
///
/// Runs one manager and N workers until the job queue drains or the view
/// sends `Termination`. Per-directory failures surface as
/// `ViewEvent::Error` and do not abort the run; `ViewEvent::Finished` is
/// always the last event.
pub fn backup(
    settings: &Settings,
    view: &Sender<ViewEvent>,
    control: &Receiver<ControlMessage>,
) -> Result<()> {
    settings.validate()?;
    let root = Job {
        src: settings.src_dir.clone(),
        dst: settings.dst_dir.clone(),
    };
    manager::run(settings.effective_workers(), root, view, control, |link| {
        let mut throttle = Throttle::new(settings.limit);
        worker_loop(link, |link, job| {
            backup_dir(link, settings, job, &mut throttle)
        });
    });
    Ok(())
}

/// One backup transaction: diff `job.src` against the stored index of
/// `job.dst`, archive what changed, and rewrite the index only when
/// something did.
fn backup_dir(
    link: &WorkerLink,
    settings: &Settings,
    job: &Job,
    throttle: &mut Throttle,
) -> std::result::Result<(), StepError> {
    create_dir_0755(&job.dst).step("create destination directory")?;

    let index_file = job.dst.join(INDEX_FILE_NAME);

    // A missing index means the previous run of this directory never
    // finished; its partial contents are unsafe to reuse.
    if !index_file.exists() {
        clear_destination(&job.dst);
    }

    let prior =
        store::load_entries(&index_file, &settings.password).step("load directory entries")?;
    let had_entries = !prior.is_empty();

    let mut name_map: HashMap<String, String> = prior
        .iter()
        .map(|e| (e.hide_name.clone(), e.real_name.clone()))
        .collect();

    let children = read_children(&job.src).step("read source directory")?;
    let mut new_entries: Vec<DirEntry> = Vec::with_capacity(children.len());
    let mut changed = false;

    for child in &children {
        let file_name = child.file_name().to_string_lossy().into_owned();
        let file_type = child.file_type().step("read source directory")?;
        if !file_type.is_dir() && !file_type.is_file() {
            debug!(name = %file_name, "skipping symlink or special file");
            continue;
        }

        let prior_entry = prior.iter().find(|e| e.real_name == file_name);
        let hide_name = match prior_entry {
            Some(e) => e.hide_name.clone(),
            None => naming::unique_hide_name(&name_map).step("generate hidden name")?,
        };
        name_map.insert(hide_name.clone(), file_name.clone());

        if file_type.is_dir() {
            let sub_dst = job.dst.join(&hide_name);
            let meta = child.metadata().step("read file metadata")?;
            new_entries.push(DirEntry {
                kind: EntryKind::Directory,
                real_name: file_name.clone(),
                hide_name: hide_name.clone(),
                size: 0,
                mtime_nanos: mtime_nanos(&meta),
            });
            match prior_entry {
                Some(e) if e.kind == EntryKind::Directory => {
                    if !sub_dst.exists() {
                        changed = true;
                    }
                }
                _ => changed = true,
            }
            link.found_dir(Job {
                src: job.src.join(&file_name),
                dst: sub_dst,
            });
        } else {
            let src_file = job.src.join(&file_name);
            let dst_file = job.dst.join(format!("{hide_name}.bks"));
            link.emit(ViewEvent::StartFile {
                id: link.id,
                src: src_file.clone(),
                dst: dst_file.clone(),
            });

            let meta = child.metadata().step("read file metadata")?;
            let size = meta.len();
            let mtime = mtime_nanos(&meta);

            let unchanged = prior_entry.filter(|e| {
                e.kind == EntryKind::File
                    && e.size == size
                    && e.mtime_nanos == mtime
                    && dst_file.exists()
            });
            if let Some(entry) = unchanged {
                // Carry the prior entry forward untouched; the stored
                // archive and its ciphertext stay as they are.
                new_entries.push(entry.clone());
            } else {
                changed = true;
                stream::export(
                    &src_file,
                    &dst_file,
                    &file_name,
                    &settings.password,
                    settings.chunk_size,
                )
                .step("export archive")?;
                new_entries.push(DirEntry {
                    kind: EntryKind::File,
                    real_name: file_name.clone(),
                    hide_name: hide_name.clone(),
                    size,
                    mtime_nanos: mtime,
                });
                throttle.account(size);
            }

            link.emit(ViewEvent::FinishFile {
                id: link.id,
                src: src_file,
                dst: dst_file,
            });
        }
    }

    // Entries that vanished from the source since the prior run.
    if had_entries {
        let kept: HashSet<&str> = new_entries.iter().map(|e| e.hide_name.as_str()).collect();
        for entry in &prior {
            if kept.contains(entry.hide_name.as_str()) {
                continue;
            }
            changed = true;
            remove_entry_files(&job.dst, entry);
        }
    }

    sweep_orphans(&job.dst, &new_entries).step("read backup directory")?;

    if changed {
        let label = job.src.to_string_lossy();
        store::store_entries(&index_file, &label, &new_entries, &settings.password)
            .step("store directory entries")?;
    }
    Ok(())
}

/// Source children in name order; `fs::read_dir` order is platform-defined.
fn read_children(src: &Path) -> std::io::Result<Vec<fs::DirEntry>> {
    let mut children = fs::read_dir(src)?.collect::<std::io::Result<Vec<_>>>()?;
    children.sort_by_key(|e| e.file_name());
    Ok(children)
}

/// Wipe everything under `dst`, best effort.
fn clear_destination(dst: &Path) {
    let Ok(items) = fs::read_dir(dst) else {
        return;
    };
    for item in items.flatten() {
        let path = item.path();
        let removed = match item.file_type() {
            Ok(t) if t.is_dir() => fs::remove_dir_all(&path),
            _ => fs::remove_file(&path),
        };
        if let Err(e) = removed {
            warn!(path = %path.display(), error = %e, "failed to clear stale backup entry");
        }
    }
}

/// Remove the physical remains of a dropped index entry, best effort.
fn remove_entry_files(dst: &Path, entry: &DirEntry) {
    let removed = match entry.kind {
        EntryKind::File => fs::remove_file(dst.join(format!("{}.bks", entry.hide_name))),
        _ => fs::remove_dir_all(dst.join(&entry.hide_name)),
    };
    if let Err(e) = removed {
        warn!(hide_name = %entry.hide_name, error = %e, "failed to remove deleted entry");
    }
}

/// Delete destination entries the new index does not reference. Reserved
/// names (`_*_.bks`) are exempt.
fn sweep_orphans(dst: &Path, entries: &[DirEntry]) -> std::io::Result<()> {
    let expected: HashSet<String> = entries
        .iter()
        .map(|e| match e.kind {
            EntryKind::File => format!("{}.bks", e.hide_name),
            _ => e.hide_name.clone(),
        })
        .collect();

    for item in fs::read_dir(dst)? {
        let item = item?;
        let name = item.file_name().to_string_lossy().into_owned();
        let is_dir = item.file_type()?.is_dir();
        if !is_dir && store::is_reserved_name(&name) {
            continue;
        }
        if expected.contains(&name) {
            continue;
        }
        let path = item.path();
        debug!(path = %path.display(), "removing orphan");
        let removed = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Err(e) = removed {
            warn!(path = %path.display(), error = %e, "failed to remove orphan");
        }
    }
    Ok(())
}
