//! Per-directory restore transactions.

use crossbeam_channel::{Receiver, Sender};
use filetime::FileTime;
use tracing::debug;

use crate::archive::stream;
use crate::engine::manager;
use crate::engine::message::{ControlMessage, Job, ViewEvent};
use crate::engine::worker::{
    StepContext, StepError, Throttle, WorkerLink, create_dir_0755, worker_loop,
};
use crate::error::{BksError, Result};
use crate::index::entry::EntryKind;
use crate::index::store::{self, INDEX_FILE_NAME};
use crate::settings::Settings;

/// Rebuild the original tree from a backup under `settings.src_dir` into
/// `settings.dst_dir`.
///
/// Failure semantics mirror `backup`: per-directory errors surface as
/// `ViewEvent::Error`, the run continues, and `ViewEvent::Finished` is
/// always the last event.
pub fn restore(
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
            restore_dir(link, settings, job, &mut throttle)
        });
    });
    Ok(())
}

/// One restore transaction: decode the index of `job.src` and recreate its
/// entries under `job.dst`. A directory without an index has nothing to
/// restore and succeeds.
fn restore_dir(
    link: &WorkerLink,
    settings: &Settings,
    job: &Job,
    throttle: &mut Throttle,
) -> std::result::Result<(), StepError> {
    create_dir_0755(&job.dst).step("create destination directory")?;

    let index_file = job.src.join(INDEX_FILE_NAME);
    let entries =
        store::load_entries(&index_file, &settings.password).step("load directory entries")?;

    for entry in &entries {
        match entry.kind {
            EntryKind::Directory => {
                let hidden = job.src.join(&entry.hide_name);
                let real = job.dst.join(&entry.real_name);
                create_dir_0755(&real).step("create directory")?;
                link.found_dir(Job {
                    src: hidden,
                    dst: real,
                });
            }
            EntryKind::File => {
                let archive = job.src.join(format!("{}.bks", entry.hide_name));
                let target = job.dst.join(&entry.real_name);
                link.emit(ViewEvent::StartFile {
                    id: link.id,
                    src: archive.clone(),
                    dst: target.clone(),
                });

                let restored = stream::import(&archive, &job.dst, &settings.password)
                    .step("import archive")?;
                // Restoring the mtime is best effort.
                let mtime = FileTime::from_unix_time(
                    entry.mtime_nanos.div_euclid(1_000_000_000),
                    entry.mtime_nanos.rem_euclid(1_000_000_000) as u32,
                );
                if let Err(e) = filetime::set_file_mtime(&restored, mtime) {
                    debug!(path = %restored.display(), error = %e, "could not restore mtime");
                }
                throttle.account(entry.size);

                link.emit(ViewEvent::FinishFile {
                    id: link.id,
                    src: archive,
                    dst: target,
                });
            }
            EntryKind::Unknown => {
                return Err(StepError::new(
                    "decode directory entry",
                    BksError::UnknownEntryKind,
                ));
            }
        }
    }
    Ok(())
}
