//! Shared worker plumbing for the backup and restore engines.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

use crossbeam_channel::{Receiver, Sender};

use crate::engine::message::{Assignment, Job, Report, ViewEvent};
use crate::error::BksError;
use crate::settings::Limit;

/// Channels handed to one worker thread.
pub(crate) struct WorkerLink {
    pub id: u32,
    pub reports: Sender<Report>,
    pub assignments: Receiver<Assignment>,
    pub view: Sender<ViewEvent>,
}

impl WorkerLink {
    pub fn emit(&self, event: ViewEvent) {
        let _ = self.view.send(event);
    }

    pub fn found_dir(&self, job: Job) {
        let _ = self.reports.send(Report::FoundDir(job));
    }
}

/// Claim jobs until `Exit`; run one transaction per job and report the
/// outcome. Failures become ERROR reports, never a worker death.
pub(crate) fn worker_loop<F>(link: WorkerLink, mut transaction: F)
where
    F: FnMut(&WorkerLink, &Job) -> Result<(), StepError>,
{
    link.emit(ViewEvent::AddWorker { id: link.id });

    while let Ok(assignment) = link.assignments.recv() {
        let Assignment::Run(job) = assignment else {
            break;
        };

        link.emit(ViewEvent::StartDir {
            id: link.id,
            src: job.src.clone(),
            dst: job.dst.clone(),
        });

        if let Err(e) = transaction(&link, &job) {
            let _ = link.reports.send(Report::Failed {
                worker: link.id,
                detail: e.to_string(),
            });
        }

        link.emit(ViewEvent::FinishDir {
            id: link.id,
            src: job.src.clone(),
            dst: job.dst.clone(),
        });
        let _ = link.reports.send(Report::FinishedJob);
    }
}

/// A transaction failure: the step that failed plus the underlying error.
#[derive(Debug)]
pub(crate) struct StepError {
    step: &'static str,
    source: BksError,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to {}: {}", self.step, self.source)
    }
}

pub(crate) trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T, StepError>;
}

impl<T, E: Into<BksError>> StepContext<T> for Result<T, E> {
    fn step(self, step: &'static str) -> Result<T, StepError> {
        self.map_err(|e| StepError {
            step,
            source: e.into(),
        })
    }
}

impl StepError {
    pub fn new(step: &'static str, source: BksError) -> Self {
        Self { step, source }
    }
}

/// Per-worker bandwidth throttle: sleep `limit.wait` seconds once
/// `limit.size` payload bytes were processed since the last pause.
pub(crate) struct Throttle {
    limit: Limit,
    processed: u64,
}

impl Throttle {
    pub fn new(limit: Limit) -> Self {
        Self {
            limit,
            processed: 0,
        }
    }

    pub fn account(&mut self, bytes: u64) {
        if self.limit.size == 0 || self.limit.wait == 0 {
            return;
        }
        self.processed += bytes;
        if self.processed >= self.limit.size {
            thread::sleep(Duration::from_secs(self.limit.wait));
            self.processed -= self.limit.size;
        }
    }
}

/// `mkdir -p` with mode 0755 on unix.
pub(crate) fn create_dir_0755(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)
}

/// Modification time as signed nanoseconds since the Unix epoch; 0 when the
/// platform cannot report one.
pub(crate) fn mtime_nanos(meta: &fs::Metadata) -> i64 {
    let Ok(modified) = meta.modified() else {
        return 0;
    };
    match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i64,
        Err(e) => -(e.duration().as_nanos() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn throttle_disabled_when_either_field_is_zero() {
        let mut throttle = Throttle::new(Limit { size: 0, wait: 10 });
        let start = Instant::now();
        throttle.account(u64::MAX / 2);
        assert!(start.elapsed() < Duration::from_millis(100));

        let mut throttle = Throttle::new(Limit { size: 10, wait: 0 });
        throttle.account(u64::MAX / 2);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn throttle_sleeps_and_carries_the_remainder() {
        let mut throttle = Throttle::new(Limit { size: 100, wait: 1 });
        throttle.account(99);
        assert_eq!(throttle.processed, 99);

        let start = Instant::now();
        throttle.account(51);
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(throttle.processed, 50);
    }

    #[test]
    fn mtime_survives_the_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"x").unwrap();
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(1_600_000_000, 0))
            .unwrap();
        let nanos = mtime_nanos(&fs::metadata(&path).unwrap());
        assert_eq!(nanos, 1_600_000_000 * 1_000_000_000);
    }
}
