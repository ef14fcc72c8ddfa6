//! Job dispatch: one manager thread feeding N long-lived workers over
//! bounded queues, with cooperative pause and termination.

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::debug;

use crate::engine::message::{Assignment, ControlMessage, Job, Report, ViewEvent};
use crate::engine::worker::WorkerLink;

const POLL_SLEEP: Duration = Duration::from_millis(10);

/// Spawn the manager and `workers` worker threads, seed the root job, and
/// block until the run drains or is terminated.
pub(crate) fn run<W>(
    workers: usize,
    root: Job,
    view: &Sender<ViewEvent>,
    control: &Receiver<ControlMessage>,
    worker: W,
) where
    W: Fn(WorkerLink) + Sync,
{
    let queue_cap = workers * 8;
    let (report_tx, report_rx) = bounded::<Report>(queue_cap);
    let (assign_tx, assign_rx) = bounded::<Assignment>(queue_cap);

    // Seed as if a phantom worker had discovered the root pair.
    let _ = report_tx.send(Report::FoundDir(root));

    let worker = &worker;
    thread::scope(|s| {
        s.spawn(|| dispatch(workers, &report_rx, &assign_tx, &assign_rx, view, control));

        for id in 1..=workers as u32 {
            let link = WorkerLink {
                id,
                reports: report_tx.clone(),
                assignments: assign_rx.clone(),
                view: view.clone(),
            };
            s.spawn(move || worker(link));
        }
    });
}

/// The manager loop. Polls both inbound queues, tracks outstanding jobs in
/// `untreated`, and hands queued jobs out without ever blocking on a send.
fn dispatch(
    workers: usize,
    from_workers: &Receiver<Report>,
    to_workers: &Sender<Assignment>,
    undelivered: &Receiver<Assignment>,
    view: &Sender<ViewEvent>,
    control: &Receiver<ControlMessage>,
) {
    let mut untreated: i64 = 0;
    let mut pending: VecDeque<Assignment> = VecDeque::new();
    let mut stop_workers = false;
    let mut termination = false;

    loop {
        let mut received = false;

        if let Ok(msg) = control.try_recv() {
            received = true;
            match msg {
                ControlMessage::StopWorkers => stop_workers = true,
                ControlMessage::ResumeWorkers => stop_workers = false,
                ControlMessage::Termination => termination = true,
            }
        }

        if let Ok(report) = from_workers.try_recv() {
            received = true;
            match report {
                Report::FoundDir(job) => {
                    pending.push_back(Assignment::Run(job));
                    untreated += 1;
                }
                Report::FinishedJob => untreated -= 1,
                Report::Failed { worker, detail } => {
                    let _ = view.send(ViewEvent::Error { id: worker, detail });
                }
            }
        }

        // While paused, recall undelivered jobs so nothing new is picked up.
        if stop_workers {
            while let Ok(msg) = undelivered.try_recv() {
                pending.push_back(msg);
            }
        }

        // Termination: recall undelivered jobs, drop the backlog, and tell
        // the workers still in flight to exit after their transaction.
        if termination {
            while let Ok(msg) = undelivered.try_recv() {
                if !matches!(msg, Assignment::Exit) {
                    untreated -= 1;
                }
            }
            if !pending.is_empty() {
                debug!(dropped = pending.len(), "termination: dropping queued jobs");
            }
            untreated -= pending.len() as i64;
            pending.clear();
            for _ in 0..untreated.max(0) {
                let _ = to_workers.send(Assignment::Exit);
            }
        }

        if untreated <= 0 {
            for _ in 0..workers {
                let _ = to_workers.send(Assignment::Exit);
            }
            break;
        }

        // Hand out jobs until a message arrives or the queue saturates.
        loop {
            if !control.is_empty() || !from_workers.is_empty() {
                break;
            }
            let Some(next) = pending.pop_front() else {
                break;
            };
            if stop_workers || termination {
                pending.push_front(next);
                thread::sleep(POLL_SLEEP);
                break;
            }
            match to_workers.try_send(next) {
                Ok(()) => {}
                Err(TrySendError::Full(next)) => {
                    pending.push_front(next);
                    thread::sleep(POLL_SLEEP);
                    break;
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }

        // Idle tick: nothing arrived and nothing to hand out.
        if !received && pending.is_empty() {
            thread::sleep(POLL_SLEEP);
        }
    }

    let _ = view.send(ViewEvent::Finished);
}
