use std::path::PathBuf;
use std::thread;

use bks_core::prelude::*;
use crossbeam_channel::{Receiver, unbounded};

const MIB: u64 = 1024 * 1024;

enum Mode {
    Backup,
    Restore,
}

pub fn handle_backup(
    src_dir: PathBuf,
    dst_dir: PathBuf,
    password: Option<String>,
    chunk: u64,
    workers: usize,
    limit_size: u64,
    limit_wait: u64,
) -> Result<()> {
    let mut settings = Settings::new(src_dir, dst_dir, resolve_password(password)?);
    settings.chunk_size = chunk * MIB;
    settings.workers = workers;
    settings.limit = Limit {
        size: limit_size * MIB,
        wait: limit_wait,
    };
    run_engine(settings, Mode::Backup)
}

pub fn handle_restore(
    src_dir: PathBuf,
    dst_dir: PathBuf,
    password: Option<String>,
    workers: usize,
    limit_size: u64,
    limit_wait: u64,
) -> Result<()> {
    let mut settings = Settings::new(src_dir, dst_dir, resolve_password(password)?);
    settings.workers = workers;
    settings.limit = Limit {
        size: limit_size * MIB,
        wait: limit_wait,
    };
    run_engine(settings, Mode::Restore)
}

fn resolve_password(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => Ok(rpassword::prompt_password("Password: ")?),
    }
}

/// Drive the engine with a plain terminal view. The engine's exit status
/// reflects initialization only; per-directory errors are printed and the
/// process still exits 0.
fn run_engine(settings: Settings, mode: Mode) -> Result<()> {
    let (view_tx, view_rx) = unbounded::<ViewEvent>();
    let (_control_tx, control_rx) = unbounded::<ControlMessage>();

    thread::scope(|s| {
        let renderer = s.spawn(move || render(view_rx));
        let result = match mode {
            Mode::Backup => backup(&settings, &view_tx, &control_rx),
            Mode::Restore => restore(&settings, &view_tx, &control_rx),
        };
        drop(view_tx);
        let _ = renderer.join();
        result
    })
}

/// Consume view events until `Finished`, then replay the error log.
fn render(events: Receiver<ViewEvent>) {
    let mut errors: Vec<String> = Vec::new();
    for event in events.iter() {
        match event {
            ViewEvent::AddWorker { id } => println!("worker {id} ready"),
            ViewEvent::StartDir { src, .. } => println!("dir  {}", src.display()),
            ViewEvent::FinishFile { src, .. } => println!("file {}", src.display()),
            ViewEvent::StartFile { .. } | ViewEvent::FinishDir { .. } => {}
            ViewEvent::Error { id, detail } => {
                eprintln!("error (worker {id}): {detail}");
                errors.push(format!("worker {id}: {detail}"));
            }
            ViewEvent::Finished => break,
        }
    }
    if errors.is_empty() {
        println!("finished");
    } else {
        eprintln!("finished with {} error(s):", errors.len());
        for error in &errors {
            eprintln!("  {error}");
        }
    }
}
