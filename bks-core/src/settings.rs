use std::path::PathBuf;
use std::thread;

use crate::error::{BksError, Result};

pub const DEFAULT_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Bandwidth throttle: after `size` bytes of payload a worker sleeps for
/// `wait` seconds. Either field at zero disables the throttle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Limit {
    pub size: u64,
    pub wait: u64,
}

/// Configuration for one backup or restore run.
#[derive(Clone, Debug)]
pub struct Settings {
    pub src_dir: PathBuf,
    pub dst_dir: PathBuf,
    pub password: String,
    /// Worker thread count; 0 means the host's logical CPU count.
    pub workers: usize,
    pub chunk_size: u64,
    pub limit: Limit,
}

impl Settings {
    pub fn new(
        src_dir: impl Into<PathBuf>,
        dst_dir: impl Into<PathBuf>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            src_dir: src_dir.into(),
            dst_dir: dst_dir.into(),
            password: password.into(),
            workers: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            limit: Limit::default(),
        }
    }

    /// Worker count with the zero default resolved, never below 1.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.password.is_empty() {
            return Err(BksError::EmptyPassword);
        }
        if self.chunk_size == 0 {
            return Err(BksError::InvalidChunkSize);
        }
        if !self.src_dir.is_dir() {
            return Err(BksError::MissingSource(self.src_dir.clone()));
        }
        Ok(())
    }
}
