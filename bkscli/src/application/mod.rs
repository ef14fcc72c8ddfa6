pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use bks_core::error::Result;
use clap::Parser;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Backup {
            src_dir,
            dst_dir,
            password,
            chunk,
            workers,
            limit_size,
            limit_wait,
        } => handlers::handle_backup(
            src_dir, dst_dir, password, chunk, workers, limit_size, limit_wait,
        ),
        Commands::Restore {
            src_dir,
            dst_dir,
            password,
            workers,
            limit_size,
            limit_wait,
        } => handlers::handle_restore(src_dir, dst_dir, password, workers, limit_size, limit_wait),
    }
}
