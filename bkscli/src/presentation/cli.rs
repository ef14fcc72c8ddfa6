use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bks", version, about = "Encrypted, name-hiding directory backup", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Back up a directory tree into an encrypted mirror
    Backup {
        src_dir: PathBuf,
        dst_dir: PathBuf,

        /// Password; prompted interactively when omitted
        #[arg(long, short = 'p')]
        password: Option<String>,

        /// Chunk size in MiB
        #[arg(long, short = 'c', default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
        chunk: u64,

        /// Worker threads (0 = one per logical CPU)
        #[arg(long, default_value_t = 0)]
        workers: usize,

        /// Pause after this many MiB of payload per worker (0 disables)
        #[arg(long, default_value_t = 0)]
        limit_size: u64,

        /// Pause length in seconds (0 disables)
        #[arg(long, default_value_t = 0)]
        limit_wait: u64,
    },

    /// Restore an encrypted mirror back into a directory tree
    Restore {
        src_dir: PathBuf,
        dst_dir: PathBuf,

        /// Password; prompted interactively when omitted
        #[arg(long, short = 'p')]
        password: Option<String>,

        /// Worker threads (0 = one per logical CPU)
        #[arg(long, default_value_t = 0)]
        workers: usize,

        /// Pause after this many MiB of payload per worker (0 disables)
        #[arg(long, default_value_t = 0)]
        limit_size: u64,

        /// Pause length in seconds (0 disables)
        #[arg(long, default_value_t = 0)]
        limit_wait: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn backup_defaults() {
        let cli = Cli::try_parse_from(["bks", "backup", "src", "dst", "-p", "pw"]).unwrap();
        let Commands::Backup {
            src_dir,
            dst_dir,
            password,
            chunk,
            workers,
            limit_size,
            limit_wait,
        } = cli.command
        else {
            panic!("expected backup");
        };
        assert_eq!(src_dir, PathBuf::from("src"));
        assert_eq!(dst_dir, PathBuf::from("dst"));
        assert_eq!(password.as_deref(), Some("pw"));
        assert_eq!(chunk, 16);
        assert_eq!(workers, 0);
        assert_eq!(limit_size, 0);
        assert_eq!(limit_wait, 0);
    }

    #[test]
    fn zero_chunk_is_rejected() {
        assert!(Cli::try_parse_from(["bks", "backup", "a", "b", "-p", "pw", "-c", "0"]).is_err());
    }

    #[test]
    fn missing_directories_are_rejected() {
        assert!(Cli::try_parse_from(["bks", "restore", "only-src"]).is_err());
    }
}
