use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BksError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("password is required")]
    EmptyPassword,

    #[error("source directory does not exist: {0}")]
    MissingSource(PathBuf),

    #[error("chunk size must be at least 1 byte")]
    InvalidChunkSize,

    #[error("archive is too short")]
    ArchiveTooShort,

    #[error("not a valid archive file")]
    BadMagic,

    #[error("unsupported archive version: {0}")]
    UnsupportedVersion(u16),

    #[error("{0} hash mismatch")]
    HashMismatch(&'static str),

    #[error("ciphertext too short")]
    CryptoShort,

    #[error("authentication failed: wrong password or corrupted data")]
    CryptoAuth,

    #[error("crypto backend failure: {0}")]
    CryptoBackend(String),

    #[error("compression error: {0}")]
    Compress(String),

    #[error("unknown directory entry type")]
    UnknownEntryKind,
}

pub type Result<T> = std::result::Result<T, BksError>;
