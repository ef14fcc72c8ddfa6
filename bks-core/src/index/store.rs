//! Load and persist the sealed per-directory index file.

use std::path::Path;

use crate::archive::blob::BlobArchive;
use crate::error::{BksError, Result};
use crate::index::entry::{self, DirEntry};

pub const INDEX_FILE_NAME: &str = "_directory_.bks";

/// Reserved names (`_*_.bks`, any case) are exempt from the orphan sweep.
pub fn is_reserved_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.starts_with('_') && lower.ends_with("_.bks")
}

/// Read the prior entries of a backup directory. A missing index, or one
/// that is too short, foreign, or of an unsupported version, yields an empty
/// list so the caller treats the directory as a fresh backup.
pub fn load_entries(index_file: &Path, password: &str) -> Result<Vec<DirEntry>> {
    if !index_file.exists() {
        return Ok(Vec::new());
    }
    match read_entries(index_file, password) {
        Ok(entries) => Ok(entries),
        Err(
            BksError::ArchiveTooShort | BksError::BadMagic | BksError::UnsupportedVersion(_),
        ) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

fn read_entries(index_file: &Path, password: &str) -> Result<Vec<DirEntry>> {
    let blob = BlobArchive::read_from(index_file)?;
    let (_, content) = blob.open(password)?;
    entry::decode_entries(&content)
}

/// Seal `entries` into `index_file`. `label` becomes the sealed name
/// section; the engine stores the source directory path there.
pub fn store_entries(
    index_file: &Path,
    label: &str,
    entries: &[DirEntry],
    password: &str,
) -> Result<()> {
    let content = entry::encode_entries(entries);
    let blob = BlobArchive::seal(label, &content, password)?;
    blob.write_to(index_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::entry::EntryKind;
    use std::fs;

    fn sample() -> Vec<DirEntry> {
        vec![DirEntry {
            kind: EntryKind::File,
            real_name: "a.txt".into(),
            hide_name: "abcdefgh01234567".into(),
            size: 5,
            mtime_nanos: 42,
        }]
    }

    #[test]
    fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join(INDEX_FILE_NAME);
        store_entries(&index, "/src", &sample(), "pw").unwrap();
        assert_eq!(load_entries(&index, "pw").unwrap(), sample());
    }

    #[test]
    fn missing_index_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entries = load_entries(&dir.path().join(INDEX_FILE_NAME), "pw").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn foreign_index_is_treated_as_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join(INDEX_FILE_NAME);
        fs::write(&index, b"not an index").unwrap();
        assert!(load_entries(&index, "pw").unwrap().is_empty());

        fs::write(&index, b"BK").unwrap();
        assert!(load_entries(&index, "pw").unwrap().is_empty());
    }

    #[test]
    fn wrong_password_still_errors() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join(INDEX_FILE_NAME);
        store_entries(&index, "/src", &sample(), "pw").unwrap();
        assert!(matches!(
            load_entries(&index, "other"),
            Err(BksError::CryptoAuth)
        ));
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved_name("_directory_.bks"));
        assert!(is_reserved_name("_DIRECTORY_.BKS"));
        assert!(is_reserved_name("_anything_.bks"));
        assert!(!is_reserved_name("directory.bks"));
        assert!(!is_reserved_name("_directory_.txt"));
        assert!(!is_reserved_name("a1b2c3d4e5f6g7h8.bks"));
    }
}
