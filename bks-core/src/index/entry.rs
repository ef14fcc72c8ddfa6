//! Binary codec for directory index entries.
//!
//! Per entry: tag(1) + realNameLen(u32) + hideNameLen(u32) + names +
//! size(u64) + mtime nanos(i64), all big-endian.

use crate::error::{BksError, Result};

/// Fixed bytes per entry besides the two names.
const ENTRY_FIXED_LEN: usize = 1 + 4 + 4 + 8 + 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Unknown,
}

impl EntryKind {
    pub fn tag(self) -> u8 {
        match self {
            EntryKind::Directory => b'D',
            EntryKind::File => b'F',
            EntryKind::Unknown => b'U',
        }
    }

    /// Foreign tags decode to `Unknown`; restore rejects them later.
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            b'D' => EntryKind::Directory,
            b'F' => EntryKind::File,
            _ => EntryKind::Unknown,
        }
    }
}

/// One file or subdirectory in a backup directory's index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub kind: EntryKind,
    pub real_name: String,
    pub hide_name: String,
    /// Source byte length at last archival; 0 for directories.
    pub size: u64,
    /// Source modification time, nanoseconds since the Unix epoch.
    pub mtime_nanos: i64,
}

pub fn encode_entries(entries: &[DirEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        entries
            .iter()
            .map(|e| ENTRY_FIXED_LEN + e.real_name.len() + e.hide_name.len())
            .sum(),
    );
    for entry in entries {
        out.push(entry.kind.tag());
        out.extend_from_slice(&(entry.real_name.len() as u32).to_be_bytes());
        out.extend_from_slice(&(entry.hide_name.len() as u32).to_be_bytes());
        out.extend_from_slice(entry.real_name.as_bytes());
        out.extend_from_slice(entry.hide_name.as_bytes());
        out.extend_from_slice(&entry.size.to_be_bytes());
        out.extend_from_slice(&entry.mtime_nanos.to_be_bytes());
    }
    out
}

pub fn decode_entries(content: &[u8]) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < content.len() {
        if content.len() - offset < ENTRY_FIXED_LEN {
            return Err(BksError::ArchiveTooShort);
        }
        let kind = EntryKind::from_tag(content[offset]);
        let real_len = be_u32(&content[offset + 1..offset + 5]) as usize;
        let hide_len = be_u32(&content[offset + 5..offset + 9]) as usize;
        offset += 9;

        let names_end = offset
            .checked_add(real_len)
            .and_then(|n| n.checked_add(hide_len))
            .filter(|end| end.checked_add(16).is_some_and(|e| e <= content.len()))
            .ok_or(BksError::ArchiveTooShort)?;
        let real_name = String::from_utf8_lossy(&content[offset..offset + real_len]).into_owned();
        let hide_name =
            String::from_utf8_lossy(&content[offset + real_len..names_end]).into_owned();
        offset = names_end;

        let size = u64::from_be_bytes(content[offset..offset + 8].try_into().expect("8 bytes"));
        let mtime_nanos =
            i64::from_be_bytes(content[offset + 8..offset + 16].try_into().expect("8 bytes"));
        offset += 16;

        entries.push(DirEntry {
            kind,
            real_name,
            hide_name,
            size,
            mtime_nanos,
        });
    }
    Ok(entries)
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes(bytes.try_into().expect("4 bytes"))
}
