//! Whole-buffer `(name, content)` archive, the container behind
//! `_directory_.bks`. Same header as the chunked codec, one data record.

use std::fs;
use std::path::Path;

use crate::archive::stream::{HEADER_LEN, MAGIC, VERSION, open_field, seal_field};
use crate::error::{BksError, Result};
use crate::util::crc;

/// A sealed section plus the 4 CRC bytes stored next to it.
#[derive(Clone, Debug)]
pub struct Section {
    pub data: Vec<u8>,
    pub crc: [u8; 4],
}

#[derive(Clone, Debug)]
pub struct BlobArchive {
    pub name: Section,
    pub data: Section,
}

impl BlobArchive {
    /// Compress and encrypt `name` and `content` into archive form.
    /// The name CRC covers the sealed name bytes, the data CRC the plaintext
    /// content, matching the chunked codec's conventions.
    pub fn seal(name: &str, content: &[u8], password: &str) -> Result<Self> {
        if password.is_empty() {
            return Err(BksError::EmptyPassword);
        }
        let sealed_name = seal_field(name.as_bytes(), password)?;
        let name_crc = crc::crc32_bytes(&sealed_name);
        let content_crc = crc::crc32_bytes(content);
        let sealed_content = seal_field(content, password)?;
        Ok(Self {
            name: Section {
                data: sealed_name,
                crc: name_crc,
            },
            data: Section {
                data: sealed_content,
                crc: content_crc,
            },
        })
    }

    /// Decrypt and decompress back into the `(name, content)` pair.
    pub fn open(&self, password: &str) -> Result<(String, Vec<u8>)> {
        if password.is_empty() {
            return Err(BksError::EmptyPassword);
        }
        if self.name.crc != crc::crc32_bytes(&self.name.data) {
            return Err(BksError::HashMismatch("name"));
        }
        let name = String::from_utf8_lossy(&open_field(&self.name.data, password)?).into_owned();
        let content = open_field(&self.data.data, password)?;
        if self.data.crc != crc::crc32_bytes(&content) {
            return Err(BksError::HashMismatch("content"));
        }
        Ok((name, content))
    }

    /// Parse an archive file from disk.
    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = fs::read(path)?;
        if raw.len() < HEADER_LEN {
            return Err(BksError::ArchiveTooShort);
        }
        if &raw[..3] != MAGIC {
            return Err(BksError::BadMagic);
        }
        let version = u16::from_be_bytes([raw[3], raw[4]]);
        if version != VERSION {
            return Err(BksError::UnsupportedVersion(version));
        }
        let name_len = u32::from_be_bytes([raw[5], raw[6], raw[7], raw[8]]) as usize;

        let mut cursor = Cursor {
            raw: &raw,
            offset: HEADER_LEN,
        };
        let name = Section {
            data: cursor.bytes(name_len)?.to_vec(),
            crc: cursor.crc()?,
        };
        let data_len = u64::from_be_bytes(cursor.bytes(8)?.try_into().expect("8 bytes"));
        let data_len = usize::try_from(data_len).map_err(|_| BksError::ArchiveTooShort)?;
        let data = Section {
            data: cursor.bytes(data_len)?.to_vec(),
            crc: cursor.crc()?,
        };
        if cursor.offset != raw.len() {
            return Err(BksError::ArchiveTooShort);
        }
        Ok(Self { name, data })
    }

    /// Serialize the archive to disk.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut out = Vec::with_capacity(
            HEADER_LEN + self.name.data.len() + 4 + 8 + self.data.data.len() + 4,
        );
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_be_bytes());
        out.extend_from_slice(&(self.name.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.name.data);
        out.extend_from_slice(&self.name.crc);
        out.extend_from_slice(&(self.data.data.len() as u64).to_be_bytes());
        out.extend_from_slice(&self.data.data);
        out.extend_from_slice(&self.data.crc);
        fs::write(path, out)?;
        Ok(())
    }
}

/// Bounds-checked reader over the raw archive bytes.
struct Cursor<'a> {
    raw: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.raw.len())
            .ok_or(BksError::ArchiveTooShort)?;
        let slice = &self.raw[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn crc(&mut self) -> Result<[u8; 4]> {
        Ok(self.bytes(4)?.try_into().expect("4 bytes"))
    }
}
