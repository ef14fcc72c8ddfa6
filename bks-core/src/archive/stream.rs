//! Chunked streaming `.bks` archive: an encrypted file name header followed
//! by length-prefixed records of compressed, sealed payload chunks.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::codec::deflate;
use crate::crypto::aead;
use crate::error::{BksError, Result};
use crate::util::crc;

pub const MAGIC: &[u8; 3] = b"BKS";
pub const VERSION: u16 = 1;
/// Magic + version + name length.
pub const HEADER_LEN: usize = 3 + 2 + 4;

/// Compress, then seal one field with its own fresh salt and nonce.
pub(crate) fn seal_field(plain: &[u8], password: &str) -> Result<Vec<u8>> {
    let compressed = deflate::compress(plain)?;
    aead::seal_with_password(&compressed, password)
}

/// Inverse of `seal_field`.
pub(crate) fn open_field(sealed: &[u8], password: &str) -> Result<Vec<u8>> {
    let compressed = aead::open_with_password(sealed, password)?;
    deflate::decompress(&compressed)
}

/// Archive `src` into `dst`, recording `real_name` in the sealed header.
/// Reads at most `chunk_size` plaintext bytes at a time; the final chunk may
/// be shorter.
pub fn export(
    src: &Path,
    dst: &Path,
    real_name: &str,
    password: &str,
    chunk_size: u64,
) -> Result<()> {
    let mut reader = File::open(src)?;
    let mut writer = BufWriter::new(File::create(dst)?);

    let sealed_name = seal_field(real_name.as_bytes(), password)?;
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_be_bytes())?;
    writer.write_all(&(sealed_name.len() as u32).to_be_bytes())?;
    writer.write_all(&sealed_name)?;
    writer.write_all(&crc::crc32_bytes(&sealed_name))?;

    let mut chunk = vec![0u8; chunk_size as usize];
    loop {
        let filled = fill_chunk(&mut reader, &mut chunk)?;
        if filled == 0 {
            break;
        }
        let plain = &chunk[..filled];
        let plain_crc = crc::crc32_bytes(plain);
        let sealed = seal_field(plain, password)?;
        writer.write_all(&(sealed.len() as u64).to_be_bytes())?;
        writer.write_all(&sealed)?;
        writer.write_all(&plain_crc)?;
    }
    writer.flush()?;
    Ok(())
}

/// Decode `archive` into `<out_dir>/<real name>` and return that path.
pub fn import(archive: &Path, out_dir: &Path, password: &str) -> Result<PathBuf> {
    let mut reader = BufReader::new(File::open(archive)?);

    let mut header = [0u8; HEADER_LEN];
    read_exact_or_short(&mut reader, &mut header)?;
    if &header[..3] != MAGIC {
        return Err(BksError::BadMagic);
    }
    let version = u16::from_be_bytes([header[3], header[4]]);
    if version != VERSION {
        return Err(BksError::UnsupportedVersion(version));
    }
    let name_len = u32::from_be_bytes([header[5], header[6], header[7], header[8]]) as u64;

    let sealed_name = read_field(&mut reader, name_len)?;
    let real_name = String::from_utf8_lossy(&open_field(&sealed_name, password)?).into_owned();

    let mut stored_crc = [0u8; 4];
    read_exact_or_short(&mut reader, &mut stored_crc)?;
    if stored_crc != crc::crc32_bytes(&sealed_name) {
        return Err(BksError::HashMismatch("name"));
    }

    // The name must stay a plain file name; a path would escape `out_dir`.
    if real_name.is_empty() || real_name == ".." || real_name.contains(['/', '\\']) {
        return Err(std::io::Error::new(
            ErrorKind::InvalidData,
            format!("unsafe archive name: {real_name}"),
        )
        .into());
    }

    let out_path = out_dir.join(&real_name);
    let mut writer = BufWriter::new(File::create(&out_path)?);

    loop {
        let mut len_buf = [0u8; 8];
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let chunk_len = u64::from_be_bytes(len_buf);

        let sealed = read_field(&mut reader, chunk_len)?;
        let mut stored_crc = [0u8; 4];
        read_exact_or_short(&mut reader, &mut stored_crc)?;

        let plain = open_field(&sealed, password)?;
        if stored_crc != crc::crc32_bytes(&plain) {
            return Err(BksError::HashMismatch("chunk"));
        }
        writer.write_all(&plain)?;
    }
    writer.flush()?;
    Ok(out_path)
}

/// Fill `buf` from `r`; a short count only happens at end of file.
fn fill_chunk(r: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = r.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Read exactly `len` bytes. The length field is untrusted, so the read is
/// bounded by the remaining file instead of a pre-sized allocation.
fn read_field(r: &mut impl Read, len: u64) -> Result<Vec<u8>> {
    let mut field = Vec::new();
    r.take(len).read_to_end(&mut field)?;
    if field.len() as u64 != len {
        return Err(BksError::ArchiveTooShort);
    }
    Ok(field)
}

fn read_exact_or_short(r: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => BksError::ArchiveTooShort,
        _ => BksError::Io(e),
    })
}
