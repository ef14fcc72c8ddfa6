use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{BksError, Result};

/// Compress a buffer with zlib-wrapped deflate.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| BksError::Compress(e.to_string()))?;
    encoder.finish().map_err(|e| BksError::Compress(e.to_string()))
}

/// Inverse of `compress`.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| BksError::Compress(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"hello, deflate! ".repeat(64);
        let packed = compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn empty_buffer_round_trips() {
        let packed = compress(b"").unwrap();
        assert_eq!(decompress(&packed).unwrap(), b"");
    }

    #[test]
    fn garbage_input_is_rejected() {
        assert!(matches!(
            decompress(b"definitely not zlib"),
            Err(BksError::Compress(_))
        ));
    }
}
