/// CRC32 (IEEE) of `data`, serialized big-endian.
pub fn crc32_bytes(data: &[u8]) -> [u8; 4] {
    crc32fast::hash(data).to_be_bytes()
}
