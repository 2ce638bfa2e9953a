use crate::core::{PassivationError, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Upper bound on the inflated size of a single frame.
pub const MAX_DECOMPRESSED_LEN: u64 = 1024 * 1024 * 1024;

pub fn compressing_writer<W: Write>(inner: W, level: u32) -> GzEncoder<W> {
    GzEncoder::new(inner, Compression::new(level.min(9)))
}

pub fn decompressing_reader<R: Read>(inner: R) -> GzDecoder<R> {
    GzDecoder::new(inner)
}

pub fn compress(bytes: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = compressing_writer(Vec::with_capacity(bytes.len() / 2), level);
    encoder
        .write_all(bytes)
        .map_err(|e| PassivationError::store("compress frame", e))?;
    encoder
        .finish()
        .map_err(|e| PassivationError::store("compress frame", e))
}

pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    decompress_bounded(bytes, MAX_DECOMPRESSED_LEN)
}

/// Inflates `bytes`, failing with `CorruptFrame` once the output exceeds `limit`.
pub fn decompress_bounded(bytes: &[u8], limit: u64) -> Result<Vec<u8>> {
    let mut decoded = Vec::with_capacity(bytes.len().saturating_mul(2));
    decompressing_reader(bytes)
        .take(limit.saturating_add(1))
        .read_to_end(&mut decoded)
        .map_err(|e| PassivationError::corrupt("decompress frame", e))?;
    if decoded.len() as u64 > limit {
        return Err(PassivationError::CorruptFrame(format!(
            "decompressed frame exceeds {} bytes",
            limit
        )));
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_shrinks_repetitive_frames() {
        let payload = vec![7u8; 4096];
        let compressed = compress(&payload, DEFAULT_COMPRESSION_LEVEL).unwrap();
        assert!(compressed.len() < payload.len());
        assert_eq!(decompress(&compressed).unwrap(), payload);
    }

    #[test]
    fn test_inflated_size_is_bounded() {
        let payload = vec![0u8; 64 * 1024];
        let compressed = compress(&payload, 9).unwrap();
        assert!(compressed.len() < 1024);

        let err = decompress_bounded(&compressed, 4096).unwrap_err();
        assert!(matches!(err, PassivationError::CorruptFrame(_)));

        let exact = decompress_bounded(&compressed, payload.len() as u64).unwrap();
        assert_eq!(exact, payload);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let err = decompress(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, PassivationError::CorruptFrame(_)));
    }
}
