//! Chunk planning: how a file of a given size maps onto one-byte chunk numbers.
//!
//! Chunk numbers are a single byte on the wire, so one transfer holds at most
//! [`MAX_CHUNKS`] chunks. Nothing here wraps past that limit.

use std::ops::Range;

use sha2::{Digest, Sha256};

/// Upper bound on chunks per transfer (chunk numbers 0..=255).
pub const MAX_CHUNKS: usize = u8::MAX as usize + 1;

/// Error planning chunks for a transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkLimitError {
    #[error("chunk size must be non-zero")]
    ZeroChunkSize,
    #[error("{chunks} chunks needed, at most {} fit in one transfer", MAX_CHUNKS)]
    TooManyChunks { chunks: u64 },
    #[error("chunk index {0} does not fit in one byte")]
    IndexOutOfRange(usize),
    #[error("chunk {number} starts past the end of a {total}-byte file")]
    PastEnd { number: u8, total: u64 },
}

/// Number of chunks a `total`-byte file splits into. The last chunk may be short.
pub fn chunk_count(total: u64, chunk_size: u32) -> Result<usize, ChunkLimitError> {
    if chunk_size == 0 {
        return Err(ChunkLimitError::ZeroChunkSize);
    }
    let chunks = total.div_ceil(u64::from(chunk_size));
    if chunks > MAX_CHUNKS as u64 {
        return Err(ChunkLimitError::TooManyChunks { chunks });
    }
    Ok(chunks as usize)
}

/// Smallest chunk size that fits `total` bytes into [`MAX_CHUNKS`] chunks.
pub fn min_chunk_size(total: u64) -> u64 {
    total.div_ceil(MAX_CHUNKS as u64).max(1)
}

/// Wire chunk number for a zero-based index.
pub fn chunk_number(index: usize) -> Result<u8, ChunkLimitError> {
    u8::try_from(index).map_err(|_| ChunkLimitError::IndexOutOfRange(index))
}

/// Byte range of chunk `number` within a `total`-byte file.
pub fn chunk_range(number: u8, chunk_size: u32, total: u64) -> Result<Range<u64>, ChunkLimitError> {
    if chunk_size == 0 {
        return Err(ChunkLimitError::ZeroChunkSize);
    }
    let start = u64::from(number) * u64::from(chunk_size);
    if start >= total && !(number == 0 && total == 0) {
        return Err(ChunkLimitError::PastEnd { number, total });
    }
    let end = (start + u64::from(chunk_size)).min(total);
    Ok(start..end)
}

/// All chunk ranges of a `total`-byte file, in order.
pub fn plan(total: u64, chunk_size: u32) -> Result<Vec<Range<u64>>, ChunkLimitError> {
    let count = chunk_count(total, chunk_size)?;
    (0..count)
        .map(|i| chunk_range(chunk_number(i)?, chunk_size, total))
        .collect()
}

/// SHA-256 of a chunk payload.
pub fn chunk_digest(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_rounds_up() {
        assert_eq!(chunk_count(0, 10), Ok(0));
        assert_eq!(chunk_count(10, 10), Ok(1));
        assert_eq!(chunk_count(11, 10), Ok(2));
    }

    #[test]
    fn count_caps_at_256() {
        assert_eq!(chunk_count(256, 1), Ok(256));
        assert_eq!(
            chunk_count(257, 1),
            Err(ChunkLimitError::TooManyChunks { chunks: 257 })
        );
        assert_eq!(chunk_count(5, 0), Err(ChunkLimitError::ZeroChunkSize));
    }

    #[test]
    fn min_chunk_size_always_fits() {
        for total in [0u64, 1, 255, 256, 257, 1 << 20, u32::MAX as u64] {
            let size = min_chunk_size(total) as u32;
            assert!(chunk_count(total, size).is_ok(), "{total}");
        }
    }

    #[test]
    fn number_does_not_wrap() {
        assert_eq!(chunk_number(0), Ok(0));
        assert_eq!(chunk_number(255), Ok(255));
        assert_eq!(
            chunk_number(256),
            Err(ChunkLimitError::IndexOutOfRange(256))
        );
    }

    #[test]
    fn ranges_cover_file_with_short_tail() {
        let ranges = plan(25, 10).unwrap();
        assert_eq!(ranges, vec![0..10, 10..20, 20..25]);
        assert_eq!(
            chunk_range(3, 10, 25),
            Err(ChunkLimitError::PastEnd {
                number: 3,
                total: 25
            })
        );
    }

    #[test]
    fn empty_file_has_no_chunks() {
        assert_eq!(chunk_range(0, 10, 0), Ok(0..0));
        assert!(plan(0, 10).unwrap().is_empty());
    }

    #[test]
    fn digest_detects_tampering() {
        let d = chunk_digest(b"hello chunk");
        assert_eq!(d, chunk_digest(b"hello chunk"));
        assert_ne!(d, chunk_digest(b"tampered"));
    }
}
