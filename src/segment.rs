use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Size of every segment except possibly the last (150 KiB).
pub const SEGMENT_SIZE: usize = 150 * 1024;

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn segment_id(index: usize) -> String {
    format!("seg-{}", index + 1)
}

/// A contiguous slice of a book file, hashed on its own for transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: String,
    pub sha256: String,
    pub buf: Bytes,
}

/// A segment's identity without its bytes, as listed in a file manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRef {
    pub id: String,
    pub sha256: String,
}

impl Segment {
    pub fn new(id: impl Into<String>, buf: Bytes) -> Self {
        let sha256 = sha256_hex(&buf);
        Self {
            id: id.into(),
            sha256,
            buf,
        }
    }

    pub fn to_ref(&self) -> SegmentRef {
        SegmentRef {
            id: self.id.clone(),
            sha256: self.sha256.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Split `buf` into [`SEGMENT_SIZE`] chunks numbered from `seg-1`.
///
/// The chunks share `buf`'s allocation. An empty buffer yields no segments.
pub fn split_segments(buf: &Bytes) -> Vec<Segment> {
    buf.chunks(SEGMENT_SIZE)
        .enumerate()
        .map(|(i, chunk)| {
            let start = i * SEGMENT_SIZE;
            Segment::new(segment_id(i), buf.slice(start..start + chunk.len()))
        })
        .collect()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("expected segment {expected}, found {found}")]
    OutOfOrder { expected: String, found: String },

    #[error("segment {id} hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("expected {expected} segments, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("file hash mismatch: expected {expected}, got {actual}")]
    FileHashMismatch { expected: String, actual: String },
}

/// Concatenate segments back into the original file, checking that ids run
/// `seg-1..seg-N` and that every segment's bytes still match its hash.
pub fn reassemble(segments: &[Segment]) -> Result<Bytes, SegmentError> {
    let total = segments.iter().map(Segment::len).sum();
    let mut out = BytesMut::with_capacity(total);

    for (i, segment) in segments.iter().enumerate() {
        let expected = segment_id(i);
        if segment.id != expected {
            return Err(SegmentError::OutOfOrder {
                expected,
                found: segment.id.clone(),
            });
        }

        let actual = sha256_hex(&segment.buf);
        if actual != segment.sha256 {
            return Err(SegmentError::HashMismatch {
                id: segment.id.clone(),
                expected: segment.sha256.clone(),
                actual,
            });
        }

        out.extend_from_slice(&segment.buf);
    }

    Ok(out.freeze())
}
