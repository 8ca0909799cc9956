use crate::segment::{self, Segment, SegmentError, SegmentRef};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Manifest of an uploaded book, sent to the group ahead of its segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub media_type: String,
    pub name: String,
    pub title: String,
    /// Hash of the whole, unsplit file.
    pub sha256: String,
    pub segments: Vec<SegmentRef>,
}

impl FileInfo {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Rebuild the file from received segments and check it against this manifest.
    pub fn verify(&self, segments: &[Segment]) -> Result<Bytes, SegmentError> {
        if segments.len() != self.segments.len() {
            return Err(SegmentError::CountMismatch {
                expected: self.segments.len(),
                actual: segments.len(),
            });
        }

        for (listed, received) in self.segments.iter().zip(segments) {
            if listed.id != received.id {
                return Err(SegmentError::OutOfOrder {
                    expected: listed.id.clone(),
                    found: received.id.clone(),
                });
            }
            if listed.sha256 != received.sha256 {
                return Err(SegmentError::HashMismatch {
                    id: listed.id.clone(),
                    expected: listed.sha256.clone(),
                    actual: received.sha256.clone(),
                });
            }
        }

        let file = segment::reassemble(segments)?;
        let actual = segment::sha256_hex(&file);
        if actual != self.sha256 {
            return Err(SegmentError::FileHashMismatch {
                expected: self.sha256.clone(),
                actual,
            });
        }

        Ok(file)
    }
}

/// Result of parsing one EPUB file.
#[derive(Debug, Clone)]
pub struct ParsedEpubBook {
    pub file_info: FileInfo,
    pub cover: Option<Bytes>,
    pub segments: Vec<Segment>,
}

impl ParsedEpubBook {
    pub fn total_size(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }
}
