//! Prepare EPUB books for content-addressed upload to a group network.
//!
//! [`parse_epub`] reads the container, extracts the title and cover, and
//! splits the file into hashed [`Segment`]s listed in a [`FileInfo`]
//! manifest. [`trx::wait_for_trx`] waits for a submitted transaction to
//! become visible on a node.

pub mod archive;
pub mod book;
pub mod config;
pub mod cover;
pub mod epub;
pub mod epub_reader;
pub mod error;
pub mod metadata;
pub mod package;
pub mod segment;
pub mod trx;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use book::{FileInfo, ParsedEpubBook};
pub use epub::{parse_epub, parse_epub_file};
pub use error::{EpubError, EpubResult};
pub use segment::{sha256_hex, Segment, SegmentRef, SEGMENT_SIZE};
