use crate::error::{EpubError, EpubResult};
use bytes::Bytes;
use std::io::{self, Cursor, Read};
use zip::ZipArchive;

const BOM: char = '\u{feff}';

/// Largest entry that will be read into memory. Sizes in the central
/// directory are taken from the archive and cannot be trusted.
pub const MAX_ENTRY_SIZE: u64 = 64 * 1024 * 1024;

/// Read access to the entries of a zipped EPUB held in memory.
///
/// Entry names are matched exactly as stored, always with forward slashes.
pub struct EpubArchive {
    zip: ZipArchive<Cursor<Bytes>>,
}

impl EpubArchive {
    pub fn open(buffer: Bytes) -> EpubResult<Self> {
        let zip = ZipArchive::new(Cursor::new(buffer)).map_err(EpubError::InvalidArchive)?;
        Ok(Self { zip })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.zip.index_for_name(name).is_some()
    }

    pub fn read_bytes(&mut self, name: &str) -> EpubResult<Vec<u8>> {
        let unreadable = |source: io::Error| EpubError::UnreadableEntry {
            entry: name.to_string(),
            source,
        };

        let mut file = self
            .zip
            .by_name(name)
            .map_err(|e| unreadable(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let too_large = |size: u64| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("entry size {} exceeds limit of {} bytes", size, MAX_ENTRY_SIZE),
            )
        };

        let declared = file.size();
        if declared > MAX_ENTRY_SIZE {
            return Err(unreadable(too_large(declared)));
        }

        let mut data = Vec::with_capacity(declared as usize);
        file.by_ref()
            .take(MAX_ENTRY_SIZE + 1)
            .read_to_end(&mut data)
            .map_err(unreadable)?;
        if data.len() as u64 > MAX_ENTRY_SIZE {
            return Err(unreadable(too_large(data.len() as u64)));
        }
        Ok(data)
    }

    /// Read an entry as UTF-8 text, dropping a leading byte order mark.
    pub fn read_text(&mut self, name: &str) -> EpubResult<String> {
        let data = self.read_bytes(name)?;
        Ok(strip_bom(&String::from_utf8_lossy(&data)).to_string())
    }
}

pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}
