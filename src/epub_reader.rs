use anyhow::{Context, Result};
use rbook::prelude::*;
use rbook::Epub;
use std::path::Path;

/// Descriptive metadata shown alongside a book's upload manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDescription {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
}

/// Full EPUB reader used for the fields the uploader does not need.
pub struct EpubData {
    epub: Epub,
}

impl EpubData {
    pub fn open(path: &Path) -> Result<Self> {
        let epub = Epub::options()
            .strict(false)
            .open(path)
            .with_context(|| format!("Failed to open EPUB: {}", path.display()))?;
        Ok(Self { epub })
    }

    pub fn describe(&self) -> BookDescription {
        let metadata = self.epub.metadata();

        BookDescription {
            title: metadata.title().map(|t| t.value().to_string()),
            authors: metadata
                .creators()
                .map(|c| c.value().to_string())
                .collect(),
            publisher: metadata.publishers().next().map(|p| p.value().to_string()),
            language: metadata.languages().next().map(|l| l.value().to_string()),
            description: metadata
                .descriptions()
                .next()
                .map(|d| d.value().to_string()),
        }
    }
}
