use thiserror::Error;

pub type EpubResult<T> = Result<T, EpubError>;

/// Reasons an EPUB buffer cannot be turned into a [`ParsedEpubBook`](crate::book::ParsedEpubBook).
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("cant open archive: {0}")]
    InvalidArchive(#[source] zip::result::ZipError),

    #[error("cant find mimetype")]
    MissingMimetype,

    #[error("cant find META-INF/container.xml")]
    MissingContainer,

    #[error("cant find container path")]
    MissingContainerPath,

    #[error("cant find content")]
    MissingContent,

    #[error("cant find title")]
    MissingTitle,

    #[error("malformed entry {entry}: {source}")]
    UnreadableEntry {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed entry {entry}: {source}")]
    MalformedXml {
        entry: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("failed to read book: {0}")]
    Io(#[from] std::io::Error),
}

impl EpubError {
    /// True when the input itself violates the EPUB container format, as
    /// opposed to the book file being unreadable from disk.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, EpubError::Io(_))
    }
}
