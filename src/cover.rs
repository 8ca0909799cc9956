use crate::archive::EpubArchive;
use crate::package::PackageDocument;
use bytes::Bytes;

/// Outcome of looking for a book's cover image.
///
/// A missing cover never fails a parse, but each way of not finding one is
/// kept apart so callers and logs can tell them from "no cover configured".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverLookup {
    /// No `<meta name="cover">` in the package metadata.
    NotDeclared,
    /// The cover meta names a manifest id that does not exist.
    UnknownItem(String),
    /// The manifest href cannot be resolved inside the archive.
    InvalidHref(String),
    /// The resolved path has no archive entry.
    MissingEntry(String),
    /// The entry exists but could not be read.
    Unreadable(String),
    Found(Bytes),
}

impl CoverLookup {
    pub fn into_cover(self) -> Option<Bytes> {
        match self {
            CoverLookup::Found(data) => Some(data),
            _ => None,
        }
    }
}

/// Resolve `href` against the directory of the package document, the way a
/// POSIX path join normalizes `.` and `..`.
///
/// Returns `None` if the result would climb above the archive root or is empty.
pub fn resolve_href(package_path: &str, href: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();

    let dir = package_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    for part in dir.split('/').chain(href.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            part => parts.push(part),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

pub(crate) fn lookup_cover(
    archive: &mut EpubArchive,
    package: &PackageDocument,
    package_path: &str,
) -> CoverLookup {
    let Some(cover_id) = package.cover_id.as_deref() else {
        return CoverLookup::NotDeclared;
    };

    let Some(href) = package.href_for(cover_id).filter(|h| !h.is_empty()) else {
        tracing::debug!(cover_id, "cover meta references unknown manifest item");
        return CoverLookup::UnknownItem(cover_id.to_string());
    };

    let Some(path) = resolve_href(package_path, href) else {
        tracing::debug!(href, "cover href escapes archive root");
        return CoverLookup::InvalidHref(href.to_string());
    };

    if !archive.contains(&path) {
        tracing::debug!(path = %path, "cover entry not present in archive");
        return CoverLookup::MissingEntry(path);
    }

    match archive.read_bytes(&path) {
        Ok(data) => CoverLookup::Found(Bytes::from(data)),
        Err(e) => {
            tracing::warn!(path = %path, "cover entry present but unreadable: {}", e);
            CoverLookup::Unreadable(path)
        }
    }
}
