use crate::archive::EpubArchive;
use crate::book::{FileInfo, ParsedEpubBook};
use crate::cover;
use crate::error::{EpubError, EpubResult};
use crate::package::{self, PackageDocument};
use crate::segment::{self, Segment};
use bytes::Bytes;
use std::path::Path;

pub const MIMETYPE_ENTRY: &str = "mimetype";
pub const CONTAINER_ENTRY: &str = "META-INF/container.xml";

/// Parse an EPUB held in memory into its upload manifest, cover and segments.
///
/// `file_name` is recorded as-is in [`FileInfo::name`]. The whole-file hash
/// covers `buffer` exactly as given, not the decompressed entries.
pub fn parse_epub(file_name: &str, buffer: impl Into<Bytes>) -> EpubResult<ParsedEpubBook> {
    let buffer: Bytes = buffer.into();
    let mut archive = EpubArchive::open(buffer.clone())?;

    if !archive.contains(MIMETYPE_ENTRY) {
        return Err(EpubError::MissingMimetype);
    }
    if !archive.contains(CONTAINER_ENTRY) {
        return Err(EpubError::MissingContainer);
    }

    let media_type = archive.read_text(MIMETYPE_ENTRY)?;
    let container_xml = archive.read_text(CONTAINER_ENTRY)?;

    let package_path = package::rootfile_path(&container_xml)
        .map_err(|source| EpubError::MalformedXml {
            entry: CONTAINER_ENTRY.to_string(),
            source,
        })?
        .filter(|p| !p.is_empty())
        .ok_or(EpubError::MissingContainerPath)?;

    if !archive.contains(&package_path) {
        return Err(EpubError::MissingContent);
    }

    let package_xml = archive.read_text(&package_path)?;
    let package =
        PackageDocument::parse(&package_xml).map_err(|source| EpubError::MalformedXml {
            entry: package_path.clone(),
            source,
        })?;

    let title = package.title.clone().ok_or(EpubError::MissingTitle)?;
    let cover = cover::lookup_cover(&mut archive, &package, &package_path).into_cover();

    let sha256 = segment::sha256_hex(&buffer);
    let segments = segment::split_segments(&buffer);

    tracing::debug!(
        name = file_name,
        title = %title,
        size = buffer.len(),
        segments = segments.len(),
        has_cover = cover.is_some(),
        "parsed epub"
    );

    let file_info = FileInfo {
        media_type,
        name: file_name.to_string(),
        title,
        sha256,
        segments: segments.iter().map(Segment::to_ref).collect(),
    };

    Ok(ParsedEpubBook {
        file_info,
        cover,
        segments,
    })
}

/// Read and parse a book from disk, naming it after the file.
pub fn parse_epub_file(path: &Path) -> EpubResult<ParsedEpubBook> {
    let data = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_epub(&name, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{declare_entry_size, EpubBuilder};

    #[test]
    fn test_minimal_book() {
        let data = EpubBuilder::minimal("Minimal").build();
        let book = parse_epub("minimal.epub", data.clone()).unwrap();

        assert_eq!(book.file_info.title, "Minimal");
        assert_eq!(book.file_info.name, "minimal.epub");
        assert_eq!(book.file_info.media_type, "application/epub+zip");
        assert_eq!(book.file_info.sha256, segment::sha256_hex(&data));
        assert!(book.cover.is_none());
        assert_eq!(book.total_size(), data.len());
    }

    #[test]
    fn test_missing_entries_map_to_distinct_errors() {
        let cases = [
            (MIMETYPE_ENTRY, "cant find mimetype"),
            (CONTAINER_ENTRY, "cant find META-INF/container.xml"),
            ("OEBPS/content.opf", "cant find content"),
        ];

        for (entry, message) in cases {
            let data = EpubBuilder::minimal("T").without(entry).build();
            let err = parse_epub("b.epub", data).unwrap_err();
            assert_eq!(err.to_string(), message, "removing {}", entry);
            assert!(err.is_format_error());
        }
    }

    #[test]
    fn test_missing_title() {
        let data = EpubBuilder::minimal("T").package_without_title().build();
        assert!(matches!(
            parse_epub("b.epub", data),
            Err(EpubError::MissingTitle)
        ));
    }

    #[test]
    fn test_missing_rootfile_path() {
        let data = EpubBuilder::minimal("T")
            .with_entry(
                CONTAINER_ENTRY,
                "<container><rootfiles><rootfile/></rootfiles></container>",
            )
            .build();
        assert!(matches!(
            parse_epub("b.epub", data),
            Err(EpubError::MissingContainerPath)
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            parse_epub("b.epub", b"PK but not really".to_vec()),
            Err(EpubError::InvalidArchive(_))
        ));
    }

    #[test]
    fn test_bom_prefixed_documents() {
        let data = EpubBuilder::minimal("Bom")
            .with_bom()
            .build();
        let book = parse_epub("b.epub", data).unwrap();
        assert_eq!(book.file_info.media_type, "application/epub+zip");
        assert_eq!(book.file_info.title, "Bom");
    }

    #[test]
    fn test_cover_is_extracted() {
        let data = EpubBuilder::minimal("Covered")
            .with_cover("images/cover.png", b"\x89PNG")
            .build();
        let book = parse_epub("b.epub", data).unwrap();
        assert_eq!(book.cover.as_deref(), Some(b"\x89PNG".as_slice()));
    }

    #[test]
    fn test_dangling_cover_does_not_fail() {
        let data = EpubBuilder::minimal("Dangling")
            .with_cover_meta("no-such-item")
            .build();
        let book = parse_epub("b.epub", data).unwrap();
        assert!(book.cover.is_none());
    }

    #[test]
    fn test_cover_with_huge_declared_size_is_skipped() {
        let cover = vec![0x42u8; 1234];
        let mut data = EpubBuilder::minimal("Huge Cover")
            .with_cover("images/cover.png", &cover)
            .build();
        assert_eq!(
            declare_entry_size(&mut data, "OEBPS/images/cover.png", 0x7fff_0000),
            1
        );

        let book = parse_epub("b.epub", data.clone()).unwrap();
        assert_eq!(book.file_info.title, "Huge Cover");
        assert!(book.cover.is_none());
        assert_eq!(book.file_info.sha256, segment::sha256_hex(&data));
    }

    #[test]
    fn test_whitespace_title_is_kept_verbatim() {
        let data = EpubBuilder::minimal("\n  Spaced Out  \n").build();
        let book = parse_epub("b.epub", data).unwrap();
        assert_eq!(book.file_info.title, "\n  Spaced Out  \n");

        let data = EpubBuilder::minimal("   ").build();
        assert_eq!(parse_epub("b.epub", data).unwrap().file_info.title, "   ");
    }

    #[test]
    fn test_parse_epub_file_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("on-disk.epub");
        std::fs::write(&path, EpubBuilder::minimal("Disk").build()).unwrap();

        let book = parse_epub_file(&path).unwrap();
        assert_eq!(book.file_info.name, "on-disk.epub");

        let err = parse_epub_file(&dir.path().join("absent.epub")).unwrap_err();
        assert!(!err.is_format_error());
    }
}
