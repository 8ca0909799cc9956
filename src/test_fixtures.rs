//! In-memory EPUB archives for unit tests.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PACKAGE_PATH: &str = "OEBPS/content.opf";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Zip the given entries, in order, without compression.
pub fn zip_entries(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, data) in entries {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(data).expect("write zip entry");
    }

    writer.finish().expect("finish zip").into_inner()
}

const CENTRAL_HEADER_SIG: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];

/// Rewrite the uncompressed size the central directory records for `name`.
/// Returns how many headers were patched.
///
/// Central header layout: uncompressed size at offset 24, name length at 28,
/// name bytes from 46.
pub fn declare_entry_size(data: &mut [u8], name: &str, declared: u32) -> usize {
    let mut patched = 0;
    let mut i = 0;

    while i + 46 <= data.len() {
        if data[i..i + 4] != CENTRAL_HEADER_SIG {
            i += 1;
            continue;
        }
        let name_len = u16::from_le_bytes([data[i + 28], data[i + 29]]) as usize;
        if data.get(i + 46..i + 46 + name_len) == Some(name.as_bytes()) {
            data[i + 24..i + 28].copy_from_slice(&declared.to_le_bytes());
            patched += 1;
        }
        i += 46;
    }

    patched
}

pub struct EpubBuilder {
    title: Option<String>,
    cover_meta: Option<String>,
    cover_item: Option<(String, Vec<u8>)>,
    bom: bool,
    overrides: Vec<(String, Vec<u8>)>,
    removed: Vec<String>,
}

impl EpubBuilder {
    pub fn minimal(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            cover_meta: None,
            cover_item: None,
            bom: false,
            overrides: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn without(mut self, entry: &str) -> Self {
        self.removed.push(entry.to_string());
        self
    }

    pub fn with_entry(mut self, name: &str, data: impl AsRef<[u8]>) -> Self {
        self.overrides.push((name.to_string(), data.as_ref().to_vec()));
        self
    }

    pub fn package_without_title(mut self) -> Self {
        self.title = None;
        self
    }

    pub fn with_bom(mut self) -> Self {
        self.bom = true;
        self
    }

    /// Declare a cover meta pointing at manifest item `id`, without adding the item.
    pub fn with_cover_meta(mut self, id: &str) -> Self {
        self.cover_meta = Some(id.to_string());
        self
    }

    /// Add a cover image at `href`, relative to the package document.
    pub fn with_cover(mut self, href: &str, data: &[u8]) -> Self {
        self.cover_meta = Some("cover-image".to_string());
        self.cover_item = Some((href.to_string(), data.to_vec()));
        self
    }

    fn package_xml(&self) -> String {
        let title = self
            .title
            .as_ref()
            .map(|t| format!("<dc:title>{}</dc:title>", t))
            .unwrap_or_default();
        let cover_meta = self
            .cover_meta
            .as_ref()
            .map(|id| format!(r#"<meta name="cover" content="{}"/>"#, id))
            .unwrap_or_default();
        let cover_item = self
            .cover_item
            .as_ref()
            .map(|(href, _)| {
                format!(
                    r#"<item id="cover-image" href="{}" media-type="image/png"/>"#,
                    href
                )
            })
            .unwrap_or_default();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    {title}
    {cover_meta}
  </metadata>
  <manifest>
    <item id="chapter" href="chapter.xhtml" media-type="application/xhtml+xml"/>
    {cover_item}
  </manifest>
</package>"#
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let bom = if self.bom { "\u{feff}" } else { "" };
        let mut entries: Vec<(String, Vec<u8>)> = vec![
            ("mimetype".to_string(), format!("{bom}application/epub+zip").into_bytes()),
            (
                "META-INF/container.xml".to_string(),
                format!("{bom}{CONTAINER_XML}").into_bytes(),
            ),
            (
                PACKAGE_PATH.to_string(),
                format!("{bom}{}", self.package_xml()).into_bytes(),
            ),
            (
                "OEBPS/chapter.xhtml".to_string(),
                b"<html><body><p>Call me Ishmael.</p></body></html>".to_vec(),
            ),
        ];

        if let Some((href, data)) = &self.cover_item {
            entries.push((format!("OEBPS/{}", href), data.clone()));
        }

        for (name, data) in &self.overrides {
            match entries.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = data.clone(),
                None => entries.push((name.clone(), data.clone())),
            }
        }

        entries.retain(|(name, _)| !self.removed.contains(name));

        let refs: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();
        zip_entries(&refs)
    }
}
