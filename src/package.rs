//! Extraction of the few fields the uploader needs from the container
//! document and the package document.
//!
//! Elements are matched on their local name, so `dc:title` and `opf:meta`
//! are found the same way as their unprefixed forms.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// `full-path` of the first `container > rootfiles > rootfile` element.
///
/// Returns `Ok(None)` when there is no such element or it lacks the attribute.
pub fn rootfile_path(container_xml: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(container_xml);
    let mut path: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if is_child_of(&path, &["container", "rootfiles"]) && local_name_is(&e, "rootfile") {
                    return attribute(&e, "full-path");
                }
                path.push(e.local_name().as_ref().to_vec());
            }
            Event::Empty(e) => {
                if is_child_of(&path, &["container", "rootfiles"]) && local_name_is(&e, "rootfile") {
                    return attribute(&e, "full-path");
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// The parts of an OPF package document used for upload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackageDocument {
    pub title: Option<String>,
    /// `content` of the first `<meta name="cover">` under `metadata`.
    pub cover_id: Option<String>,
    /// Manifest item id to href. The first item wins on duplicate ids.
    pub manifest: HashMap<String, String>,
}

impl PackageDocument {
    pub fn parse(xml: &str) -> Result<Self, quick_xml::Error> {
        let mut reader = Reader::from_str(xml);
        let mut path: Vec<Vec<u8>> = Vec::new();
        let mut doc = PackageDocument::default();

        let mut title: Option<String> = None;
        // depth of the `title` element being collected
        let mut title_depth: Option<usize> = None;
        let mut cover_seen = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if title.is_none()
                        && title_depth.is_none()
                        && is_child_of(&path, &["metadata"])
                        && local_name_is(&e, "title")
                    {
                        title_depth = Some(path.len());
                        title = Some(String::new());
                    }
                    doc.visit_element(&path, &e, &mut cover_seen)?;
                    path.push(e.local_name().as_ref().to_vec());
                }
                Event::Empty(e) => {
                    if title.is_none() && is_child_of(&path, &["metadata"]) && local_name_is(&e, "title") {
                        title = Some(String::new());
                    }
                    doc.visit_element(&path, &e, &mut cover_seen)?;
                }
                Event::Text(t) => {
                    if let (Some(text), Some(_)) = (title.as_mut(), title_depth) {
                        text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let (Some(text), Some(_)) = (title.as_mut(), title_depth) {
                        text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::End(_) => {
                    path.pop();
                    if title_depth == Some(path.len()) {
                        title_depth = None;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        doc.title = title.filter(|t| !t.is_empty());
        Ok(doc)
    }

    fn visit_element(
        &mut self,
        path: &[Vec<u8>],
        e: &BytesStart<'_>,
        cover_seen: &mut bool,
    ) -> Result<(), quick_xml::Error> {
        if !*cover_seen
            && is_child_of(path, &["metadata"])
            && local_name_is(e, "meta")
            && attribute(e, "name")?.as_deref() == Some("cover")
        {
            *cover_seen = true;
            self.cover_id = attribute(e, "content")?.filter(|id| !id.is_empty());
        }

        if is_child_of(path, &["manifest"]) {
            if let (Some(id), Some(href)) = (attribute(e, "id")?, attribute(e, "href")?) {
                self.manifest.entry(id).or_insert(href);
            }
        }

        Ok(())
    }

    pub fn href_for(&self, id: &str) -> Option<&str> {
        self.manifest.get(id).map(String::as_str)
    }
}

fn is_child_of(path: &[Vec<u8>], parents: &[&str]) -> bool {
    path.len() >= parents.len()
        && path[path.len() - parents.len()..]
            .iter()
            .zip(parents)
            .all(|(actual, expected)| actual.as_slice() == expected.as_bytes())
}

fn local_name_is(e: &BytesStart<'_>, name: &str) -> bool {
    e.local_name().as_ref() == name.as_bytes()
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, quick_xml::Error> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
