use crate::book::ParsedEpubBook;
use crate::epub_reader::BookDescription;

/// Render a book's descriptive metadata and upload manifest as a text block.
pub fn format_metadata(description: &BookDescription, book: &ParsedEpubBook) -> String {
    let info = &book.file_info;
    let mut lines = Vec::new();

    let title = description.title.as_deref().unwrap_or(&info.title);
    lines.push(format!("# {}", title));
    lines.push(String::new());

    if !description.authors.is_empty() {
        lines.push(format!("**Author:** {}", description.authors.join(", ")));
    }

    if let Some(publisher) = &description.publisher {
        lines.push(format!("**Publisher:** {}", publisher));
    }

    if let Some(language) = &description.language {
        lines.push(format!("**Language:** {}", language));
    }

    if let Some(text) = &description.description {
        lines.push(String::new());
        lines.push(format!("> {}", text));
    }

    if lines.last().is_some_and(|l| !l.is_empty()) {
        lines.push(String::new());
    }
    lines.push("---".to_string());
    lines.push(String::new());

    lines.push(format!("**File:** {}", info.name));
    lines.push(format!("**Media type:** {}", info.media_type));
    lines.push(format!("**Size:** {} bytes", book.total_size()));
    lines.push(format!("**SHA-256:** {}", info.sha256));
    lines.push(format!("**Segments:** {}", info.segment_count()));
    lines.push(format!(
        "**Cover:** {}",
        match &book.cover {
            Some(cover) => format!("{} bytes", cover.len()),
            None => "none".to_string(),
        }
    ));

    lines.join("\n") + "\n"
}
