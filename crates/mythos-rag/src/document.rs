//! Reading source documents from a corpus directory

use lopdf::Document as PdfDocument;
use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::Html;
use std::fs;
use std::path::Path;

use mythos_core::{Error, Result, SourceDocument};

/// File formats the corpus loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Html,
    Pdf,
}

impl DocumentFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> Option<DocumentFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "txt" | "text" => Some(DocumentFormat::PlainText),
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            "html" | "htm" => Some(DocumentFormat::Html),
            "pdf" => Some(DocumentFormat::Pdf),
            _ => None,
        }
    }

    /// Turn file contents into the raw text that gets chunked.
    ///
    /// Text formats are decoded lossily as UTF-8. Only a PDF that cannot be
    /// parsed at all is an error.
    pub fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        let text = match self {
            DocumentFormat::PlainText => String::from_utf8_lossy(bytes).into_owned(),
            DocumentFormat::Markdown => markdown_to_text(&String::from_utf8_lossy(bytes)),
            DocumentFormat::Html => html_to_text(&String::from_utf8_lossy(bytes)),
            DocumentFormat::Pdf => pdf_to_text(bytes)
                .map_err(|e| Error::Document(format!("unreadable PDF: {}", e)))?,
        };
        Ok(text)
    }
}

/// Load every supported document directly inside `dir`.
///
/// Files are read in name order so that repeated builds assign the same
/// fragment positions. Documents without any text are skipped.
pub fn load_documents(dir: &Path) -> Result<Vec<SourceDocument>> {
    if !dir.is_dir() {
        return Err(Error::Document(format!(
            "document directory '{}' does not exist",
            dir.display()
        )));
    }

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let Some(format) = DocumentFormat::from_path(&path) else {
            tracing::debug!("skipping unsupported file {}", path.display());
            continue;
        };

        let bytes = fs::read(&path)
            .map_err(|e| Error::Document(format!("failed to read {}: {}", path.display(), e)))?;
        let text = format.extract_text(&bytes).map_err(|e| match e {
            Error::Document(msg) => Error::Document(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        if text.trim().is_empty() {
            tracing::warn!("skipping {}: no extractable text", name);
            continue;
        }

        tracing::debug!("loaded {} ({} chars)", name, text.chars().count());
        documents.push(SourceDocument::new(name, text));
    }

    tracing::info!("loaded {} documents from {}", documents.len(), dir.display());
    Ok(documents)
}

fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::Item)
            | Event::End(TagEnd::CodeBlock) => text.push('\n'),
            _ => {}
        }
    }

    text.truncate(text.trim_end().len());
    text
}

fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts = Vec::new();

    for node in document.tree.nodes() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|e| matches!(e.name(), "script" | "style" | "head" | "noscript"))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
    }

    parts.join("\n")
}

/// Page texts in page order, skipping pages that carry no text
fn pdf_to_text(bytes: &[u8]) -> lopdf::Result<String> {
    let document = PdfDocument::load_mem(bytes)?;
    let mut pages = Vec::new();

    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text.trim_end().to_string()),
            Ok(_) => tracing::debug!("page {} has no text", page_number),
            Err(e) => tracing::debug!("no text extracted from page {}: {}", page_number, e),
        }
    }

    Ok(pages.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::chunk;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use tempfile::tempdir;

    /// Write a PDF with one page per entry; an empty entry makes a page without text
    fn write_pdf(path: &Path, pages: &[&str]) {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn non_empty_lines(text: &str) -> Vec<&str> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("iliad.TXT")),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes.md")),
            Some(DocumentFormat::Markdown)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("page.htm")),
            Some(DocumentFormat::Html)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("greek.PDF")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("notes.docx")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_markdown_to_text() {
        let text = markdown_to_text("# Heroes\n\nAchilles and *Hector* fought at `Troy`.\n\n- Ajax\n- Odysseus\n");
        assert_eq!(
            text,
            "Heroes\nAchilles and Hector fought at Troy.\nAjax\nOdysseus"
        );
    }

    #[test]
    fn test_markdown_leaves_no_whitespace_fragment() {
        let text = DocumentFormat::Markdown.extract_text(b"ABCDE").unwrap();
        assert_eq!(text, "ABCDE");
        assert_eq!(chunk(&text, 5).unwrap(), vec!["ABCDE"]);
    }

    #[test]
    fn test_html_to_text_skips_scripts() {
        let html = r#"
            <html>
                <head><title>Ignored</title><style>p { color: red; }</style></head>
                <body>
                    <h1>Oracle of Delphi</h1>
                    <script>var x = 1;</script>
                    <p>The Pythia spoke for Apollo.</p>
                </body>
            </html>
        "#;
        assert_eq!(html_to_text(html), "Oracle of Delphi\nThe Pythia spoke for Apollo.");
    }

    #[test]
    fn test_pdf_pages_in_order_skipping_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("greek.pdf");
        write_pdf(&path, &["Zeus ruled Olympus.", "", "Hera was his queen."]);

        let text = DocumentFormat::Pdf
            .extract_text(&fs::read(&path).unwrap())
            .unwrap();
        assert_eq!(
            non_empty_lines(&text),
            vec!["Zeus ruled Olympus.", "Hera was his queen."]
        );
        assert_eq!(text.trim_end(), text);
    }

    #[test]
    fn test_load_pdf_only_corpus() {
        let dir = tempdir().unwrap();
        write_pdf(&dir.path().join("greek.pdf"), &["Athena sprang from the head of Zeus."]);
        write_pdf(&dir.path().join("scanned.pdf"), &["", ""]);

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "greek.pdf");
        assert_eq!(
            non_empty_lines(&docs[0].text),
            vec!["Athena sprang from the head of Zeus."]
        );
    }

    #[test]
    fn test_unreadable_pdf() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.pdf"), "%PDF-1.4 truncated").unwrap();

        let err = load_documents(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Document(ref msg) if msg.contains("broken.pdf")));
    }

    #[test]
    fn test_load_documents_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b_sparta.txt"), "Sparta text").unwrap();
        fs::write(dir.path().join("a_athens.md"), "Athens *text*").unwrap();
        fs::write(dir.path().join("c_blank.txt"), "   \n").unwrap();
        fs::write(dir.path().join("d_notes.docx"), "PK\x03\x04").unwrap();
        fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(
            docs,
            vec![
                SourceDocument::new("a_athens.md", "Athens text"),
                SourceDocument::new("b_sparta.txt", "Sparta text"),
            ]
        );
    }

    #[test]
    fn test_load_documents_missing_dir() {
        let dir = tempdir().unwrap();
        let err = load_documents(&dir.path().join("data")).unwrap_err();
        assert!(matches!(err, Error::Document(_)));
    }
}
