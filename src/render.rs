//! Paginator/Renderer: plain text -> paginated PDF or DOCX bytes.
//!
//! Layout is deliberately simple: fixed A4-ish page, single font and size,
//! greedy word wrap against a character budget rather than glyph metrics.
//! That approximation is part of the contract, not an oversight.

use crate::error::{PipelineError, Result};
use crate::script::ExportFormat;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 40;
const FONT_SIZE: i64 = 12;
const LINE_GAP: i64 = 6;
pub const MAX_LINE_CHARS: usize = 100;

/// Render a plain text block into the requested format.
pub fn render(text: &str, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Pdf => render_pdf(text),
        ExportFormat::Docx => render_docx(text),
    }
}

/// Split on blank lines. Within a paragraph, line breaks survive as soft
/// breaks; runs of blank lines collapse into a single boundary.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line.trim_end_matches('\r'));
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

/// Greedy word fill up to `max_chars`. A single word longer than the budget
/// is emitted on its own line rather than broken mid-word.
pub fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(crate) struct LaidLine {
    pub y: i64,
    pub text: String,
}

pub(crate) struct PageOfLines {
    pub lines: Vec<LaidLine>,
}

/// Flow wrapped lines down the page with a vertical cursor; when the next
/// line would cross the bottom margin, start a fresh page.
pub(crate) fn layout_pages(text: &str) -> Vec<PageOfLines> {
    let top = PAGE_HEIGHT - MARGIN;
    let mut pages = Vec::new();
    let mut current = PageOfLines { lines: Vec::new() };
    let mut y = top;

    for para in split_paragraphs(text) {
        for source_line in para.lines() {
            for line in wrap_line(source_line, MAX_LINE_CHARS) {
                if y - FONT_SIZE < MARGIN {
                    pages.push(std::mem::replace(&mut current, PageOfLines { lines: Vec::new() }));
                    y = top;
                }
                current.lines.push(LaidLine {
                    y: y - FONT_SIZE,
                    text: line,
                });
                y -= FONT_SIZE + LINE_GAP;
            }
        }
        // Paragraph spacing; the overflow check at the next line push
        // handles the page turn.
        y -= FONT_SIZE;
    }

    pages.push(current);
    pages
}

fn pdf_err(e: impl std::error::Error + Send + Sync + 'static) -> PipelineError {
    PipelineError::Io(std::io::Error::other(e))
}

fn render_pdf(text: &str) -> Result<Vec<u8>> {
    let pages = layout_pages(text);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in &pages {
        let mut operations = Vec::new();
        for line in &page.lines {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
            operations.push(Operation::new("Td", vec![MARGIN.into(), line.y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.text.as_str())],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id =
            doc.add_object(Stream::new(dictionary! {}, content.encode().map_err(pdf_err)?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(pdf_err)?;
    Ok(buf)
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

/// One `<w:p>` per source paragraph; soft line breaks become `<w:br/>`
/// runs inside the paragraph.
fn document_xml(text: &str) -> String {
    let mut body = String::new();
    for para in split_paragraphs(text) {
        body.push_str("<w:p>");
        let lines: Vec<&str> = para.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                body.push_str("<w:r><w:br/></w:r>");
            }
            body.push_str("<w:r><w:t xml:space=\"preserve\">");
            body.push_str(&quick_xml::escape::escape(*line));
            body.push_str("</w:t></w:r>");
        }
        body.push_str("</w:p>");
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}</w:body></w:document>",
        body
    )
}

fn render_docx(text: &str) -> Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer
        .start_file("[Content_Types].xml", options)
        .map_err(pdf_err)?;
    writer.write_all(CONTENT_TYPES_XML.as_bytes())?;

    writer.start_file("_rels/.rels", options).map_err(pdf_err)?;
    writer.write_all(RELS_XML.as_bytes())?;

    writer
        .start_file("word/document.xml", options)
        .map_err(pdf_err)?;
    writer.write_all(document_xml(text).as_bytes())?;

    let cursor = writer.finish().map_err(pdf_err)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_text;

    #[test]
    fn test_split_paragraphs_blank_line_rule() {
        let text = "First line\nstill first.\n\nSecond.\n\n\n\nThird.";
        let paras = split_paragraphs(text);
        assert_eq!(paras.len(), 3);
        assert_eq!(paras[0], "First line\nstill first.");
        assert_eq!(paras[2], "Third.");
    }

    #[test]
    fn test_wrap_respects_budget() {
        let line = "word ".repeat(60);
        for wrapped in wrap_line(&line, 30) {
            assert!(wrapped.len() <= 30, "line too long: {:?}", wrapped);
        }
    }

    #[test]
    fn test_wrap_keeps_words_intact() {
        let wrapped = wrap_line("alpha beta gamma", 11);
        assert_eq!(wrapped, vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn test_layout_produces_at_least_one_page() {
        let pages = layout_pages("Hello.");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines.len(), 1);
    }

    #[test]
    fn test_layout_paginates_long_text() {
        let text = vec!["A paragraph."; 200].join("\n\n");
        let pages = layout_pages(&text);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(!page.lines.is_empty());
            for line in &page.lines {
                assert!(line.y >= MARGIN);
                assert!(line.y <= PAGE_HEIGHT - MARGIN);
            }
        }
    }

    #[test]
    fn test_pdf_short_story_is_one_page_two_paragraphs() {
        let text = "Once upon a time.\n\nThe end.";
        assert_eq!(split_paragraphs(text).len(), 2);

        let bytes = render(text, ExportFormat::Pdf).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_pdf_long_text_spans_pages() {
        let text = vec!["Line after line of story."; 400].join("\n\n");
        let bytes = render(text.as_str(), ExportFormat::Pdf).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn test_docx_round_trip_preserves_paragraph_count() {
        let text = "Once upon a time.\nShe said: hello.\n\nThe end.";
        let bytes = render(text, ExportFormat::Docx).unwrap();

        let extracted = extract_text(&bytes, ExportFormat::Docx).unwrap();
        assert_eq!(
            split_paragraphs(&extracted).len(),
            split_paragraphs(text).len()
        );
        // Soft break inside the first paragraph survives as a line break.
        assert!(extracted.contains("Once upon a time.\nShe said: hello."));
    }

    #[test]
    fn test_docx_escapes_markup() {
        let text = "Tom & Mira <3";
        let bytes = render(text, ExportFormat::Docx).unwrap();
        let extracted = extract_text(&bytes, ExportFormat::Docx).unwrap();
        assert_eq!(extracted, "Tom & Mira <3");
    }
}
