//! Text extraction: uploaded PDF/DOCX binary -> flat UTF-8 text.
//!
//! Extraction is all-or-nothing: any parse failure surfaces before a script
//! record is created, so `raw_text` can never be half-written. Structure
//! and formatting are deliberately dropped; only the text stream survives.

use crate::error::{PipelineError, Result};
use crate::script::ExportFormat;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

/// Extract plain text from a document buffer in the declared format.
pub fn extract_text(bytes: &[u8], format: ExportFormat) -> Result<String> {
    if bytes.is_empty() {
        return Err(PipelineError::ExtractionFailed("empty upload".into()));
    }
    match format {
        ExportFormat::Pdf => extract_pdf(bytes),
        ExportFormat::Docx => extract_docx(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| PipelineError::ExtractionFailed(format!("pdf parse error: {}", e)))
}

/// A DOCX is a zip archive; the narrative lives in `word/document.xml`.
fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::ExtractionFailed(format!("not a docx archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| PipelineError::ExtractionFailed(format!("missing document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| PipelineError::ExtractionFailed(format!("unreadable document.xml: {}", e)))?;

    document_xml_to_text(&xml)
}

/// Walk the WordprocessingML event stream: text nodes inside `<w:t>` are
/// kept, `<w:br/>` becomes a soft line break, paragraph ends become blank
/// lines. Everything else is dropped.
fn document_xml_to_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_text = true;
                }
            }
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:br" => out.push('\n'),
                b"w:tab" => out.push('\t'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let raw = String::from_utf8_lossy(&t);
                let text = quick_xml::escape::unescape(raw.as_ref()).map_err(|e| {
                    PipelineError::ExtractionFailed(format!("bad xml entity: {}", e))
                })?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::ExtractionFailed(format!(
                    "malformed document.xml: {}",
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(out.trim().to_string())
}
