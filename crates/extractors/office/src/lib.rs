use std::io::{Cursor, Read};

use quick_xml::events::Event;
use recipe_common::error::ExtractError;

/// Extract the body text of a DOCX document.
///
/// Paragraphs of `word/document.xml` are returned separated by a blank line;
/// blank paragraphs are dropped. Within a paragraph `<w:tab/>` becomes a tab
/// and `<w:br/>` a newline, which keeps ingredient tables and hand-broken
/// lines readable.
pub fn extract_docx_from_bytes(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Failed(format!("not a DOCX archive: {e}")))?;

    let xml = {
        let mut entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Failed(format!("word/document.xml: {e}")))?;
        let mut s = String::new();
        entry
            .read_to_string(&mut s)
            .map_err(|e| ExtractError::Failed(format!("reading word/document.xml: {e}")))?;
        s
    };

    Ok(parse_docx_paragraphs(&xml)?.join("\n\n"))
}

/// Collect non-empty paragraphs from word/document.xml.
fn parse_docx_paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current_para = String::new();
    let mut in_t = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:t" => in_t = true,
                b"w:p" => current_para.clear(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => current_para.push('\t'),
                b"w:br" | b"w:cr" => current_para.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_t = false,
                b"w:p" => {
                    let text = current_para.trim().to_string();
                    if !text.is_empty() {
                        paragraphs.push(text);
                    }
                    current_para.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_t {
                    if let Ok(text) = e.unescape() {
                        current_para.push_str(&text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::Failed(format!(
                    "malformed word/document.xml at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs)
}
