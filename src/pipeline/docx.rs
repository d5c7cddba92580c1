//! DOCX paragraph extraction.
//!
//! A DOCX file is a ZIP archive of WordprocessingML parts. Only the main
//! document part matters here; it is located through the package
//! relationships (`_rels/.rels`, type `.../officeDocument`) and falls back to
//! `word/document.xml`.
//!
//! Paragraph semantics:
//! - only paragraphs that are direct children of `w:body` count; paragraphs
//!   inside tables, content controls and text boxes are skipped
//! - paragraph text is the concatenation of its `w:t` runs, including runs
//!   nested in hyperlinks and smart tags
//! - inside a run, `w:tab` / `w:ptab` become `\t`, `w:cr` and line-wrapping
//!   `w:br` become `\n`, `w:noBreakHyphen` becomes `-`; page and column
//!   breaks add nothing
//! - empty paragraphs are kept as `""`

use crate::error::ConvertError;
use crate::pipeline::input::resolve_source;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

const PACKAGE_RELS: &str = "_rels/.rels";
const DEFAULT_MAIN_PART: &str = "word/document.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

/// A parsed source document: its top-level paragraphs, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    paragraphs: Vec<String>,
}

impl Document {
    /// Open and parse the `.docx` file at `path`.
    pub fn open(path: &Path) -> Result<Self, ConvertError> {
        let path = resolve_source(path)?;
        let file = std::fs::File::open(&path)
            .map_err(|e| ConvertError::source_read(&path, e.to_string()))?;
        Self::from_reader(std::io::BufReader::new(file))
            .map_err(|detail| ConvertError::source_read(&path, detail))
    }

    /// Parse a DOCX package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, String> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| format!("not a valid .docx archive: {e}"))?;

        let main_part = read_part(&mut archive, PACKAGE_RELS)
            .ok()
            .and_then(|rels| main_part_name(&rels))
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());
        debug!("Main document part: {}", main_part);

        let xml = read_part(&mut archive, &main_part)?;
        let doc = Self::from_document_xml(&xml)?;
        debug!("Extracted {} paragraphs", doc.len());
        Ok(doc)
    }

    /// Parse the XML of a main document part.
    pub fn from_document_xml(xml: &str) -> Result<Self, String> {
        Ok(Self {
            paragraphs: extract_paragraphs(xml)?,
        })
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, String> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| format!("missing part '{name}': {e}"))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| format!("cannot read part '{name}': {e}"))?;
    Ok(xml)
}

/// Find the officeDocument target in the package relationships.
fn main_part_name(rels_xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(rels_xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let is_main = get_attr(&e, b"Type")
                    .is_some_and(|t| t.ends_with(OFFICE_DOCUMENT_REL));
                if is_main {
                    return get_attr(&e, b"Target")
                        .map(|t| t.trim_start_matches('/').to_string());
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Extract an attribute value by key from an element
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(Result::ok)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn extract_paragraphs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    // local names of the open elements, outermost first
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<String> = None;
    let mut paragraphs = Vec::new();
    let mut saw_body = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("malformed document XML at byte {}: {e}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"body" {
                    saw_body = true;
                }
                if name == b"p" && parent_is(&stack, b"body") {
                    current = Some(String::new());
                }
                stack.push(name);
            }
            Event::End(e) => {
                stack.pop();
                if e.local_name().as_ref() == b"p" && parent_is(&stack, b"body") {
                    if let Some(text) = current.take() {
                        paragraphs.push(text);
                    }
                }
            }
            Event::Empty(e) => {
                let name = e.local_name();
                let name = name.as_ref();
                if name == b"p" && parent_is(&stack, b"body") {
                    paragraphs.push(String::new());
                } else if let Some(text) = current.as_mut() {
                    if parent_is(&stack, b"r") && !in_text_box(&stack) {
                        match name {
                            b"tab" | b"ptab" => text.push('\t'),
                            b"cr" => text.push('\n'),
                            // page and column breaks carry no text
                            b"br" if is_line_break(&e) => text.push('\n'),
                            b"noBreakHyphen" => text.push('-'),
                            _ => {}
                        }
                    }
                }
            }
            Event::Text(t) => {
                if let Some(text) = current.as_mut() {
                    if parent_is(&stack, b"t") && !in_text_box(&stack) {
                        let s = t
                            .unescape()
                            .map_err(|e| format!("bad text in document XML: {e}"))?;
                        text.push_str(&s);
                    }
                }
            }
            Event::CData(c) => {
                if let Some(text) = current.as_mut() {
                    if parent_is(&stack, b"t") && !in_text_box(&stack) {
                        text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_body {
        return Err("document part has no w:body element".to_string());
    }
    Ok(paragraphs)
}

/// `w:br` without a type, or with `w:type="textWrapping"`.
fn is_line_break(e: &BytesStart) -> bool {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"type")
        .map_or(true, |a| a.value.as_ref() == b"textWrapping")
}

fn parent_is(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.last().is_some_and(|n| n.as_slice() == name)
}

fn in_text_box(stack: &[Vec<u8>]) -> bool {
    stack.iter().any(|n| n.as_slice() == b"txbxContent")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
        )
    }

    fn para(text: &str) -> String {
        format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_paragraphs_in_order() {
        let xml = wrap(&format!("{}{}", para("Hello"), para("World")));
        let doc = Document::from_document_xml(&xml).unwrap();
        assert_eq!(doc.paragraphs(), &["Hello".to_string(), "World".to_string()]);
    }

    #[test]
    fn joins_runs_and_keeps_whitespace() {
        let xml = wrap(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t xml:space="preserve">Hello, </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r><w:r><w:tab/><w:t>x</w:t><w:br/><w:t>y</w:t></w:r></w:p>"#,
        );
        let doc = Document::from_document_xml(&xml).unwrap();
        assert_eq!(doc.paragraphs(), &["Hello, bold\tx\ny".to_string()]);
    }

    #[test]
    fn break_types_follow_run_text_rules() {
        let xml = wrap(
            r#"<w:p><w:r><w:t>a</w:t><w:br w:type="page"/><w:t>b</w:t><w:br w:type="column"/><w:t>c</w:t><w:br w:type="textWrapping"/><w:t>d</w:t><w:noBreakHyphen/><w:t>e</w:t><w:ptab w:relativeTo="margin" w:alignment="right" w:leader="none"/><w:t>f</w:t><w:cr/><w:t>g</w:t></w:r></w:p>"#,
        );
        let doc = Document::from_document_xml(&xml).unwrap();
        assert_eq!(doc.paragraphs(), &["abc\nd-e\tf\ng"]);
    }

    #[test]
    fn keeps_empty_paragraphs() {
        let xml = wrap(&format!("{}<w:p/><w:p><w:pPr/></w:p>{}", para("a"), para("b")));
        let doc = Document::from_document_xml(&xml).unwrap();
        assert_eq!(doc.paragraphs(), &["a", "", "", "b"]);
    }

    #[test]
    fn skips_table_and_text_box_paragraphs() {
        let xml = wrap(&format!(
            r#"{}<w:tbl><w:tr><w:tc>{}</w:tc></w:tr></w:tbl><w:p><w:r><w:t>outer</w:t></w:r><w:r><w:drawing><wps:txbx xmlns:wps="x"><w:txbxContent>{}</w:txbxContent></wps:txbx></w:drawing></w:r></w:p>"#,
            para("before"),
            para("in cell"),
            para("in box"),
        ));
        let doc = Document::from_document_xml(&xml).unwrap();
        assert_eq!(doc.paragraphs(), &["before", "outer"]);
    }

    #[test]
    fn includes_hyperlink_text_and_skips_deleted_text() {
        let xml = wrap(
            r#"<w:p><w:r><w:t>see </w:t></w:r><w:hyperlink><w:r><w:t>docs</w:t></w:r></w:hyperlink><w:del><w:r><w:delText>gone</w:delText></w:r></w:del></w:p>"#,
        );
        let doc = Document::from_document_xml(&xml).unwrap();
        assert_eq!(doc.paragraphs(), &["see docs"]);
    }

    #[test]
    fn unescapes_entities() {
        let xml = wrap(&para("Fish &amp; Chips &lt;3 &#x263A;"));
        let doc = Document::from_document_xml(&xml).unwrap();
        assert_eq!(doc.paragraphs(), &["Fish & Chips <3 \u{263A}"]);
    }

    #[test]
    fn empty_body() {
        let doc = Document::from_document_xml(&wrap("")).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn missing_body_is_an_error() {
        let err = Document::from_document_xml("<root/>").unwrap_err();
        assert!(err.contains("w:body"));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(Document::from_document_xml("<w:document><w:body><w:p></w:body>").is_err());
    }

    #[test]
    fn reads_package_with_default_main_part() {
        let bytes = package(&[("word/document.xml", &wrap(&para("only")))]);
        let doc = Document::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(doc.paragraphs(), &["only"]);
    }

    #[test]
    fn follows_office_document_relationship() {
        let rels = r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="/custom/main.xml"/></Relationships>"#;
        let bytes = package(&[
            ("_rels/.rels", rels),
            ("custom/main.xml", &wrap(&para("relocated"))),
        ]);
        let doc = Document::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(doc.paragraphs(), &["relocated"]);
    }

    #[test]
    fn missing_main_part_is_an_error() {
        let bytes = package(&[("word/styles.xml", "<w:styles/>")]);
        let err = Document::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(err.contains("word/document.xml"));
    }

    #[test]
    fn non_zip_is_an_error() {
        let err = Document::from_reader(Cursor::new(b"plain text".to_vec())).unwrap_err();
        assert!(err.contains("not a valid .docx archive"));
    }

    #[test]
    fn open_reports_path_on_failure() {
        let err = Document::open(Path::new("/nope/report.docx")).unwrap_err();
        assert!(err.to_string().contains("/nope/report.docx"));
    }
}
