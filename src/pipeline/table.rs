//! Single-column tabular output: CSV and XLSX.
//!
//! Both formats hold the same table: a header cell (the configured column
//! name, `Content` by default) followed by one row per paragraph, in
//! document order. No index column is written.
//!
//! XLSX is produced directly as a SpreadsheetML package (a ZIP of XML
//! parts) with one worksheet and a shared-strings table. That is the whole
//! surface needed here, so there is no workbook model in between.

use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::pipeline::docx::Document;
use crate::pipeline::output::Staging;
use crate::request::ConversionRequest;
use quick_xml::escape::escape;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Rows per worksheet in XLSX, header included.
pub const XLSX_MAX_ROWS: usize = 1_048_576;

/// Characters a single XLSX cell can hold.
pub const XLSX_MAX_CELL_CHARS: usize = 32_767;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

/// Read the source document and publish it as CSV beside it.
///
/// Blocking; the worker runs this on the blocking pool.
pub fn convert_to_csv(request: &ConversionRequest, config: &ConverterConfig) -> Result<PathBuf, ConvertError> {
    let doc = Document::open(request.source_path())?;
    let staging = Staging::for_destination(&request.output_path())?;
    let staged = write_csv(&staging, &config.column_name, doc.paragraphs())?;
    staging.publish(&staged)
}

/// Read the source document and publish it as a one-sheet XLSX workbook.
pub fn convert_to_xlsx(request: &ConversionRequest, config: &ConverterConfig) -> Result<PathBuf, ConvertError> {
    let doc = Document::open(request.source_path())?;
    let staging = Staging::for_destination(&request.output_path())?;
    let staged = write_xlsx(&staging, &config.sheet_name, &config.column_name, doc.paragraphs())?;
    staging.publish(&staged)
}

/// Write the paragraphs as CSV into the staging directory.
///
/// Returns the staged file path; the caller publishes it.
pub fn write_csv(staging: &Staging, column: &str, paragraphs: &[String]) -> Result<PathBuf, ConvertError> {
    let staged = staging.staged_output();
    let to_write_err = |e: csv::Error| {
        ConvertError::write(staging.destination(), std::io::Error::other(e.to_string()))
    };

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(&staged)
        .map_err(to_write_err)?;

    writer.write_record([column]).map_err(to_write_err)?;
    for para in paragraphs {
        writer.write_record([para.as_str()]).map_err(to_write_err)?;
    }
    writer
        .flush()
        .map_err(|e| ConvertError::write(staging.destination(), e))?;

    debug!("Wrote {} CSV rows to {}", paragraphs.len(), staged.display());
    Ok(staged)
}

/// Write the paragraphs as a single-sheet XLSX workbook into the staging
/// directory.
pub fn write_xlsx(
    staging: &Staging,
    sheet_name: &str,
    column: &str,
    paragraphs: &[String],
) -> Result<PathBuf, ConvertError> {
    let rows = paragraphs.len() + 1;
    if rows > XLSX_MAX_ROWS {
        return Err(limit_exceeded(
            staging,
            format!(
                "{} paragraphs exceed the worksheet limit of {} rows",
                paragraphs.len(),
                XLSX_MAX_ROWS - 1
            ),
        ));
    }

    let mut strings = SharedStrings::default();
    let mut sheet = String::with_capacity(rows * 48 + 256);
    sheet.push_str(XML_DECL);
    sheet.push_str(&format!(
        "<worksheet xmlns=\"{NS_MAIN}\"><dimension ref=\"A1:A{rows}\"/><sheetData>"
    ));
    push_row(&mut sheet, 1, strings.index(cell_text(column)), true);
    for (i, para) in paragraphs.iter().enumerate() {
        let text = cell_text(para);
        let chars = text.chars().count();
        if chars > XLSX_MAX_CELL_CHARS {
            return Err(limit_exceeded(
                staging,
                format!(
                    "paragraph {} has {} characters, over the XLSX cell limit of {}",
                    i + 1,
                    chars,
                    XLSX_MAX_CELL_CHARS
                ),
            ));
        }
        push_row(&mut sheet, i + 2, strings.index(text), false);
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts: [(&str, String); 7] = [
        ("[Content_Types].xml", content_types()),
        ("_rels/.rels", package_rels()),
        ("xl/workbook.xml", workbook(sheet_name)),
        ("xl/_rels/workbook.xml.rels", workbook_rels()),
        ("xl/styles.xml", styles()),
        ("xl/sharedStrings.xml", strings.into_xml()),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let staged = staging.staged_output();
    let write_err = |e: std::io::Error| ConvertError::write(staging.destination(), e);
    let zip_err = |e: zip::result::ZipError| {
        ConvertError::write(staging.destination(), std::io::Error::other(e.to_string()))
    };

    let file = std::fs::File::create(&staged).map_err(write_err)?;
    let mut zip = ZipWriter::new(file);
    for (name, body) in &parts {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(*name, options).map_err(zip_err)?;
        zip.write_all(body.as_bytes()).map_err(write_err)?;
    }
    let file = zip.finish().map_err(zip_err)?;
    file.sync_all().map_err(write_err)?;

    debug!("Wrote {} XLSX rows to {}", paragraphs.len(), staged.display());
    Ok(staged)
}

fn limit_exceeded(staging: &Staging, detail: String) -> ConvertError {
    ConvertError::write(
        staging.destination(),
        std::io::Error::new(std::io::ErrorKind::InvalidInput, detail),
    )
}

fn push_row(sheet: &mut String, row: usize, string_index: usize, header: bool) {
    let style = if header { " s=\"1\"" } else { "" };
    sheet.push_str(&format!(
        "<row r=\"{row}\"><c r=\"A{row}\" t=\"s\"{style}><v>{string_index}</v></c></row>"
    ));
}

/// Deduplicated shared-strings table, in first-seen order.
#[derive(Default)]
struct SharedStrings {
    order: Vec<String>,
    lookup: HashMap<String, usize>,
    refs: usize,
}

impl SharedStrings {
    fn index(&mut self, text: String) -> usize {
        self.refs += 1;
        if let Some(&i) = self.lookup.get(&text) {
            return i;
        }
        let i = self.order.len();
        self.lookup.insert(text.clone(), i);
        self.order.push(text);
        i
    }

    fn into_xml(self) -> String {
        let mut xml = String::with_capacity(self.order.iter().map(|s| s.len() + 48).sum::<usize>() + 160);
        xml.push_str(XML_DECL);
        xml.push_str(&format!(
            "<sst xmlns=\"{NS_MAIN}\" count=\"{}\" uniqueCount=\"{}\">",
            self.refs,
            self.order.len()
        ));
        for s in &self.order {
            xml.push_str("<si><t xml:space=\"preserve\">");
            xml.push_str(&escape(s.as_str()));
            xml.push_str("</t></si>");
        }
        xml.push_str("</sst>");
        xml
    }
}

/// Drop characters XML 1.0 cannot carry.
fn cell_text(text: &str) -> String {
    text.chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}'))
        .collect()
}

fn content_types() -> String {
    format!(
        "{XML_DECL}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
<Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\
<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>\
<Override PartName=\"/xl/sharedStrings.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml\"/>\
</Types>"
    )
}

fn package_rels() -> String {
    format!(
        "{XML_DECL}<Relationships xmlns=\"{NS_PKG_REL}\">\
<Relationship Id=\"rId1\" Type=\"{NS_REL}/officeDocument\" Target=\"xl/workbook.xml\"/>\
</Relationships>"
    )
}

fn workbook(sheet_name: &str) -> String {
    format!(
        "{XML_DECL}<workbook xmlns=\"{NS_MAIN}\" xmlns:r=\"{NS_REL}\"><sheets>\
<sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>",
        escape(sheet_name)
    )
}

fn workbook_rels() -> String {
    format!(
        "{XML_DECL}<Relationships xmlns=\"{NS_PKG_REL}\">\
<Relationship Id=\"rId1\" Type=\"{NS_REL}/worksheet\" Target=\"worksheets/sheet1.xml\"/>\
<Relationship Id=\"rId2\" Type=\"{NS_REL}/styles\" Target=\"styles.xml\"/>\
<Relationship Id=\"rId3\" Type=\"{NS_REL}/sharedStrings\" Target=\"sharedStrings.xml\"/>\
</Relationships>"
    )
}

// font 1 is bold; xf 1 applies it to the header cell
fn styles() -> String {
    format!(
        "{XML_DECL}<styleSheet xmlns=\"{NS_MAIN}\">\
<fonts count=\"2\"><font><sz val=\"11\"/><name val=\"Calibri\"/></font>\
<font><b/><sz val=\"11\"/><name val=\"Calibri\"/></font></fonts>\
<fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill><fill><patternFill patternType=\"gray125\"/></fill></fills>\
<borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>\
<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>\
<cellXfs count=\"2\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>\
<xf numFmtId=\"0\" fontId=\"1\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyFont=\"1\"/></cellXfs>\
<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>\
</styleSheet>"
    )
}
