//! DOCX reading and packet writing over the raw OOXML package.
//!
//! OOXML has no intrinsic page objects, so pages are delimited by the two
//! markers Word leaves in `word/document.xml`: explicit page breaks
//! (`<w:br w:type="page"/>`) and rendered break hints
//! (`<w:lastRenderedPageBreak/>`). Granularity is the paragraph: a block
//! belongs to the page it starts on. Each block's verbatim XML is retained
//! so packet assembly copies formatting untouched instead of re-rendering.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// One extracted page: text for the heuristics, raw XML for copying.
#[derive(Debug, Clone, Default)]
pub struct DocxPage {
    /// Verbatim XML of each body-level block (`w:p`, `w:tbl`) on the page.
    pub blocks: Vec<String>,
    /// Extracted text, one line per paragraph.
    pub text: String,
}

/// A parsed DOCX source kept alive for page copying.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    pages: Vec<DocxPage>,
    styles: Option<Vec<u8>>,
}

impl DocxPackage {
    /// Opens and parses a .docx file, splitting the body into pages.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let document_xml = read_entry(&mut archive, "word/document.xml")?
            .ok_or_else(|| Error::Docx("package has no word/document.xml".into()))?;
        let styles = read_entry(&mut archive, "word/styles.xml")?;

        let pages = split_into_pages(&document_xml)?;
        Ok(Self { pages, styles })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_text(&self, index: usize) -> &str {
        self.pages.get(index).map(|p| p.text.as_str()).unwrap_or("")
    }

    pub fn page(&self, index: usize) -> Option<&DocxPage> {
        self.pages.get(index)
    }

    pub fn styles(&self) -> Option<&[u8]> {
        self.styles.as_deref()
    }
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf)?;
            Ok(Some(buf))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Streaming state for one body-level block.
#[derive(Default)]
struct BlockState {
    xml_start: usize,
    lines: Vec<String>,
    current_line: String,
    /// Page break seen before any text of the block: block opens the page.
    break_before: bool,
    /// Page break seen after text: the break takes effect after the block.
    break_after: bool,
    has_text: bool,
}

/// Splits `word/document.xml` into pages of verbatim body blocks.
fn split_into_pages(xml: &[u8]) -> Result<Vec<DocxPage>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);

    let mut pages: Vec<DocxPage> = Vec::new();
    let mut current = DocxPage::default();

    let mut in_body = false;
    let mut depth_in_block = 0usize;
    // Depth inside a non-captured body child such as w:sectPr.
    let mut skip_depth = 0usize;
    let mut block: Option<BlockState> = None;
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        let pos_before = reader.buffer_position() as usize;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::Docx(format!("malformed document.xml: {e}")))?;
        match event {
            XmlEvent::Start(ref e) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());
                if !in_body {
                    if name == b"body" {
                        in_body = true;
                    }
                } else if skip_depth > 0 {
                    skip_depth += 1;
                } else if block.is_none() {
                    if name == b"sectPr" {
                        skip_depth = 1;
                    } else {
                        block = Some(BlockState {
                            xml_start: pos_before,
                            ..BlockState::default()
                        });
                        depth_in_block = 1;
                    }
                } else {
                    depth_in_block += 1;
                    match name {
                        b"t" => in_text_run = true,
                        b"br" if is_page_break(e) => note_break(block.as_mut()),
                        b"lastRenderedPageBreak" => note_break(block.as_mut()),
                        b"p" => {
                            // Nested paragraph (table cell): new text line.
                            if let Some(state) = block.as_mut() {
                                state.flush_line();
                            }
                        }
                        _ => {}
                    }
                }
            }
            XmlEvent::Empty(ref e) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());
                if in_body && block.is_some() {
                    match name {
                        b"br" if is_page_break(e) => note_break(block.as_mut()),
                        b"lastRenderedPageBreak" => note_break(block.as_mut()),
                        _ => {}
                    }
                }
                // A self-closing body-level block carries no text or breaks;
                // nothing to capture.
            }
            XmlEvent::Text(ref t) => {
                if in_text_run {
                    if let Some(state) = block.as_mut() {
                        let text = t
                            .unescape()
                            .map_err(|e| Error::Docx(format!("bad text node: {e}")))?;
                        state.current_line.push_str(&text);
                        state.has_text = true;
                    }
                }
            }
            XmlEvent::End(ref e) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());
                if name == b"t" {
                    in_text_run = false;
                }
                if in_body {
                    if skip_depth > 0 {
                        skip_depth -= 1;
                    } else if block.is_some() {
                        depth_in_block -= 1;
                        if depth_in_block == 0 {
                            let xml_end = reader.buffer_position() as usize;
                            let mut state = block.take().expect("block state present");
                            state.flush_line();
                            let slice =
                                String::from_utf8_lossy(&xml[state.xml_start..xml_end]).into_owned();
                            place_block(&mut pages, &mut current, state, slice);
                        }
                    } else if name == b"body" {
                        in_body = false;
                    }
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !current.blocks.is_empty() || pages.is_empty() {
        finish_page(&mut pages, current);
    }
    Ok(pages)
}

fn note_break(block: Option<&mut BlockState>) {
    if let Some(state) = block {
        if state.has_text {
            state.break_after = true;
        } else {
            state.break_before = true;
        }
    }
}

impl BlockState {
    fn flush_line(&mut self) {
        if !self.current_line.trim().is_empty() {
            self.lines.push(std::mem::take(&mut self.current_line));
        } else {
            self.current_line.clear();
        }
    }
}

fn place_block(
    pages: &mut Vec<DocxPage>,
    current: &mut DocxPage,
    state: BlockState,
    xml: String,
) {
    if state.break_before && !current.blocks.is_empty() {
        finish_page(pages, std::mem::take(current));
    }
    for line in &state.lines {
        if !current.text.is_empty() {
            current.text.push('\n');
        }
        current.text.push_str(line);
    }
    current.blocks.push(xml);
    if state.break_after {
        finish_page(pages, std::mem::take(current));
    }
}

fn finish_page(pages: &mut Vec<DocxPage>, page: DocxPage) {
    pages.push(page);
}

fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().rposition(|&b| b == b':') {
        Some(idx) => &qname[idx + 1..],
        None => qname,
    }
}

fn is_page_break(e: &quick_xml::events::BytesStart<'_>) -> bool {
    e.attributes().flatten().any(|attr| {
        local_name(attr.key.as_ref()) == b"type" && attr.value.as_ref() == b"page"
    })
}

// ---------------------------------------------------------------------------
// Packet writing
// ---------------------------------------------------------------------------

const CONTENT_TYPES_WITH_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const CONTENT_TYPES_BARE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_WITH_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const DOCUMENT_RELS_BARE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

const DOCUMENT_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml" xmlns:w15="http://schemas.microsoft.com/office/word/2012/wordml" mc:Ignorable="w14 w15"><w:body>"#;

const DOCUMENT_FOOTER: &str =
    r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#;

const PAGE_BREAK_PARAGRAPH: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

/// Assembles a new DOCX whose pages are verbatim copies of the given source
/// pages, in order, separated by explicit page breaks. `styles.xml` is
/// carried from the first source that has one.
pub fn write_page_document<W: Write + std::io::Seek>(
    writer: W,
    pages: &[&DocxPage],
    styles: Option<&[u8]>,
) -> Result<()> {
    let mut document = String::from(DOCUMENT_HEADER);
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            document.push_str(PAGE_BREAK_PARAGRAPH);
        }
        for block in &page.blocks {
            document.push_str(block);
        }
    }
    document.push_str(DOCUMENT_FOOTER);

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(if styles.is_some() {
        CONTENT_TYPES_WITH_STYLES.as_bytes()
    } else {
        CONTENT_TYPES_BARE.as_bytes()
    })?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS.as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", options)?;
    zip.write_all(if styles.is_some() {
        DOCUMENT_RELS_WITH_STYLES.as_bytes()
    } else {
        DOCUMENT_RELS_BARE.as_bytes()
    })?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(document.as_bytes())?;

    if let Some(styles) = styles {
        zip.start_file("word/styles.xml", options)?;
        zip.write_all(styles)?;
    }

    zip.finish()?;
    Ok(())
}

/// In-memory assembly convenience used by tests and atomic writers.
pub fn page_document_bytes(pages: &[&DocxPage], styles: Option<&[u8]>) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_page_document(&mut cursor, pages, styles)?;
    Ok(cursor.into_inner())
}
