//! PDF loading, per-page text extraction, page-graph copying, and
//! permission-restriction removal, all through lopdf.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Error, Result};

/// Page attributes that may be inherited from ancestor Pages nodes and must
/// be materialized onto a page before it is detached from its document.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Passwords tried against a permission-restricted document, in order.
/// Counter-signing services almost always leave the user password empty.
pub const UNLOCK_PASSWORDS: [&str; 4] = ["", "docusign", "1234", "password"];

/// Loads a PDF, surfacing parse failures as a document-local error so the
/// caller can skip the file and continue the run.
pub fn load(path: &Path) -> Result<Document> {
    Document::load(path).map_err(|e| Error::unreadable(path, e))
}

pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

/// Extracts the visible text of every page, in page order. A page whose
/// content cannot be decoded yields an empty string (an un-OCR'd scan is
/// expected input, not an error); nothing is truncated.
pub fn extract_pages_text(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .iter()
        .map(|(number, &page_id)| {
            extract_page_text(doc, page_id).unwrap_or_else(|err| {
                debug!("no text for page {number}: {err}");
                String::new()
            })
        })
        .collect()
}

/// Walks one page's content stream and rebuilds its text with `\n` line
/// breaks: text-showing operators append decoded strings, line-motion
/// operators and text-object ends break lines.
fn extract_page_text(doc: &Document, page_id: ObjectId) -> Result<String> {
    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();
    let content_data = doc.get_page_content(page_id)?;
    let content = Content::decode(&content_data)?;

    let mut out = String::new();
    let mut current_font = String::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "Tf" => {
                if let Some(Ok(name)) = op.operands.first().map(|o| o.as_name()) {
                    current_font = String::from_utf8_lossy(name).into_owned();
                }
            }
            "Td" | "TD" | "T*" | "ET" => push_line_break(&mut out),
            "Tj" => {
                if let Some(operand) = op.operands.first() {
                    push_decoded(&mut out, operand, doc, &fonts, &current_font);
                }
            }
            "'" | "\"" => {
                push_line_break(&mut out);
                if let Some(operand) = op.operands.last() {
                    push_decoded(&mut out, operand, doc, &fonts, &current_font);
                }
            }
            "TJ" => {
                if let Some(Ok(array)) = op.operands.first().map(|o| o.as_array()) {
                    for item in array {
                        push_decoded(&mut out, item, doc, &fonts, &current_font);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

fn push_line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Decodes a text operand using the current font's encoding, falling back
/// to UTF-16BE (BOM-marked) and then Latin-1.
fn push_decoded(
    out: &mut String,
    operand: &Object,
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    current_font: &str,
) {
    let Object::String(bytes, _) = operand else {
        return;
    };
    if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
        if let Ok(encoding) = font_dict.get_font_encoding(doc) {
            if let Ok(text) = Document::decode_text(&encoding, bytes) {
                out.push_str(&text);
                return;
            }
        }
    }
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        out.push_str(&String::from_utf16_lossy(&utf16));
    } else {
        out.extend(bytes.iter().map(|&b| b as char));
    }
}

/// Clears permission/usage restrictions from a loaded document.
///
/// Returns `Ok(false)` when the document carries no `/Encrypt` dictionary
/// (nothing to unlock — a successful no-op, not an error). Restriction-only
/// protection authenticates with one of the well-known passwords; genuine
/// content encryption does not and fails with
/// [`Error::RestrictionUnlockFailed`].
pub fn unlock_restrictions(doc: &mut Document) -> Result<bool> {
    if doc.trailer.get(b"Encrypt").is_err() {
        return Ok(false);
    }
    for password in UNLOCK_PASSWORDS {
        if doc.decrypt(password).is_ok() {
            doc.trailer.remove(b"Encrypt");
            return Ok(true);
        }
    }
    Err(Error::RestrictionUnlockFailed)
}

/// A run of pages to copy out of one source document.
pub struct PagePull<'a> {
    pub document: &'a Document,
    /// 1-based page numbers, in output order.
    pub pages: Vec<u32>,
}

/// Builds a new document from the given page pulls, in order, copying page
/// content verbatim (no re-rendering). Inherited page attributes are
/// materialized before the pages are detached from their old page tree.
pub fn assemble_pages(pulls: &[PagePull<'_>]) -> Result<Document> {
    let mut next_id = 1u32;
    let mut collected: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut page_order: Vec<ObjectId> = Vec::new();

    for pull in pulls {
        if pull.pages.is_empty() {
            continue;
        }
        let mut doc = pull.document.clone();
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        let page_map = doc.get_pages();
        let mut selected: Vec<ObjectId> = Vec::with_capacity(pull.pages.len());
        for &number in &pull.pages {
            let page_id = *page_map.get(&number).ok_or_else(|| {
                Error::Internal(format!("page {number} out of range for source document"))
            })?;
            selected.push(page_id);
        }

        materialize_inherited(&mut doc, &selected)?;
        page_order.extend(selected.iter().copied());

        for (id, object) in std::mem::take(&mut doc.objects) {
            match object.type_name().unwrap_or_default() {
                "Catalog" | "Pages" => {}
                _ => {
                    collected.insert(id, object);
                }
            }
        }
    }

    if page_order.is_empty() {
        return Err(Error::Internal("no pages selected for assembly".into()));
    }

    let mut dest = Document::with_version("1.5");
    dest.objects = collected;
    dest.max_id = next_id.saturating_sub(1);

    let pages_id = dest.new_object_id();
    for &page_id in &page_order {
        if let Ok(page) = dest
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
        {
            page.set("Parent", Object::Reference(pages_id));
        }
    }
    let kids: Vec<Object> = page_order.iter().map(|&id| Object::Reference(id)).collect();
    dest.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_order.len() as i64,
            "Kids" => kids,
        }),
    );

    let catalog_id = dest.new_object_id();
    dest.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        }),
    );
    dest.trailer.set("Root", catalog_id);
    dest.renumber_objects();
    dest.compress();
    Ok(dest)
}

/// Copies `Resources`/`MediaBox`/`CropBox`/`Rotate` down from ancestor
/// Pages nodes onto each selected page that lacks them, so dropping the
/// old page tree loses nothing.
fn materialize_inherited(doc: &mut Document, pages: &[ObjectId]) -> Result<()> {
    let mut patches: Vec<(ObjectId, Vec<(Vec<u8>, Object)>)> = Vec::new();
    for &page_id in pages {
        let page = doc.get_dictionary(page_id)?;
        let mut missing: Vec<(Vec<u8>, Object)> = Vec::new();
        for key in INHERITABLE_KEYS {
            if page.get(key).is_err() {
                if let Some(value) = inherited_attr(doc, page, key) {
                    missing.push((key.to_vec(), value));
                }
            }
        }
        if !missing.is_empty() {
            patches.push((page_id, missing));
        }
    }
    for (page_id, missing) in patches {
        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)?;
        for (key, value) in missing {
            page.set(key, value);
        }
    }
    Ok(())
}

fn inherited_attr(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut node = page.clone();
    loop {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?.clone();
    }
}

/// Minimal single-font document with one page per text block; each
/// line becomes its own Td/Tj pair so the walker splits them back.
/// Test builder shared with the assembly tests.
#[cfg(test)]
pub(crate) fn fixture(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let mut operations = vec![
            lopdf::content::Operation::new("BT", vec![]),
            lopdf::content::Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), 12.into()],
            ),
        ];
        for line in text.lines() {
            operations.push(lopdf::content::Operation::new(
                "Td",
                vec![0.into(), (-14).into()],
            ));
            operations.push(lopdf::content::Operation::new(
                "Tj",
                vec![Object::string_literal(line)],
            ));
        }
        operations.push(lopdf::content::Operation::new("ET", vec![]));

        let content = Content { operations };
        let stream_id = doc.add_object(lopdf::Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(stream_id),
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
            "Resources" => Object::Reference(resources_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", catalog_id);
    doc
}
