//! PDF metadata extraction

use std::path::Path;
use lopdf::{Document, Object, ObjectId};
use crate::error::{Error, Result};

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Width and height of each page's MediaBox in points, in page order
    pub page_sizes: Vec<(f32, f32)>,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Producing application (if present)
    pub producer: Option<String>,
}

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()?;

    let pages_id = catalog
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("Pages is missing from the catalog".to_string()))?;

    let count = doc
        .get_dictionary(pages_id)?
        .get(b"Count")
        .and_then(Object::as_i64)
        .map_err(|_| Error::General("Pages has no integer Count".to_string()))?;

    Ok(count.max(0) as usize)
}

/// Read a text string from the Info dictionary
///
/// Handles both PDFDocEncoding-compatible literals and UTF-16BE strings with a BOM.
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };

    let bytes = info.get(key).ok()?.as_str().ok()?;
    decode_text_string(bytes)
}

pub(crate) fn decode_text_string(bytes: &[u8]) -> Option<String> {
    if let Some(utf16) = bytes.strip_prefix(&[0xFEu8, 0xFF][..]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16(&units).ok();
    }
    String::from_utf8(bytes.to_vec()).ok()
}

/// MediaBox of a page, following inherited values up the page tree
fn page_size(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    // Depth limit guards against Parent cycles in damaged files
    for _ in 0..64 {
        if let Ok(media_box) = node.get(b"MediaBox") {
            let media_box = match media_box {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                direct => direct,
            };
            let values: Vec<f32> = media_box
                .as_array()
                .ok()?
                .iter()
                .filter_map(|v| v.as_float().ok())
                .collect();
            if values.len() != 4 {
                return None;
            }
            return Some(((values[2] - values[0]).abs(), (values[3] - values[1]).abs()));
        }

        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }

    None
}

/// Extract metadata from an already loaded document
pub fn document_metadata(doc: &Document) -> Result<PdfMetadata> {
    // Use catalog-based counting for accuracy
    let page_count = count_pages_from_catalog(doc)?;

    let page_sizes = doc
        .get_pages()
        .values()
        .map(|&id| page_size(doc, id).unwrap_or((0.0, 0.0)))
        .collect();

    Ok(PdfMetadata {
        page_count,
        page_sizes,
        title: info_string(doc, b"Title"),
        author: info_string(doc, b"Author"),
        producer: info_string(doc, b"Producer"),
    })
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let metadata = document_metadata(&doc)?;

    if metadata.page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(metadata)
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(page_count)
}
