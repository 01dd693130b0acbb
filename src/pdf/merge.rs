//! Combining PDFs and PNG images into a single PDF using lopdf

use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, FixedOffset, Local};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use crate::error::{Error, Result};
use crate::pdf::embed::{add_image_page, EmbeddedPng};
use crate::source::{SourceFile, SourceKind};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Bound on page tree depth, so a damaged Parent chain cannot loop forever
const MAX_TREE_DEPTH: usize = 64;

/// MediaBox for pages that specify none anywhere in their tree (US Letter)
const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Options for merging files
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input files in the order they should be merged
    pub sources: Vec<SourceFile>,
    /// Output PDF file path
    pub output_path: PathBuf,
    /// Title stored in the output's document info
    pub title: Option<String>,
}

/// What a merge produced
#[derive(Debug, Clone)]
pub struct MergeSummary {
    /// Where the merged PDF was written
    pub output_path: PathBuf,
    /// Pages in the merged PDF
    pub page_count: usize,
    /// Files that contributed pages
    pub source_count: usize,
    /// Files skipped because they are neither PDF nor PNG
    pub skipped: Vec<PathBuf>,
}

/// A merged document that has not been written anywhere yet
#[derive(Debug)]
pub struct MergedDocument {
    pub document: Document,
    pub page_count: usize,
    pub skipped: Vec<PathBuf>,
}

/// Merge the sources, in order, into a new document
///
/// Every page of each PDF is copied in its original order. Each PNG becomes
/// one page the size of the image, in points, with the image filling it.
/// Files of any other kind are skipped.
pub fn merge_document(sources: &[SourceFile], title: Option<&str>) -> Result<MergedDocument> {
    if sources.is_empty() {
        return Err(Error::NoInputFiles);
    }

    let mut merged = Document::with_version("1.5");

    // Reserve the page tree root first so image pages can point at it
    let pages_id = merged.new_object_id();
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut skipped = Vec::new();

    for source in sources {
        match source.kind {
            SourceKind::Pdf => {
                let pages = append_pdf(&mut merged, &source.path)?;
                log::debug!("Copied {} page(s) from {}", pages.len(), source.name);
                page_ids.extend(pages);
            }
            SourceKind::Png => {
                let bytes = fs::read(&source.path)?;
                let image = EmbeddedPng::decode(&bytes).map_err(|e| match e {
                    Error::Image(source_err) => Error::InvalidImage {
                        path: source.path.clone(),
                        source: source_err,
                    },
                    other => other,
                })?;
                log::debug!("Embedded {} ({}x{})", source.name, image.width, image.height);
                page_ids.push(add_image_page(&mut merged, pages_id, &image)?);
            }
            SourceKind::Unsupported => {
                log::warn!("Skipping {}: not a PDF or PNG file", source.path.display());
                skipped.push(source.path.clone());
            }
        }
    }

    if page_ids.is_empty() {
        return Err(Error::NothingToMerge);
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_ids.len() as i64,
            "Kids" => kids,
        }),
    );

    // Every page now hangs directly off the new root
    for &page_id in &page_ids {
        if let Ok(page) = merged.get_dictionary_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    let info_id = merged.add_object(info_dictionary(title, Local::now().fixed_offset()));
    merged.trailer.set("Root", Object::Reference(catalog_id));
    merged.trailer.set("Info", Object::Reference(info_id));

    // Old catalogs, page tree nodes and outlines of the inputs are no longer reachable
    let pruned = merged.prune_objects();
    log::debug!("Pruned {} unreachable objects", pruned.len());

    merged.renumber_objects();
    merged.compress();

    Ok(MergedDocument {
        document: merged,
        page_count: page_ids.len(),
        skipped,
    })
}

/// Merge the sources and serialize the result in memory
pub fn merge_to_bytes(sources: &[SourceFile], title: Option<&str>) -> Result<Vec<u8>> {
    let mut merged = merge_document(sources, title)?;
    let mut buffer = Vec::new();
    merged.document.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Merge the selected files and write the result to `options.output_path`
///
/// # Example
///
/// ```no_run
/// use pdf_combine::pdf::{merge_files, MergeOptions};
/// use pdf_combine::FileSelection;
/// use std::path::PathBuf;
///
/// let selection = FileSelection::from_paths(["cover.png", "report.pdf"]).unwrap();
/// let options = MergeOptions {
///     sources: selection.into_vec(),
///     output_path: PathBuf::from("merged.pdf"),
///     title: None,
/// };
///
/// merge_files(&options).expect("Failed to merge");
/// ```
pub fn merge_files(options: &MergeOptions) -> Result<MergeSummary> {
    if options.sources.is_empty() {
        return Err(Error::NoInputFiles);
    }

    // Sources built by hand rather than through `SourceFile::from_path` may not exist
    for source in &options.sources {
        if !source.path.exists() {
            return Err(Error::FileNotFound(source.path.clone()));
        }
    }

    let mut merged = merge_document(&options.sources, options.title.as_deref())?;

    if let Some(parent) = options.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    merged.document.save(&options.output_path)?;

    Ok(MergeSummary {
        output_path: options.output_path.clone(),
        page_count: merged.page_count,
        source_count: options.sources.len() - merged.skipped.len(),
        skipped: merged.skipped,
    })
}

/// Load a PDF and move all of its objects into `merged`, returning its page ids in order
fn append_pdf(merged: &mut Document, path: &Path) -> Result<Vec<ObjectId>> {
    let mut doc = Document::load(path).map_err(|source| Error::Load {
        path: path.to_path_buf(),
        source,
    })?;

    if doc.get_pages().is_empty() {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    if version_key(&doc.version) > version_key(&merged.version) {
        log::debug!("Raising output version to {} for {}", doc.version, path.display());
        merged.version = doc.version.clone();
    }

    // Renumber objects in this document to avoid conflicts
    doc.renumber_objects_with(merged.max_id + 1);

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    push_down_inherited_attributes(&mut doc, &page_ids)?;

    merged.max_id = merged.max_id.max(doc.max_id);
    merged.objects.extend(doc.objects);

    Ok(page_ids)
}

/// Header version as `(major, minor)`; unparseable versions sort lowest
fn version_key(version: &str) -> (u32, u32) {
    let mut parts = version.trim().splitn(2, '.');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (major, minor)
}

/// Copy inherited attributes onto each page
///
/// Pages are re-parented under a fresh root when merged, which would otherwise
/// lose any Resources or MediaBox held on the original intermediate nodes.
fn push_down_inherited_attributes(doc: &mut Document, page_ids: &[ObjectId]) -> Result<()> {
    for &page_id in page_ids {
        let mut inherited: Vec<(&[u8], Object)> = Vec::new();
        let mut missing: Vec<&[u8]> = {
            let page = doc.get_dictionary(page_id)?;
            INHERITABLE.iter().copied().filter(|key| !page.has(key)).collect()
        };

        let mut parent = doc
            .get_dictionary(page_id)?
            .get(b"Parent")
            .and_then(Object::as_reference)
            .ok();
        let mut depth = 0;

        while let Some(node_id) = parent {
            if missing.is_empty() || depth >= MAX_TREE_DEPTH {
                break;
            }
            let Ok(node) = doc.get_dictionary(node_id) else {
                break;
            };

            missing.retain(|key| match node.get(key) {
                Ok(value) => {
                    inherited.push((*key, value.clone()));
                    false
                }
                Err(_) => true,
            });

            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }

        if missing.contains(&&b"MediaBox"[..]) {
            log::warn!("Page {:?} has no MediaBox, using US Letter", page_id);
            let media_box: Vec<Object> = DEFAULT_MEDIA_BOX.iter().map(|&v| Object::Integer(v)).collect();
            inherited.push((&b"MediaBox"[..], Object::Array(media_box)));
        }

        if inherited.is_empty() {
            continue;
        }

        let page = doc.get_dictionary_mut(page_id)?;
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }

    Ok(())
}

/// Document information for the merged file
fn info_dictionary(title: Option<&str>, now: DateTime<FixedOffset>) -> Dictionary {
    let date = Object::string_literal(pdf_date(&now));
    let mut info = dictionary! {
        "Producer" => Object::string_literal(concat!("pdf-combine ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => date.clone(),
        "ModDate" => date,
    };

    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        info.set("Title", encode_text_string(title));
    }

    info
}

/// Encode text for a PDF text string: a literal for ASCII, UTF-16BE with BOM otherwise
fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Format a timestamp as a PDF date string, e.g. `D:20240115093000+01'00'`
fn pdf_date(time: &DateTime<FixedOffset>) -> String {
    let offset = time.format("%:z").to_string().replacen(':', "'", 1);
    format!("{}{}'", time.format("D:%Y%m%d%H%M%S"), offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::metadata::{decode_text_string, document_metadata};
    use chrono::TimeZone;
    use tempfile::TempDir;

    /// Write a PDF whose pages are `width` points wide, one width per page
    fn write_test_pdf(dir: &Path, name: &str, widths: &[i64]) -> SourceFile {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for (i, &width) in widths.iter().enumerate() {
            let content = format!("BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET", name, i + 1);
            let content_id = doc.add_object(lopdf::Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "Contents" => Object::Reference(content_id),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(792),
                ],
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => widths.len() as i64,
                "Kids" => kids,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let path = dir.join(name);
        doc.save(&path).unwrap();
        SourceFile::from_path(0, &path).unwrap()
    }

    fn write_versioned_pdf(dir: &Path, name: &str, version: &str) -> SourceFile {
        let source = write_test_pdf(dir, name, &[100]);
        let mut doc = Document::load(&source.path).unwrap();
        doc.version = version.to_string();
        doc.save(&source.path).unwrap();
        source
    }

    fn widths_of(doc: &Document) -> Vec<f32> {
        document_metadata(doc)
            .unwrap()
            .page_sizes
            .into_iter()
            .map(|(w, _)| w)
            .collect()
    }

    #[test]
    fn test_merge_options_creation() {
        let options = MergeOptions {
            sources: vec![],
            output_path: PathBuf::from("merged.pdf"),
            title: Some("Week 1".to_string()),
        };

        assert!(options.sources.is_empty());
        assert_eq!(options.output_path, Path::new("merged.pdf"));
    }

    #[test]
    fn test_merge_empty_fails() {
        let result = merge_document(&[], None);
        assert!(matches!(result, Err(Error::NoInputFiles)));
    }

    #[test]
    fn test_merge_keeps_selected_order() {
        let dir = TempDir::new().unwrap();
        let first = write_test_pdf(dir.path(), "first.pdf", &[101, 102]);
        let second = write_test_pdf(dir.path(), "second.pdf", &[201]);
        let third = write_test_pdf(dir.path(), "third.pdf", &[301, 302, 303]);

        let merged = merge_document(&[third, first, second], None).unwrap();

        assert_eq!(merged.page_count, 6);
        assert_eq!(
            widths_of(&merged.document),
            vec![301.0, 302.0, 303.0, 101.0, 102.0, 201.0]
        );
    }

    #[test]
    fn test_merge_same_file_twice() {
        let dir = TempDir::new().unwrap();
        let pdf = write_test_pdf(dir.path(), "repeat.pdf", &[150, 160]);

        let merged = merge_document(&[pdf.clone(), pdf], None).unwrap();
        assert_eq!(widths_of(&merged.document), vec![150.0, 160.0, 150.0, 160.0]);
    }

    #[test]
    fn test_merge_skips_unsupported_files() {
        let dir = TempDir::new().unwrap();
        let pdf = write_test_pdf(dir.path(), "doc.pdf", &[100]);
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "not a document").unwrap();
        let notes = SourceFile::from_path(1, &notes).unwrap();

        let merged = merge_document(&[notes.clone(), pdf], None).unwrap();
        assert_eq!(merged.page_count, 1);
        assert_eq!(merged.skipped, vec![notes.path]);
    }

    #[test]
    fn test_merge_only_unsupported_files_fails() {
        let dir = TempDir::new().unwrap();
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "not a document").unwrap();
        let notes = SourceFile::from_path(0, &notes).unwrap();

        assert!(matches!(merge_document(&[notes], None), Err(Error::NothingToMerge)));
    }

    #[test]
    fn test_merge_reports_unparseable_pdf() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.pdf");
        fs::write(&broken, b"%PDF-1.5\nthis is not really a pdf").unwrap();
        let broken = SourceFile::from_path(0, &broken).unwrap();

        let err = merge_document(&[broken], None).unwrap_err();
        assert!(err.to_string().contains("broken.pdf"), "unexpected error: {}", err);
    }

    #[test]
    fn test_merge_empty_pdf_fails() {
        let dir = TempDir::new().unwrap();
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Count" => Object::Integer(0),
            "Kids" => Vec::<Object>::new(),
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let path = dir.path().join("empty.pdf");
        doc.save(&path).unwrap();

        let pdf = write_test_pdf(dir.path(), "doc.pdf", &[100]);
        let empty = SourceFile::from_path(1, &path).unwrap();

        match merge_document(&[pdf, empty], None) {
            Err(Error::EmptyPdf(p)) => assert_eq!(p, path),
            other => panic!("expected EmptyPdf, got {:?}", other.map(|m| m.page_count)),
        }
    }

    #[test]
    fn test_merge_files_missing_source() {
        let dir = TempDir::new().unwrap();
        let missing = SourceFile {
            id: 0,
            path: dir.path().join("gone.pdf"),
            name: "gone.pdf".to_string(),
            kind: SourceKind::Pdf,
        };
        let options = MergeOptions {
            sources: vec![missing.clone()],
            output_path: dir.path().join("out.pdf"),
            title: None,
        };

        match merge_files(&options) {
            Err(Error::FileNotFound(p)) => assert_eq!(p, missing.path),
            other => panic!("expected FileNotFound, got {:?}", other.map(|s| s.page_count)),
        }
        assert!(!options.output_path.exists());
    }

    #[test]
    fn test_merge_takes_highest_input_version() {
        let dir = TempDir::new().unwrap();
        let old = write_versioned_pdf(dir.path(), "old.pdf", "1.3");
        let new = write_versioned_pdf(dir.path(), "new.pdf", "1.7");

        let merged = merge_document(&[old.clone(), new], None).unwrap();
        assert_eq!(merged.document.version, "1.7");

        // never lower than what image pages need
        let merged = merge_document(&[old], None).unwrap();
        assert_eq!(merged.document.version, "1.5");
    }

    #[test]
    fn test_version_key() {
        assert!(version_key("1.7") > version_key("1.5"));
        assert!(version_key("2.0") > version_key("1.7"));
        assert_eq!(version_key("garbage"), (0, 0));
    }

    #[test]
    fn test_push_down_inherited_attributes() {
        let mut doc = Document::with_version("1.5");
        let root_id = doc.new_object_id();
        let middle_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! { "Type" => "Font" });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(middle_id),
            "Rotate" => Object::Integer(90),
        });
        doc.objects.insert(
            middle_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Parent" => Object::Reference(root_id),
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                },
                "Rotate" => Object::Integer(180),
            }),
        );
        doc.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(middle_id)],
                "Count" => Object::Integer(1),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(300),
                    Object::Integer(400),
                ],
            }),
        );

        push_down_inherited_attributes(&mut doc, &[page_id]).unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"Resources"));
        assert_eq!(page.get(b"MediaBox").unwrap().as_array().unwrap().len(), 4);
        // the page's own value wins over the ancestor's
        assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);
        assert!(!page.has(b"CropBox"));
    }

    #[test]
    fn test_push_down_default_media_box() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });

        push_down_inherited_attributes(&mut doc, &[page_id]).unwrap();

        let media_box = doc.get_dictionary(page_id).unwrap().get(b"MediaBox").unwrap();
        let values: Vec<i64> = media_box
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        assert_eq!(values, vec![0, 0, 612, 792]);
    }

    #[test]
    fn test_info_dictionary_title_and_dates() {
        let now = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, 9, 30, 0)
            .unwrap();
        let info = info_dictionary(Some("Handout"), now);

        assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Handout");
        assert_eq!(
            info.get(b"CreationDate").unwrap().as_str().unwrap(),
            b"D:20240115093000+01'00'"
        );
        assert!(info.has(b"Producer"));

        let untitled = info_dictionary(Some("  "), now);
        assert!(!untitled.has(b"Title"));
    }

    #[test]
    fn test_pdf_date_negative_offset() {
        let time = FixedOffset::west_opt(5 * 3600 + 30 * 60)
            .unwrap()
            .with_ymd_and_hms(2023, 12, 31, 23, 59, 58)
            .unwrap();
        assert_eq!(pdf_date(&time), "D:20231231235958-05'30'");
    }

    #[test]
    fn test_encode_text_string_unicode() {
        let encoded = encode_text_string("Übersicht");
        let bytes = encoded.as_str().unwrap();
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
        assert_eq!(decode_text_string(bytes).as_deref(), Some("Übersicht"));
    }
}
