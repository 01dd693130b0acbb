//! Input files and the kinds of content they hold

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use crate::error::{Error, Result};

const PDF_MAGIC: &[u8] = b"%PDF-";
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Number of leading bytes inspected when sniffing a file's kind.
/// Some producers put junk before `%PDF-`, readers tolerate up to 1 KiB of it.
const SNIFF_LEN: usize = 1024;

/// Kind of content a selected file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A PDF document, all of whose pages are copied
    Pdf,
    /// A PNG image, placed on a page of its own
    Png,
    /// Anything else; skipped when merging
    Unsupported,
}

impl SourceKind {
    /// Detect the kind from the file's leading bytes, falling back to its extension
    pub fn detect(path: &Path, head: &[u8]) -> SourceKind {
        if head.starts_with(PNG_MAGIC) {
            return SourceKind::Png;
        }
        if head.starts_with(PDF_MAGIC) {
            return SourceKind::Pdf;
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            // junk before the header is only tolerated in files named as PDFs
            Some("pdf") => {
                if !contains_pdf_magic(head) {
                    log::debug!("{} has no PDF header, trusting its extension", path.display());
                }
                SourceKind::Pdf
            }
            Some("png") => SourceKind::Png,
            _ => SourceKind::Unsupported,
        }
    }

    /// Whether files of this kind contribute pages to a merge
    pub fn is_supported(&self) -> bool {
        !matches!(self, SourceKind::Unsupported)
    }
}

fn contains_pdf_magic(head: &[u8]) -> bool {
    head.windows(PDF_MAGIC.len()).any(|window| window == PDF_MAGIC)
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Pdf => write!(f, "PDF"),
            SourceKind::Png => write!(f, "PNG"),
            SourceKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A file chosen for merging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Position the file had when it was selected; stays with the file across reorders
    pub id: usize,
    /// Location on disk
    pub path: PathBuf,
    /// Display name (the file name without directories)
    pub name: String,
    /// Detected content kind
    pub kind: SourceKind,
}

impl SourceFile {
    /// Build a source file from a path, sniffing its kind from the first bytes
    pub fn from_path(id: usize, path: impl Into<PathBuf>) -> Result<SourceFile> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::FileNotFound(path));
        }

        let mut head = Vec::with_capacity(SNIFF_LEN);
        File::open(&path)?
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut head)?;

        let kind = SourceKind::detect(&path, &head);
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        log::debug!("Selected {} as {} (id {})", path.display(), kind, id);

        Ok(SourceFile { id, path, name, kind })
    }
}
