//! PDF manipulation module

pub mod embed;
pub mod merge;
pub mod metadata;

// Re-export commonly used items
pub use embed::{add_image_page, EmbeddedPng};
pub use merge::{merge_document, merge_files, merge_to_bytes, MergeOptions, MergeSummary, MergedDocument};
pub use metadata::{count_pages, document_metadata, extract_metadata, PdfMetadata};
