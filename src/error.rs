//! Error types for the pdf-combine library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pdf-combine library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PNG decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// An input PDF that could not be parsed
    #[error("Failed to load {}: {}", .path.display(), .source)]
    Load {
        path: PathBuf,
        source: lopdf::Error,
    },

    /// An input PNG that could not be decoded
    #[error("Failed to decode image {}: {}", .path.display(), .source)]
    InvalidImage {
        path: PathBuf,
        source: image::ImageError,
    },

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// No files matched pattern
    #[error("No files found matching pattern: {0}")]
    NoFilesMatched(String),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Merge was requested with an empty selection
    #[error("No input files provided")]
    NoInputFiles,

    /// Fewer files selected than the configured minimum
    #[error("Please select at least {required} file(s), {found} selected")]
    NotEnoughFiles { required: usize, found: usize },

    /// A reorder request that does not fit the current selection
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Every selected file was of an unsupported kind
    #[error("None of the selected files is a PDF or PNG")]
    NothingToMerge,

    /// General error
    #[error("{0}")]
    General(String),
}
