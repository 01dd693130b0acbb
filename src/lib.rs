//! PDF Combine Library
//!
//! A cross-platform library for combining PDF documents and PNG images into a
//! single PDF, in an order chosen by the user. This library provides
//! functionality to:
//! - Select input files and detect whether each is a PDF or a PNG
//! - Reorder the selection (move one file, or apply a whole new order)
//! - Merge the selection, copying every PDF page and giving each PNG a page of its own
//! - Extract metadata (page counts, page sizes, title) from the result
//!
//! # Example
//!
//! ```no_run
//! use pdf_combine::pdf::{merge_files, MergeOptions};
//! use pdf_combine::{output_file_name, FileSelection};
//! use std::path::PathBuf;
//!
//! let mut selection = FileSelection::from_paths([
//!     "1. intro.pdf",
//!     "2. diagram.png",
//!     "3. advanced.pdf",
//! ]).unwrap();
//!
//! // Put the diagram first
//! selection.move_item(1, 0).unwrap();
//! selection.validate(1).unwrap();
//!
//! let options = MergeOptions {
//!     sources: selection.into_vec(),
//!     output_path: PathBuf::from(output_file_name(Some("handout"))),
//!     title: Some("Handout".to_string()),
//! };
//!
//! merge_files(&options).expect("Failed to merge");
//! ```

pub mod error;
pub mod output;
pub mod pdf;
pub mod selection;
pub mod source;

// Re-export commonly used items
pub use error::{Error, Result};
pub use output::{output_file_name, resolve_output_path};
pub use selection::FileSelection;
pub use source::{SourceFile, SourceKind};
