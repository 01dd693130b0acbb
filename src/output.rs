//! Naming the merged file

use std::path::{Path, PathBuf};

/// Base name used when the user gives none
pub const DEFAULT_NAME: &str = "merged";

/// File name for the merged PDF: `<name>.pdf`, or `merged.pdf` for a blank name
pub fn output_file_name(name: Option<&str>) -> String {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(DEFAULT_NAME);

    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{}.pdf", name)
    }
}

/// Where to write the merged PDF
///
/// An explicit path wins; otherwise the file is named from `name` inside `dir`.
pub fn resolve_output_path(dir: &Path, name: Option<&str>, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => dir.join(output_file_name(name)),
    }
}
