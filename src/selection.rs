//! The ordered list of files to merge
//!
//! The order of a [`FileSelection`] is the order pages appear in the merged
//! output. It can be rearranged one item at a time ([`FileSelection::move_item`])
//! or all at once ([`FileSelection::apply_order`]).

use std::path::{Path, PathBuf};
use glob::glob;
use crate::error::{Error, Result};
use crate::source::SourceFile;

/// Ordered selection of input files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    files: Vec<SourceFile>,
}

impl FileSelection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a set of files, keeping the order given
    ///
    /// Ids are assigned from 0 in that order.
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut selection = Self::new();
        for path in paths {
            selection.push(path)?;
        }
        Ok(selection)
    }

    /// Append a file to the end of the selection
    pub fn push(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let id = self.files.iter().map(|f| f.id + 1).max().unwrap_or(0);
        self.files.push(SourceFile::from_path(id, path)?);
        Ok(())
    }

    /// Remove the file at `position`, returning it
    pub fn remove(&mut self, position: usize) -> Result<SourceFile> {
        self.check_position(position)?;
        Ok(self.files.remove(position))
    }

    /// Move the file at `from` so that it ends up at `to`
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_position(from)?;
        self.check_position(to)?;

        let item = self.files.remove(from);
        self.files.insert(to, item);
        Ok(())
    }

    /// Rearrange the whole selection
    ///
    /// `order[i]` is the current position of the file that should end up at
    /// position `i`. The order must name every position exactly once.
    pub fn apply_order(&mut self, order: &[usize]) -> Result<()> {
        if order.len() != self.files.len() {
            return Err(Error::InvalidOrder(format!(
                "expected {} positions, got {}",
                self.files.len(),
                order.len()
            )));
        }

        let mut seen = vec![false; self.files.len()];
        for &position in order {
            self.check_position(position)?;
            if std::mem::replace(&mut seen[position], true) {
                return Err(Error::InvalidOrder(format!(
                    "position {} listed more than once",
                    position + 1
                )));
            }
        }

        let mut slots: Vec<Option<SourceFile>> = self.files.drain(..).map(Some).collect();
        self.files = order
            .iter()
            .filter_map(|&position| slots[position].take())
            .collect();
        Ok(())
    }

    /// Reverse the selection
    pub fn reverse(&mut self) {
        self.files.reverse();
    }

    /// Fail unless at least `min_files` files are selected
    pub fn validate(&self, min_files: usize) -> Result<()> {
        if self.files.is_empty() {
            return Err(Error::NoInputFiles);
        }
        if self.files.len() < min_files {
            return Err(Error::NotEnoughFiles {
                required: min_files,
                found: self.files.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceFile> {
        self.files.iter()
    }

    /// Display names in merge order
    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn as_slice(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn into_vec(self) -> Vec<SourceFile> {
        self.files
    }

    fn check_position(&self, position: usize) -> Result<()> {
        if position >= self.files.len() {
            return Err(Error::InvalidOrder(format!(
                "position {} is out of range (1-{})",
                position + 1,
                self.files.len()
            )));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FileSelection {
    type Item = &'a SourceFile;
    type IntoIter = std::slice::Iter<'a, SourceFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Expand glob patterns in input arguments
///
/// Matches of a single pattern are sorted by path; the order of the
/// arguments themselves is kept, since that is the user's chosen order.
pub fn expand_inputs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();

        // An existing file is taken literally, even if its name looks like a pattern
        if !pattern.contains(['*', '?', '[']) || Path::new(pattern).exists() {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let entries = glob(pattern).map_err(|e| Error::InvalidGlob(format!("{}: {}", pattern, e)))?;
        let mut matched: Vec<PathBuf> = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => matched.push(path),
                Err(e) => log::warn!("glob error for {}: {}", pattern, e),
            }
        }

        if matched.is_empty() {
            return Err(Error::NoFilesMatched(pattern.to_string()));
        }

        matched.sort();
        paths.extend(matched);
    }

    Ok(paths)
}

/// Parse a 1-based, comma separated order like `"3, 1, 2"` into 0-based positions
pub fn parse_order(input: &str) -> Result<Vec<usize>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_position)
        .collect()
}

/// Parse a 1-based `"FROM:TO"` move into 0-based positions
pub fn parse_move(input: &str) -> Result<(usize, usize)> {
    let (from, to) = input
        .split_once(':')
        .ok_or_else(|| Error::InvalidOrder(format!("expected FROM:TO, got {:?}", input)))?;
    Ok((parse_position(from.trim())?, parse_position(to.trim())?))
}

fn parse_position(part: &str) -> Result<usize> {
    match part.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(Error::InvalidOrder(format!("invalid position: {:?}", part))),
    }
}
