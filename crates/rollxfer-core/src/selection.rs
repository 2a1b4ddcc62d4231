//! Doff-id selection.
//!
//! Inspection files carry their production batch ("doff") id as one of the
//! underscore-separated fields of the file name, e.g. `cam1_20250821_0930_42_hole.jpg`.
//! Which field depends on the producer, so the position travels with each
//! `IdField` instead of being fixed crate-wide.

use std::fmt;

use serde::Serialize;

use crate::enumeration::file_name;
use crate::errors::RemoteError;
use crate::sizing::parse_decimal;

/// A remote file path plus whatever has been learned about it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFile {
    path: String,
    extracted_id: Option<u64>,
    size_bytes: Option<u64>,
}

impl RemoteFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extracted_id: None,
            size_bytes: None,
        }
    }

    pub fn with_id(self, id: Option<u64>) -> Self {
        Self {
            extracted_id: id,
            ..self
        }
    }

    pub fn with_size(self, size: Option<u64>) -> Self {
        Self {
            size_bytes: size,
            ..self
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    pub fn extracted_id(&self) -> Option<u64> {
        self.extracted_id
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }
}

impl From<String> for RemoteFile {
    fn from(path: String) -> Self {
        RemoteFile::new(path)
    }
}

impl From<&str> for RemoteFile {
    fn from(path: &str) -> Self {
        RemoteFile::new(path)
    }
}

/// Inclusive id range. Construction rejects `min > max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionRange {
    min: u64,
    max: u64,
}

impl SelectionRange {
    pub fn new(min: u64, max: u64) -> Result<Self, RemoteError> {
        if min > max {
            return Err(RemoteError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn contains(&self, id: u64) -> bool {
        self.min <= id && id <= self.max
    }
}

impl fmt::Display for SelectionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.min, self.max)
    }
}

/// Position of the id within a delimited file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdField {
    pub delimiter: char,
    pub index: usize,
}

impl IdField {
    pub const fn underscore(index: usize) -> Self {
        Self {
            delimiter: '_',
            index,
        }
    }

    /// Parse the id out of `path`'s file name. Missing fields, or fields
    /// that are not plain decimal digits, give `None`.
    pub fn extract(&self, path: &str) -> Option<u64> {
        file_name(path)
            .split(self.delimiter)
            .nth(self.index)
            .and_then(parse_decimal)
    }
}

impl Default for IdField {
    fn default() -> Self {
        Self::underscore(3)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceFilter {
    field: IdField,
}

impl SequenceFilter {
    pub fn new(field: IdField) -> Self {
        Self { field }
    }

    pub fn field(&self) -> IdField {
        self.field
    }

    pub fn extract_id(&self, filename: &str) -> Option<u64> {
        self.field.extract(filename)
    }

    /// Keep files whose id lies in `range`, in input order. Files without an
    /// id are dropped.
    pub fn filter_by_range<I, F>(&self, files: I, range: SelectionRange) -> Vec<RemoteFile>
    where
        I: IntoIterator<Item = F>,
        F: Into<RemoteFile>,
    {
        let mut kept = Vec::new();
        let mut without_id = 0usize;
        for file in files {
            let file: RemoteFile = file.into();
            match self.extract_id(file.path()) {
                Some(id) if range.contains(id) => kept.push(file.with_id(Some(id))),
                Some(_) => {}
                None => without_id += 1,
            }
        }
        if without_id > 0 {
            log::debug!("{} file(s) skipped without a doff id", without_id);
        }
        kept
    }
}

/// Stable ascending sort by extracted id; files without an id go last.
pub fn sort_by_id(files: &mut [RemoteFile]) {
    files.sort_by_key(|file| (file.extracted_id().is_none(), file.extracted_id()));
}
