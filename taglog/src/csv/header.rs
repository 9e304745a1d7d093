//! CSV header row management
//!
//! The header row has a fixed column order:
//!
//! ```text
//! [Timestamp] [Level] [Caller] <declared columns...> [Error]
//! ```
//!
//! Optional columns appear only when their part is enabled. An existing
//! file is reused when its first line names every declared column; the
//! optional columns are not checked.

use std::fs::{File, Metadata};
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use taglog_utils::contains_all_texts;
use tracing::warn;

use crate::tagged::OptionalParts;

pub const TIMESTAMP_COLUMN: &str = "Timestamp";
pub const LEVEL_COLUMN: &str = "Level";
pub const CALLER_COLUMN: &str = "Caller";
pub const ERROR_COLUMN: &str = "Error";

/// What to do with an existing file whose first line cannot be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanFailurePolicy {
    /// Reuse the file as if the header matched
    #[default]
    Accept,
    /// Move on to a suffixed file
    Rotate,
}

/// Result of checking an existing file against the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    Absent,
    Empty,
    Compatible,
    Mismatch,
    Unreadable,
}

/// Computes the header row and judges existing files against it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvHeaderManager {
    row: Vec<String>,
    declared: Vec<String>,
    delimiter: char,
}

impl CsvHeaderManager {
    pub fn new<S: AsRef<str>>(columns: &[S], parts: &OptionalParts, delimiter: char) -> Self {
        let mut row = Vec::with_capacity(columns.len() + 4);
        if parts.timestamp {
            row.push(TIMESTAMP_COLUMN.to_string());
        }
        if parts.level {
            row.push(LEVEL_COLUMN.to_string());
        }
        if parts.caller {
            row.push(CALLER_COLUMN.to_string());
        }
        let declared: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        row.extend(declared.iter().cloned());
        if parts.error {
            row.push(ERROR_COLUMN.to_string());
        }

        Self { row, declared, delimiter }
    }

    pub fn header_row(&self) -> &[String] {
        &self.row
    }

    /// The header row as written to the file, newline included
    pub fn header_line(&self) -> String {
        let separator = format!("{} ", self.delimiter);
        let mut line = self.row.join(separator.as_str());
        line.push('\n');
        line
    }

    /// True when `file` is empty
    pub fn should_write_header(&self, file: &File) -> io::Result<bool> {
        Ok(file.metadata()?.len() == 0)
    }

    pub fn inspect(&self, path: &Path, metadata: Option<&Metadata>) -> HeaderState {
        let Some(metadata) = metadata else {
            return HeaderState::Absent;
        };
        if metadata.len() == 0 {
            return HeaderState::Empty;
        }

        match contains_all_texts(path, 1, 1, self.declared.as_slice()) {
            Ok(true) => HeaderState::Compatible,
            Ok(false) => HeaderState::Mismatch,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "header scan failed");
                HeaderState::Unreadable
            }
        }
    }

    /// Rejection predicate for the incremental resolver
    pub fn should_rotate(
        &self,
        path: &Path,
        metadata: Option<&Metadata>,
        truncate_on_mismatch: bool,
        scan_failure: ScanFailurePolicy,
    ) -> bool {
        match self.inspect(path, metadata) {
            HeaderState::Absent | HeaderState::Empty | HeaderState::Compatible => false,
            HeaderState::Mismatch => !truncate_on_mismatch,
            HeaderState::Unreadable => scan_failure == ScanFailurePolicy::Rotate,
        }
    }

    /// True when the resolved file must be emptied before use
    pub fn should_truncate(&self, path: &Path, metadata: Option<&Metadata>, truncate_on_mismatch: bool) -> bool {
        truncate_on_mismatch && self.inspect(path, metadata) == HeaderState::Mismatch
    }
}
