//! CSV logger
//!
//! Ties the pieces together: the target path is resolved against the
//! header manager, the file is opened for appending, the header row is
//! written to empty files, and a tagged logger with CSV formatters writes
//! one row per call through its filter into the file.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::io::Write;
use std::iter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use taglog_utils::open::DEFAULT_FILE_MODE;
use taglog_utils::{stat_if_exists, FileOpener, Result, TaglogError};
use tracing::{debug, info};

use super::escape::escape_str;
use super::header::{CsvHeaderManager, ScanFailurePolicy};
use crate::emitter::{delimiter_byte, formatter, short_level, Formatters, DEFAULT_TIME_FORMAT};
use crate::level::Level;
use crate::resolve::resolve_incremental_path;
use crate::tagged::{OptionalParts, TaggedLogger, TaggedOptions};

const TAG_PREFIX: &str = "csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub delimiter: char,
    /// Reuse a file with a mismatched header after emptying it, instead of
    /// moving on to a suffixed file
    pub truncate_on_mismatch: bool,
    pub parts: OptionalParts,
    pub time_format: String,
    pub scan_failure: ScanFailurePolicy,
    /// Permission bits for a newly created file (unix only)
    pub file_mode: u32,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            truncate_on_mismatch: false,
            parts: OptionalParts::default(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            scan_failure: ScanFailurePolicy::default(),
            file_mode: DEFAULT_FILE_MODE,
        }
    }
}

impl CsvConfig {
    fn tagged_options(&self) -> TaggedOptions {
        TaggedOptions {
            delimiter: self.delimiter,
            parts: self.parts,
            min_level: Level::Trace,
            time_format: self.time_format.clone(),
        }
    }
}

impl Formatters {
    /// Formatters producing one CSV row.
    ///
    /// Every value is escaped and followed by the delimiter. The message is
    /// expected to be pre-escaped. Key-value fields have no column and are
    /// not rendered, and the error column carries no name.
    pub fn csv(delimiter: char) -> Self {
        let byte = delimiter as u8;
        let escaped = move || formatter(move |v| format!("{}{}", escape_str(v, byte), delimiter));

        Self {
            timestamp: Some(escaped()),
            level: Some(formatter(move |v| format!("{}{}", short_level(v), delimiter))),
            caller: Some(escaped()),
            message: Some(formatter(move |v| format!("{}{}", v, delimiter))),
            field_name: None,
            field_value: None,
            err_name: None,
            err_value: Some(escaped()),
        }
    }
}

/// Appends rows to a CSV file whose header matches its columns
#[derive(Debug)]
pub struct CsvLogger {
    logger: TaggedLogger,
    path: PathBuf,
    columns: Arc<[String]>,
    config: Arc<CsvConfig>,
    delimiter: u8,
}

impl CsvLogger {
    /// Open (or create) the CSV file for `columns` at `path` or at the
    /// first suffixed variant whose header fits.
    pub fn new<S: AsRef<str>>(path: impl AsRef<Path>, columns: &[S], config: CsvConfig) -> Result<Self> {
        let columns: Arc<[String]> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        Self::open(path.as_ref(), columns, Arc::new(config))
    }

    fn open(path: &Path, columns: Arc<[String]>, config: Arc<CsvConfig>) -> Result<Self> {
        let delimiter = delimiter_byte(config.delimiter)?;
        let header = CsvHeaderManager::new(&columns[..], &config.parts, config.delimiter);

        let resolved = resolve_incremental_path(path, |candidate, meta| {
            header.should_rotate(candidate, meta, config.truncate_on_mismatch, config.scan_failure)
        });

        let meta = stat_if_exists(&resolved);
        let truncate = header.should_truncate(&resolved, meta.as_ref(), config.truncate_on_mismatch);
        if truncate {
            debug!(path = %resolved.display(), "truncating csv file with mismatched header");
        }

        let mut file = FileOpener::new()
            .write_only()
            .truncate(truncate)
            .mode(config.file_mode)
            .open(&resolved)?;

        let needs_header = header
            .should_write_header(&file)
            .map_err(|e| TaglogError::FileRead {
                path: resolved.clone(),
                source: e,
            })?;
        if needs_header {
            file.write_all(header.header_line().as_bytes())
                .map_err(|e| TaglogError::FileWrite {
                    path: resolved.clone(),
                    source: e,
                })?;
        }

        let logger = TaggedLogger::with_formatters(
            TAG_PREFIX,
            file,
            &config.tagged_options(),
            Formatters::csv(config.delimiter),
        )?;

        info!(
            path = %resolved.display(),
            columns = columns.len(),
            header_written = needs_header,
            "opened csv log"
        );

        Ok(Self {
            logger,
            path: resolved,
            columns,
            config,
            delimiter,
        })
    }

    /// Append one row
    #[track_caller]
    pub fn csv<S: AsRef<str>>(&self, values: &[S]) -> Result<()> {
        self.logger.log_tag(Level::Debug, &self.row(values), None)
    }

    /// Append one row with the error column filled in
    #[track_caller]
    pub fn csv_err<S: AsRef<str>>(&self, err: &dyn StdError, values: &[S]) -> Result<()> {
        self.logger.log_tag(Level::Error, &self.row(values), Some(err))
    }

    /// The path actually opened, suffix included
    pub fn file_name(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn config(&self) -> &CsvConfig {
        &self.config
    }

    pub fn logger(&self) -> &TaggedLogger {
        &self.logger
    }

    /// Another logger with the same columns and configuration, writing to
    /// `path` resolved the same way. Resolution does not know about live
    /// loggers, so `path` must not be one another logger is writing to.
    pub fn fork(&self, path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path.as_ref(), Arc::clone(&self.columns), Arc::clone(&self.config))
    }

    /// Flush and close the file
    pub fn close(self) -> Result<()> {
        debug!(path = %self.path.display(), "closing csv log");
        self.logger.detach()
    }

    /// Escaped values joined by the separator. Rows shorter than the
    /// declared columns are padded with empty fields.
    fn row<S: AsRef<str>>(&self, values: &[S]) -> String {
        let separator = format!("{} ", self.config.delimiter);
        let missing = self.columns.len().saturating_sub(values.len());
        values
            .iter()
            .map(|v| escape_str(v.as_ref(), self.delimiter))
            .chain(iter::repeat(Cow::Borrowed("")).take(missing))
            .collect::<Vec<_>>()
            .join(separator.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io;
    use tempfile::TempDir;

    fn bare() -> CsvConfig {
        CsvConfig {
            parts: OptionalParts::none(),
            ..CsvConfig::default()
        }
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    // ==================== Config Tests ====================

    #[test]
    fn test_config_defaults() {
        let config = CsvConfig::default();
        assert_eq!(config.delimiter, ',');
        assert!(!config.truncate_on_mismatch);
        assert_eq!(config.parts, OptionalParts::default());
        assert_eq!(config.scan_failure, ScanFailurePolicy::Accept);
        assert_eq!(config.file_mode, 0o644);
    }

    #[test]
    fn test_config_serde() {
        let config: CsvConfig =
            serde_json::from_str(r#"{"delimiter": ";", "scan_failure": "rotate"}"#).unwrap();
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.scan_failure, ScanFailurePolicy::Rotate);
        assert!(config.parts.timestamp);
    }

    #[test]
    fn test_invalid_delimiter() {
        let dir = TempDir::new().unwrap();
        let config = CsvConfig {
            delimiter: '"',
            ..CsvConfig::default()
        };
        let err = CsvLogger::new(dir.path().join("log.csv"), &["a"], config).unwrap_err();
        assert!(matches!(err, TaglogError::Config(_)));
        assert!(!dir.path().join("log.csv").exists());
    }

    // ==================== Formatter Tests ====================

    #[test]
    fn test_csv_formatters() {
        let f = Formatters::csv(',');
        let err_value = f.err_value.as_ref().unwrap();
        assert_eq!(err_value("a, b"), "\"a, b\",");
        assert!(f.field_name.is_none() && f.field_value.is_none() && f.err_name.is_none());

        let level = f.level.as_ref().unwrap();
        assert_eq!(level("error"), "ERR,");
    }

    // ==================== Row Tests ====================

    #[test]
    fn test_message_only_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let logger = CsvLogger::new(&path, &["My MSG", "Your MSG"], bare()).unwrap();

        logger.csv(&["hello", "world"]).unwrap();
        logger.csv(&["a,b", "say \"hi\""]).unwrap();
        logger.close().unwrap();

        assert_eq!(
            read(&path),
            "My MSG, Your MSG\nhello, world\n\"a,b\", say \"\"hi\"\"\n"
        );
    }

    #[test]
    fn test_short_rows_keep_column_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let config = CsvConfig {
            parts: OptionalParts {
                level: true,
                ..OptionalParts::none()
            },
            ..CsvConfig::default()
        };
        let logger = CsvLogger::new(&path, &["A", "B"], config).unwrap();

        logger.csv(&["x", ""]).unwrap();
        logger.csv::<&str>(&[]).unwrap();
        logger.csv(&["y"]).unwrap();
        logger.close().unwrap();

        let text = read(&path);
        assert_eq!(text, "Level, A, B\nDEB, x, \nDEB, , \nDEB, y, \n");
        assert!(text.lines().all(|line| line.split(", ").count() == 3));
    }

    #[test]
    fn test_error_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let config = CsvConfig {
            parts: OptionalParts {
                error: true,
                ..OptionalParts::none()
            },
            ..CsvConfig::default()
        };
        let logger = CsvLogger::new(&path, &["Step"], config).unwrap();
        let err = io::Error::new(io::ErrorKind::Other, "disk, full");

        logger.csv_err(&err, &["upload"]).unwrap();
        logger.csv(&["verify"]).unwrap();

        assert_eq!(read(&path), "Step, Error\nupload, \"disk, full\"\nverify\n");
    }

    #[test]
    fn test_full_row_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let logger = CsvLogger::new(&path, &["A", "B"], CsvConfig::default()).unwrap();

        logger.csv(&["1", "2"]).unwrap();

        let text = read(&path);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Timestamp, Level, Caller, A, B, Error");
        let fields: Vec<&str> = lines[1].split(", ").collect();
        assert_eq!(fields.len(), 5, "{}", lines[1]);
        assert_eq!(fields[1], "DEB");
        assert!(fields[2].contains("logger.rs:"));
        assert_eq!(&fields[3..], ["1", "2"]);
        assert!(!text.contains("tag="));
    }

    #[test]
    fn test_custom_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let config = CsvConfig {
            delimiter: ';',
            ..bare()
        };
        let logger = CsvLogger::new(&path, &["x", "y"], config).unwrap();

        logger.csv(&["a;b", "c,d"]).unwrap();
        assert_eq!(read(&path), "x; y\n\"a;b\"; c,d\n");
    }

    // ==================== File Resolution Tests ====================

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");

        let first = CsvLogger::new(&path, &["A"], bare()).unwrap();
        first.csv(&["1"]).unwrap();
        first.close().unwrap();

        let second = CsvLogger::new(&path, &["A"], bare()).unwrap();
        assert_eq!(second.file_name(), path);
        second.csv(&["2"]).unwrap();
        second.close().unwrap();

        assert_eq!(read(&path), "A\n1\n2\n");
    }

    #[test]
    fn test_mismatch_rotates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        fs::write(&path, "Other\nold\n").unwrap();

        let logger = CsvLogger::new(&path, &["A"], bare()).unwrap();
        assert_eq!(logger.file_name(), dir.path().join("log_1.csv"));
        logger.csv(&["new"]).unwrap();

        assert_eq!(read(&path), "Other\nold\n");
        assert_eq!(read(logger.file_name()), "A\nnew\n");
    }

    #[test]
    fn test_non_utf8_mismatch_rotates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        fs::write(&path, b"Caf\xe9\nold\n").unwrap();

        let logger = CsvLogger::new(&path, &["A"], bare()).unwrap();
        logger.csv(&["new"]).unwrap();

        assert_eq!(logger.file_name(), dir.path().join("log_1.csv"));
        assert_eq!(fs::read(&path).unwrap(), b"Caf\xe9\nold\n");
        assert_eq!(read(logger.file_name()), "A\nnew\n");
    }

    #[test]
    fn test_toggled_optional_parts_reuse_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        fs::write(&path, "A\nold\n").unwrap();

        let logger = CsvLogger::new(&path, &["A"], CsvConfig::default()).unwrap();
        assert_eq!(logger.file_name(), path);
        logger.close().unwrap();
        assert!(read(&path).starts_with("A\nold\n"));
    }

    #[test]
    fn test_mismatch_truncates_when_configured() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        fs::write(&path, "Other\nold\n").unwrap();
        let config = CsvConfig {
            truncate_on_mismatch: true,
            ..bare()
        };

        let logger = CsvLogger::new(&path, &["A"], config).unwrap();
        assert_eq!(logger.file_name(), path);
        logger.csv(&["new"]).unwrap();

        assert_eq!(read(&path), "A\nnew\n");
    }

    #[test]
    fn test_compatible_file_not_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        fs::write(&path, "A\nkept\n").unwrap();
        let config = CsvConfig {
            truncate_on_mismatch: true,
            ..bare()
        };

        let logger = CsvLogger::new(&path, &["A"], config).unwrap();
        logger.csv(&["added"]).unwrap();

        assert_eq!(read(&path), "A\nkept\nadded\n");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("log.csv");

        let logger = CsvLogger::new(&path, &["A"], bare()).unwrap();
        logger.csv(&["1"]).unwrap();
        assert_eq!(read(&path), "A\n1\n");
    }

    #[test]
    fn test_open_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let err = CsvLogger::new(blocker.join("log.csv"), &["A"], bare()).unwrap_err();
        assert!(matches!(
            err,
            TaglogError::FileWrite { .. } | TaglogError::FileOpen { .. }
        ));
    }

    // ==================== Fork Tests ====================

    #[test]
    fn test_fork_shares_columns_and_config() {
        let dir = TempDir::new().unwrap();
        let parent = CsvLogger::new(dir.path().join("a.csv"), &["A", "B"], bare()).unwrap();
        let child = parent.fork(dir.path().join("b.csv")).unwrap();

        assert_eq!(child.columns(), parent.columns());
        assert!(Arc::ptr_eq(&parent.config, &child.config));
        assert_ne!(child.logger().tag(), parent.logger().tag());

        parent.csv(&["p", "1"]).unwrap();
        child.csv(&["c", "2"]).unwrap();

        assert_eq!(read(parent.file_name()), "A, B\np, 1\n");
        assert_eq!(read(child.file_name()), "A, B\nc, 2\n");
    }

}
