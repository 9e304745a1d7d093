//! In-memory string logger
//!
//! Keeps every forwarded line in a vector. Useful for tests and for
//! collecting diagnostics that are reported later in one piece.

use std::error::Error as StdError;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use taglog_utils::Result;

use crate::level::Level;
use crate::tagged::{TaggedLogger, TaggedOptions};

const TAG_PREFIX: &str = "string-log";

/// Sink storing one string per write, without the trailing newline
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let line = String::from_utf8_lossy(buf);
        let line = line.strip_suffix('\n').unwrap_or(&line);
        self.lines.lock().push(line.to_string());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringLoggerConfig {
    /// Capacity reserved for the line store
    pub initial_capacity: usize,
    pub tagged: TaggedOptions,
}

impl Default for StringLoggerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 10,
            tagged: TaggedOptions::default(),
        }
    }
}

/// Tagged logger writing into memory
#[derive(Debug)]
pub struct StringLogger {
    logger: TaggedLogger,
    sink: MemorySink,
    config: Arc<StringLoggerConfig>,
}

impl StringLogger {
    pub fn new(config: StringLoggerConfig) -> Result<Self> {
        Self::from_shared(Arc::new(config))
    }

    fn from_shared(config: Arc<StringLoggerConfig>) -> Result<Self> {
        let sink = MemorySink::with_capacity(config.initial_capacity);
        let logger = TaggedLogger::new(TAG_PREFIX, sink.clone(), &config.tagged)?;
        Ok(Self { logger, sink, config })
    }

    /// Append a debug line
    #[track_caller]
    pub fn append_string(&self, msg: &str) -> Result<()> {
        self.logger.log_tag(Level::Debug, msg, None)
    }

    /// Append an error line with the error column filled in
    #[track_caller]
    pub fn append_string_err(&self, msg: &str, err: &dyn StdError) -> Result<()> {
        self.logger.log_tag(Level::Error, msg, Some(err))
    }

    /// Snapshot of the stored lines
    pub fn logs(&self) -> Vec<String> {
        self.sink.lines()
    }

    pub fn len(&self) -> usize {
        self.sink.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sink.is_empty()
    }

    pub fn config(&self) -> &StringLoggerConfig {
        &self.config
    }

    pub fn logger(&self) -> &TaggedLogger {
        &self.logger
    }

    /// New logger with the same configuration, its own tag and empty storage
    pub fn fork(&self) -> Result<Self> {
        Self::from_shared(Arc::clone(&self.config))
    }
}
