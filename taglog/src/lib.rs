//! taglog: tagged log multiplexing and schema-checked CSV sinks
//!
//! Several logical loggers share one formatting front end (an
//! [`Emitter`]). Each appends its own [`Tag`] to the lines it logs and
//! owns a [`TaggedWriteFilter`] that claims exactly those lines, strips the
//! tag and forwards them to its sink: the console, memory
//! ([`StringLogger`]) or a CSV file ([`CsvLogger`]).
//!
//! ```no_run
//! use taglog::{CsvConfig, CsvLogger};
//!
//! # fn main() -> taglog::Result<()> {
//! let log = CsvLogger::new("runs.csv", &["Step", "Duration"], CsvConfig::default())?;
//! log.csv(&["build", "12s"])?;
//! println!("rows go to {}", log.file_name().display());
//! log.close()?;
//! # Ok(())
//! # }
//! ```

pub mod csv;
pub mod emitter;
pub mod filter;
pub mod level;
pub mod resolve;
pub mod string_logger;
pub mod tagged;

pub use csv::{escape, escape_str, CsvConfig, CsvHeaderManager, CsvLogger, HeaderState, ScanFailurePolicy};
pub use emitter::{Emitter, Formatters, Record, SharedEmitter, SinkId};
pub use filter::{Tag, TaggedWriteFilter};
pub use level::Level;
pub use resolve::{resolve_incremental_path, SuffixState};
pub use string_logger::{MemorySink, StringLogger, StringLoggerConfig};
pub use tagged::{OptionalParts, TaggedLogger, TaggedOptions};

pub use taglog_utils::{Result, TaglogError};
