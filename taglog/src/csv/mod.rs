//! Schema-checked CSV sinks

mod escape;
mod header;
mod logger;

pub use escape::{escape, escape_str};
pub use header::{
    CsvHeaderManager, HeaderState, ScanFailurePolicy, CALLER_COLUMN, ERROR_COLUMN, LEVEL_COLUMN, TIMESTAMP_COLUMN,
};
pub use logger::{CsvConfig, CsvLogger};
