//! taglog-utils: Common utilities shared across taglog crates
//!
//! This crate provides:
//! - Unified error types ([`TaglogError`], [`Result`])
//! - Diagnostics logging setup ([`init_logging`], [`LogConfig`])
//! - The file-open primitive ([`FileOpener`])
//! - Line-range text scanning ([`scan`] module)
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod open;
pub mod paths;
pub mod scan;

// Re-export main types at crate root for convenience
pub use error::{Result, TaglogError};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogOutput};
pub use open::{stat_if_exists, Access, FileOpener};
pub use scan::{contains_all_texts, contains_text};

pub use paths::{csv_dir, data_dir, log_dir, state_dir};
