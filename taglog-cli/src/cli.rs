//! CLI argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use taglog::{CsvConfig, OptionalParts, ScanFailurePolicy};

/// Append rows to schema-checked CSV logs
#[derive(Parser, Debug)]
#[command(name = "taglog")]
#[command(about = "Append rows to schema-checked CSV logs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Append one row per stdin line to a CSV log
    ///
    /// Each line is split on the delimiter and the values are trimmed.
    /// Prints the path of the file actually written, which carries a
    /// numeric suffix when the requested file has a different header.
    Csv {
        /// Requested CSV file [default: $XDG_DATA_HOME/taglog/csv/taglog.csv]
        path: Option<PathBuf>,

        #[command(flatten)]
        options: CsvArgs,
    },

    /// Print the first of PATH, PATH_1, PATH_2, ... that does not exist
    Resolve {
        path: PathBuf,
    },

    /// Print a value escaped for CSV
    Escape {
        value: String,

        /// Field delimiter
        #[arg(short, long, default_value_t = ',')]
        delimiter: char,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct CsvArgs {
    /// Column names (comma-separated or repeated)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub columns: Vec<String>,

    /// Field delimiter
    #[arg(short, long, default_value_t = ',')]
    pub delimiter: char,

    /// Empty a file whose header does not match instead of writing a suffixed file
    #[arg(long)]
    pub truncate_on_mismatch: bool,

    /// Write to a suffixed file when an existing header cannot be read
    #[arg(long)]
    pub rotate_unreadable: bool,

    /// Omit the Timestamp column
    #[arg(long)]
    pub no_timestamp: bool,

    /// Omit the Level column
    #[arg(long)]
    pub no_level: bool,

    /// Omit the Caller column
    #[arg(long)]
    pub no_caller: bool,

    /// Omit the Error column
    #[arg(long)]
    pub no_error: bool,
}

impl CsvArgs {
    pub fn config(&self) -> CsvConfig {
        CsvConfig {
            delimiter: self.delimiter,
            truncate_on_mismatch: self.truncate_on_mismatch,
            parts: OptionalParts {
                timestamp: !self.no_timestamp,
                level: !self.no_level,
                caller: !self.no_caller,
                error: !self.no_error,
            },
            scan_failure: if self.rotate_unreadable {
                ScanFailurePolicy::Rotate
            } else {
                ScanFailurePolicy::Accept
            },
            ..CsvConfig::default()
        }
    }
}
