//! Command execution

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use taglog::{escape_str, resolve_incremental_path, CsvLogger, Result};
use tracing::{debug, warn};

use crate::cli::{Command, CsvArgs};

const DEFAULT_CSV_FILE: &str = "taglog.csv";

pub fn execute(command: Command) -> Result<()> {
    match command {
        Command::Csv { path, options } => {
            let path = path.unwrap_or_else(default_csv_path);
            let resolved = csv(&path, &options, io::stdin().lock())?;
            println!("{}", resolved.display());
        }
        Command::Resolve { path } => {
            let resolved = resolve_incremental_path(&path, |_, meta| meta.is_some());
            println!("{}", resolved.display());
        }
        Command::Escape { value, delimiter } => {
            let delimiter = taglog::emitter::delimiter_byte(delimiter)?;
            println!("{}", escape_str(&value, delimiter));
        }
    }
    Ok(())
}

fn default_csv_path() -> PathBuf {
    taglog_utils::csv_dir().join(DEFAULT_CSV_FILE)
}

/// Append the rows read from `input` and return the file written
fn csv<R: BufRead>(path: &Path, options: &CsvArgs, input: R) -> Result<PathBuf> {
    let logger = CsvLogger::new(path, options.columns.as_slice(), options.config())?;
    let rows = append_rows(&logger, input)?;
    debug!(rows, path = %logger.file_name().display(), "appended rows");

    let resolved = logger.file_name().to_path_buf();
    logger.close()?;
    Ok(resolved)
}

fn append_rows<R: BufRead>(logger: &CsvLogger, input: R) -> Result<usize> {
    let delimiter = logger.config().delimiter;
    let mut rows = 0;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let values: Vec<&str> = line.split(delimiter).map(str::trim).collect();
        if values.len() != logger.columns().len() {
            warn!(
                expected = logger.columns().len(),
                got = values.len(),
                "row does not match the column count"
            );
        }
        logger.csv(values.as_slice())?;
        rows += 1;
    }

    Ok(rows)
}
