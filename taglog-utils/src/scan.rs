//! Line-range text scanning
//!
//! Checks whether a file contains a set of substrings within a range of
//! lines. Used to validate CSV header rows without reading whole files.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Scan lines `start_line..=end_line` (1-based) of `path` for each needle.
///
/// `end_line == 0` scans to the end of the file. A `start_line` past
/// `end_line` collapses the range to the single line `start_line`.
/// Lines are compared as raw bytes, so content that is not UTF-8 is
/// searched like any other; only read failures are errors.
/// Returns one flag per needle, in order.
pub fn contains_text<P, S>(path: P, start_line: u64, end_line: u64, needles: &[S]) -> io::Result<Vec<bool>>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let mut reader = BufReader::new(File::open(path)?);
    let start_line = start_line.max(1);
    let end_line = if end_line > 0 && start_line > end_line {
        start_line
    } else {
        end_line
    };

    let mut found = vec![false; needles.len()];
    let mut line = Vec::new();
    let mut line_no = 0u64;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        line_no += 1;

        if line_no >= start_line {
            let text = trim_line_end(&line);
            for (hit, needle) in found.iter_mut().zip(needles) {
                if !*hit {
                    *hit = contains_bytes(text, needle.as_ref().as_bytes());
                }
            }
        }

        if end_line > 0 && line_no >= end_line {
            break;
        }
    }

    Ok(found)
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

/// True if every needle occurs within the line range
pub fn contains_all_texts<P, S>(path: P, start_line: u64, end_line: u64, needles: &[S]) -> io::Result<bool>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    Ok(contains_text(path, start_line, end_line, needles)?
        .into_iter()
        .all(|hit| hit))
}
