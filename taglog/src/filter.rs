//! Tag-claiming write filter
//!
//! Several loggers can share one [`crate::emitter::Emitter`]. Each of them
//! owns a [`TaggedWriteFilter`] registered as a sink on that emitter and
//! appends its own [`Tag`] to the messages it logs. Every sink receives
//! every line; a filter forwards only lines carrying its tag, with the tag
//! removed and the line end normalised.
//!
//! A tagged line looks like this before filtering (`,` delimiter):
//!
//! ```text
//! 2024-05-01 13:45:12.345, DEB, hello, world, tag=csv-1714..-0, boom,\n
//! ```
//!
//! and like this after:
//!
//! ```text
//! 2024-05-01 13:45:12.345, DEB, hello, world, boom\n
//! ```

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use taglog_utils::{Result, TaglogError};

use crate::emitter::delimiter_byte;

static TAG_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Token identifying the lines of one logger
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    /// `tag=<prefix>-<unix nanos>-<sequence>`.
    ///
    /// The process-wide sequence keeps tags distinct even when the clock
    /// does not advance between two calls.
    pub fn new(prefix: &str) -> Result<Self> {
        if prefix.is_empty() {
            return Err(TaglogError::config("Tag prefix must not be empty"));
        }
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = TAG_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Ok(Self(format!("tag={}-{}-{}", prefix, nanos, seq)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Forwards only the lines that carry its tag.
///
/// `write` always reports the full input length, whether the line was
/// forwarded or dropped, so an emitter checking for short writes never
/// trips over a dropped line. Only the returned error is meaningful.
///
/// The filter rewrites lines in a scratch buffer it owns; `&mut self`
/// restricts it to one writer at a time.
pub struct TaggedWriteFilter<W> {
    tag: Tag,
    delimiter: u8,
    inner: W,
    scratch: Vec<u8>,
}

impl<W: fmt::Debug> fmt::Debug for TaggedWriteFilter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedWriteFilter")
            .field("tag", &self.tag)
            .field("delimiter", &(self.delimiter as char))
            .field("inner", &self.inner)
            .finish()
    }
}

impl<W: Write> TaggedWriteFilter<W> {
    /// Create a filter with a fresh tag built from `prefix`
    pub fn new(prefix: &str, delimiter: char, inner: W) -> Result<Self> {
        Ok(Self {
            tag: Tag::new(prefix)?,
            delimiter: delimiter_byte(delimiter)?,
            inner,
            scratch: Vec::new(),
        })
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn delimiter(&self) -> char {
        self.delimiter as char
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for TaggedWriteFilter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let reported = buf.len();
        let tag = self.tag.as_bytes();

        if rfind_tag(buf, tag, self.delimiter).is_none() {
            return Ok(reported);
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        strip_tag(&mut self.scratch, tag, self.delimiter);
        terminate_line(&mut self.scratch, self.delimiter);

        self.inner.write_all(&self.scratch)?;
        Ok(reported)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Byte offset of the last occurrence of `tag` in `haystack`.
///
/// An occurrence counts only when it ends the buffer or is followed by the
/// delimiter, a space or a line break, so a longer tag that merely starts
/// with ours is not claimed.
fn rfind_tag(haystack: &[u8], tag: &[u8], delimiter: u8) -> Option<usize> {
    if tag.is_empty() || tag.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(tag.len())
        .enumerate()
        .rev()
        .find(|(start, window)| {
            *window == tag
                && match haystack.get(start + tag.len()) {
                    None => true,
                    Some(&b) => b == delimiter || b == b' ' || b == b'\n' || b == b'\r',
                }
        })
        .map(|(start, _)| start)
}

/// Remove every occurrence of `tag`, last first, together with the
/// delimiter directly after it and a single space after that delimiter.
/// Bytes after the removed span are shifted left in place.
fn strip_tag(buf: &mut Vec<u8>, tag: &[u8], delimiter: u8) {
    while let Some(start) = rfind_tag(buf, tag, delimiter) {
        let mut end = start + tag.len();
        if buf.get(end) == Some(&delimiter) {
            end += 1;
            if buf.get(end) == Some(&b' ') {
                end += 1;
            }
        }

        let len = buf.len();
        buf.copy_within(end..len, start);
        buf.truncate(len - (end - start));
    }
}

/// Turn a dangling `<delimiter> ` or `<delimiter>` at the end of the line
/// into the line terminator, and make sure exactly one `\n` ends it.
fn terminate_line(buf: &mut Vec<u8>, delimiter: u8) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.ends_with(&[delimiter, b' ']) {
        buf.truncate(buf.len() - 2);
    } else if buf.last() == Some(&delimiter) {
        buf.pop();
    }
    buf.push(b'\n');
}
