//! Structured record emitter
//!
//! The single formatting front end shared by tagged loggers. A [`Record`]
//! is turned into one text line by per-part [`Formatters`] and the line is
//! written, unchanged, to every registered sink. Sinks decide for
//! themselves what to keep (see [`crate::filter::TaggedWriteFilter`]).
//!
//! Line layout, with disabled parts skipped:
//!
//! ```text
//! <timestamp> <level> <caller> <message>[ <name><value>]...[ <errname><errvalue>]\n
//! ```

use std::error::Error as StdError;
use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::panic::Location;
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use taglog_utils::{Result, TaglogError};

use crate::level::Level;

/// Default timestamp layout (`2024-05-01 13:45:12.345`)
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Name handed to the error-name formatter
pub const ERROR_FIELD_NAME: &str = "error";

/// Callback rendering one part of a record
pub type FieldFormatter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Key-value pairs attached to a record
pub type Fields<'a> = &'a [(&'a str, &'a dyn fmt::Display)];

/// Build a [`FieldFormatter`] from a closure
pub fn formatter<F>(f: F) -> FieldFormatter
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Validate a delimiter and return it as a byte.
///
/// The write filter matches the delimiter byte-wise, so it must be a
/// single ASCII character. Whitespace and `"` are reserved by the line
/// layout and CSV quoting.
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() || delimiter.is_ascii_whitespace() || delimiter == '"' {
        return Err(TaglogError::config(format!(
            "Invalid delimiter {:?}: must be a single ASCII character other than whitespace or '\"'",
            delimiter
        )));
    }
    Ok(delimiter as u8)
}

/// Head-of-line parts, emitted in a configurable order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    Timestamp,
    Level,
    Caller,
    Message,
}

pub const DEFAULT_PARTS_ORDER: [Part; 4] = [Part::Timestamp, Part::Level, Part::Caller, Part::Message];

/// Per-part formatting callbacks. `None` disables the part.
#[derive(Clone, Default)]
pub struct Formatters {
    pub timestamp: Option<FieldFormatter>,
    pub level: Option<FieldFormatter>,
    pub caller: Option<FieldFormatter>,
    pub message: Option<FieldFormatter>,
    pub field_name: Option<FieldFormatter>,
    pub field_value: Option<FieldFormatter>,
    pub err_name: Option<FieldFormatter>,
    pub err_value: Option<FieldFormatter>,
}

impl Formatters {
    /// Every part enabled, each value followed by `delimiter`.
    /// Fields render as `name=value<delimiter>`, the error as
    /// `error=message<delimiter>`.
    pub fn delimited(delimiter: char) -> Self {
        let suffixed = move || formatter(move |v| format!("{}{}", v, delimiter));
        let named = || formatter(|name| format!("{}=", name));

        Self {
            timestamp: Some(suffixed()),
            level: Some(formatter(move |v| format!("{}{}", short_level(v), delimiter))),
            caller: Some(formatter(move |v| format!("{} >{}", v, delimiter))),
            message: Some(suffixed()),
            field_name: Some(named()),
            field_value: Some(suffixed()),
            err_name: Some(named()),
            err_value: Some(suffixed()),
        }
    }

    pub fn is_enabled(&self, part: Part) -> bool {
        match part {
            Part::Timestamp => self.timestamp.is_some(),
            Part::Level => self.level.is_some(),
            Part::Caller => self.caller.is_some(),
            Part::Message => self.message.is_some(),
        }
    }

    pub fn is_error_enabled(&self) -> bool {
        self.err_value.is_some()
    }

    pub fn without_fields(mut self) -> Self {
        self.field_name = None;
        self.field_value = None;
        self
    }

    fn for_part(&self, part: Part) -> Option<&FieldFormatter> {
        match part {
            Part::Timestamp => self.timestamp.as_ref(),
            Part::Level => self.level.as_ref(),
            Part::Caller => self.caller.as_ref(),
            Part::Message => self.message.as_ref(),
        }
    }
}

impl fmt::Debug for Formatters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatters")
            .field("timestamp", &self.timestamp.is_some())
            .field("level", &self.level.is_some())
            .field("caller", &self.caller.is_some())
            .field("message", &self.message.is_some())
            .field("field_name", &self.field_name.is_some())
            .field("field_value", &self.field_value.is_some())
            .field("err_name", &self.err_name.is_some())
            .field("err_value", &self.err_value.is_some())
            .finish()
    }
}

/// One log call, before formatting
#[derive(Clone, Copy)]
pub struct Record<'a> {
    pub level: Level,
    pub message: &'a str,
    pub error: Option<&'a (dyn StdError + 'a)>,
    pub caller: Option<&'static Location<'static>>,
    pub fields: Fields<'a>,
}

impl<'a> Record<'a> {
    pub fn new(level: Level, message: &'a str) -> Self {
        Self {
            level,
            message,
            error: None,
            caller: None,
            fields: &[],
        }
    }

    pub fn with_error(mut self, error: Option<&'a (dyn StdError + 'a)>) -> Self {
        self.error = error;
        self
    }

    pub fn with_caller(mut self, caller: &'static Location<'static>) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_fields(mut self, fields: Fields<'a>) -> Self {
        self.fields = fields;
        self
    }
}

/// Handle returned by [`Emitter::add_sink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

type Sink = Box<dyn Write + Send>;

/// Formats records and fans each line out to its sinks
pub struct Emitter {
    formatters: Formatters,
    parts_order: Vec<Part>,
    delimiter: char,
    time_format: String,
    min_level: Level,
    sinks: Vec<(SinkId, Sink)>,
    next_sink: u64,
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("formatters", &self.formatters)
            .field("parts_order", &self.parts_order)
            .field("delimiter", &self.delimiter)
            .field("time_format", &self.time_format)
            .field("min_level", &self.min_level)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Emitter {
    pub fn new(formatters: Formatters, delimiter: char) -> Self {
        Self {
            formatters,
            parts_order: DEFAULT_PARTS_ORDER.to_vec(),
            delimiter,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            min_level: Level::Trace,
            sinks: Vec::new(),
            next_sink: 0,
        }
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// chrono `strftime` layout for the timestamp part
    pub fn with_time_format(mut self, time_format: impl Into<String>) -> Self {
        self.time_format = time_format.into();
        self
    }

    /// Reorder the head-of-line parts. Parts missing from `order` are not emitted.
    pub fn with_parts_order(mut self, order: &[Part]) -> Self {
        let mut parts = Vec::with_capacity(order.len());
        for part in order {
            if !parts.contains(part) {
                parts.push(*part);
            }
        }
        self.parts_order = parts;
        self
    }

    pub fn formatters(&self) -> &Formatters {
        &self.formatters
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn add_sink<W: Write + Send + 'static>(&mut self, sink: W) -> SinkId {
        let id = SinkId(self.next_sink);
        self.next_sink += 1;
        self.sinks.push((id, Box::new(sink)));
        id
    }

    pub fn remove_sink(&mut self, id: SinkId) -> Option<Box<dyn Write + Send>> {
        let index = self.sinks.iter().position(|(sink_id, _)| *sink_id == id)?;
        Some(self.sinks.remove(index).1)
    }

    /// Render a record as one newline-terminated line
    pub fn format(&self, record: &Record<'_>) -> Vec<u8> {
        let mut parts: Vec<String> = Vec::with_capacity(self.parts_order.len());

        for part in &self.parts_order {
            let Some(render) = self.formatters.for_part(*part) else {
                continue;
            };
            let rendered = match part {
                Part::Timestamp => render(&self.timestamp()),
                Part::Level => render(record.level.as_str()),
                Part::Caller => match record.caller {
                    Some(loc) => render(&format!("{}:{}", loc.file(), loc.line())),
                    None => continue,
                },
                Part::Message => render(record.message),
            };
            if !rendered.is_empty() {
                parts.push(rendered);
            }
        }

        let mut line = parts.join(" ");

        if let (Some(name_fmt), Some(value_fmt)) = (&self.formatters.field_name, &self.formatters.field_value) {
            for (name, value) in record.fields {
                let rendered = format!("{}{}", name_fmt(*name), value_fmt(&value.to_string()));
                push_segment(&mut line, &rendered);
            }
        }

        if let (Some(err), Some(value_fmt)) = (record.error, &self.formatters.err_value) {
            let name = self
                .formatters
                .err_name
                .as_ref()
                .map(|f| f(ERROR_FIELD_NAME))
                .unwrap_or_default();
            let rendered = format!("{}{}", name, value_fmt(&err.to_string()));
            push_segment(&mut line, &rendered);
        }

        line.push('\n');
        line.into_bytes()
    }

    /// Format `record` and write it to every sink.
    ///
    /// Every sink is attempted; the first failure is returned. A sink that
    /// accepts fewer bytes than offered is reported as `WriteZero`.
    pub fn emit(&mut self, record: &Record<'_>) -> io::Result<()> {
        if record.level < self.min_level || self.sinks.is_empty() {
            return Ok(());
        }

        let line = self.format(record);
        let mut first_err = None;

        for (_, sink) in &mut self.sinks {
            let result = match sink.write(&line) {
                Ok(n) if n == line.len() => Ok(()),
                Ok(n) => Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {} of {} bytes", n, line.len()),
                )),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        for (_, sink) in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }

    fn timestamp(&self) -> String {
        let now = Local::now();
        let mut rendered = String::new();
        if write!(rendered, "{}", now.format(&self.time_format)).is_err() {
            rendered = now.to_rfc3339();
        }
        rendered
    }
}

/// `info` -> `INF`; input shorter than three characters is uppercased whole
pub fn short_level(level: &str) -> String {
    level.get(..3).unwrap_or(level).to_uppercase()
}

fn push_segment(line: &mut String, segment: &str) {
    if segment.is_empty() {
        return;
    }
    if !line.is_empty() {
        line.push(' ');
    }
    line.push_str(segment);
}

/// An [`Emitter`] shared between loggers.
///
/// The lock is held across the whole format-then-write sequence, so lines
/// from concurrent callers never interleave inside a sink.
#[derive(Debug, Clone)]
pub struct SharedEmitter(Arc<Mutex<Emitter>>);

impl SharedEmitter {
    pub fn new(emitter: Emitter) -> Self {
        Self(Arc::new(Mutex::new(emitter)))
    }

    pub fn emit(&self, record: &Record<'_>) -> io::Result<()> {
        self.0.lock().emit(record)
    }

    pub fn add_sink<W: Write + Send + 'static>(&self, sink: W) -> SinkId {
        self.0.lock().add_sink(sink)
    }

    pub fn remove_sink(&self, id: SinkId) -> Option<Box<dyn Write + Send>> {
        self.0.lock().remove_sink(id)
    }

    pub fn flush(&self) -> io::Result<()> {
        self.0.lock().flush()
    }

    pub fn delimiter(&self) -> char {
        self.0.lock().delimiter()
    }

    pub fn sink_count(&self) -> usize {
        self.0.lock().sink_count()
    }

    /// Snapshot of the formatter set
    pub fn formatters(&self) -> Formatters {
        self.0.lock().formatters().clone()
    }

    pub fn is_enabled(&self, part: Part) -> bool {
        self.0.lock().formatters().is_enabled(part)
    }

    pub fn is_error_enabled(&self) -> bool {
        self.0.lock().formatters().is_error_enabled()
    }
}
