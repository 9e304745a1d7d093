//! Tagged logger
//!
//! A [`TaggedLogger`] pairs a [`Tag`] with a [`TaggedWriteFilter`] registered
//! on a [`SharedEmitter`]. Lines logged through [`TaggedLogger::log_tag`]
//! carry the tag and reach only this logger's sink, even when many loggers
//! share the same emitter.

use std::error::Error as StdError;
use std::io::{self, Write};
use std::panic::Location;

use serde::{Deserialize, Serialize};
use taglog_utils::Result;

use crate::emitter::{
    delimiter_byte, Emitter, Fields, Formatters, Part, Record, SharedEmitter, SinkId, DEFAULT_TIME_FORMAT,
};
use crate::filter::{Tag, TaggedWriteFilter};
use crate::level::Level;

/// Optional head-of-line parts and the error column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionalParts {
    pub timestamp: bool,
    pub level: bool,
    pub caller: bool,
    pub error: bool,
}

impl Default for OptionalParts {
    fn default() -> Self {
        Self {
            timestamp: true,
            level: true,
            caller: true,
            error: true,
        }
    }
}

impl OptionalParts {
    /// Only the message
    pub fn none() -> Self {
        Self {
            timestamp: false,
            level: false,
            caller: false,
            error: false,
        }
    }

    /// Disable the formatters of every part switched off here
    pub fn apply(&self, mut formatters: Formatters) -> Formatters {
        if !self.timestamp {
            formatters.timestamp = None;
        }
        if !self.level {
            formatters.level = None;
        }
        if !self.caller {
            formatters.caller = None;
        }
        if !self.error {
            formatters.err_name = None;
            formatters.err_value = None;
        }
        formatters
    }
}

/// Options shared by every tagged logger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggedOptions {
    pub delimiter: char,
    pub parts: OptionalParts,
    pub min_level: Level,
    /// chrono `strftime` layout of the timestamp part
    pub time_format: String,
}

impl Default for TaggedOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            parts: OptionalParts::default(),
            min_level: Level::Trace,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

impl TaggedOptions {
    pub fn validate(&self) -> Result<()> {
        delimiter_byte(self.delimiter)?;
        Ok(())
    }

    /// Build an emitter for these options around `formatters`
    pub fn emitter(&self, formatters: Formatters) -> Result<SharedEmitter> {
        self.validate()?;
        let emitter = Emitter::new(self.parts.apply(formatters), self.delimiter)
            .with_min_level(self.min_level)
            .with_time_format(self.time_format.clone());
        Ok(SharedEmitter::new(emitter))
    }
}

/// A logical logger sharing a formatting front end with others
#[derive(Debug)]
pub struct TaggedLogger {
    emitter: SharedEmitter,
    tag: Tag,
    sink: SinkId,
    delimiter: char,
}

impl TaggedLogger {
    /// Own emitter with the delimited formatter preset
    pub fn new<W>(prefix: &str, sink: W, options: &TaggedOptions) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        Self::with_formatters(prefix, sink, options, Formatters::delimited(options.delimiter))
    }

    /// Own emitter with custom formatters; `options.parts` still switches parts off
    pub fn with_formatters<W>(prefix: &str, sink: W, options: &TaggedOptions, formatters: Formatters) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let emitter = options.emitter(formatters)?;
        Self::attach(&emitter, prefix, sink)
    }

    /// Join an existing emitter. Tagged lines of other loggers attached to
    /// it never reach `sink`.
    pub fn attach<W>(emitter: &SharedEmitter, prefix: &str, sink: W) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let delimiter = emitter.delimiter();
        let filter = TaggedWriteFilter::new(prefix, delimiter, sink)?;
        let tag = filter.tag().clone();
        let sink = emitter.add_sink(filter);

        Ok(Self {
            emitter: emitter.clone(),
            tag,
            sink,
            delimiter,
        })
    }

    /// Log to stderr
    pub fn console(prefix: &str, options: &TaggedOptions) -> Result<Self> {
        Self::new(prefix, io::stderr(), options)
    }

    /// Log a line that only this logger's sink receives
    #[track_caller]
    pub fn log_tag(&self, level: Level, msg: &str, err: Option<&dyn StdError>) -> Result<()> {
        let message = format!("{}{} {}", msg, self.delimiter, self.tag);
        let record = Record::new(level, &message)
            .with_error(err)
            .with_caller(Location::caller());
        self.emitter.emit(&record)?;
        Ok(())
    }

    /// Log an untagged line. Only mirror sinks added with
    /// [`TaggedLogger::add_sink`] see it.
    #[track_caller]
    pub fn log(&self, level: Level, msg: &str, fields: Fields<'_>) -> Result<()> {
        let record = Record::new(level, msg)
            .with_fields(fields)
            .with_caller(Location::caller());
        self.emitter.emit(&record)?;
        Ok(())
    }

    #[track_caller]
    pub fn trace(&self, msg: &str) -> Result<()> {
        self.log(Level::Trace, msg, &[])
    }

    #[track_caller]
    pub fn debug(&self, msg: &str) -> Result<()> {
        self.log(Level::Debug, msg, &[])
    }

    #[track_caller]
    pub fn info(&self, msg: &str) -> Result<()> {
        self.log(Level::Info, msg, &[])
    }

    #[track_caller]
    pub fn warn(&self, msg: &str) -> Result<()> {
        self.log(Level::Warn, msg, &[])
    }

    #[track_caller]
    pub fn error(&self, msg: &str) -> Result<()> {
        self.log(Level::Error, msg, &[])
    }

    /// Add a sink that receives every line of the emitter untouched
    pub fn add_sink<W>(&self, sink: W) -> SinkId
    where
        W: Write + Send + 'static,
    {
        self.emitter.add_sink(sink)
    }

    pub fn is_timestamp_enabled(&self) -> bool {
        self.emitter.is_enabled(Part::Timestamp)
    }

    pub fn is_level_enabled(&self) -> bool {
        self.emitter.is_enabled(Part::Level)
    }

    pub fn is_caller_enabled(&self) -> bool {
        self.emitter.is_enabled(Part::Caller)
    }

    pub fn is_error_enabled(&self) -> bool {
        self.emitter.is_error_enabled()
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn emitter(&self) -> &SharedEmitter {
        &self.emitter
    }

    /// Unregister this logger's filter and flush its sink
    pub fn detach(self) -> Result<()> {
        if let Some(mut sink) = self.emitter.remove_sink(self.sink) {
            sink.flush()?;
        }
        Ok(())
    }
}

impl Drop for TaggedLogger {
    fn drop(&mut self) {
        self.emitter.remove_sink(self.sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    fn message_only() -> TaggedOptions {
        TaggedOptions {
            parts: OptionalParts {
                error: true,
                ..OptionalParts::none()
            },
            ..TaggedOptions::default()
        }
    }

    // ==================== Options Tests ====================

    #[test]
    fn test_default_options() {
        let options = TaggedOptions::default();
        assert_eq!(options.delimiter, ',');
        assert_eq!(options.parts, OptionalParts::default());
        assert_eq!(options.min_level, Level::Trace);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_reject_bad_delimiter() {
        let options = TaggedOptions {
            delimiter: ' ',
            ..TaggedOptions::default()
        };
        assert!(options.validate().is_err());
        assert!(TaggedLogger::new("x", Capture::default(), &options).is_err());
    }

    #[test]
    fn test_options_serde_defaults() {
        let options: TaggedOptions = serde_json::from_str(r#"{"delimiter": ";", "parts": {"caller": false}}"#).unwrap();
        assert_eq!(options.delimiter, ';');
        assert!(options.parts.timestamp);
        assert!(!options.parts.caller);
        assert_eq!(options.time_format, DEFAULT_TIME_FORMAT);
    }

    #[test]
    fn test_parts_apply() {
        let f = OptionalParts::none().apply(Formatters::delimited(','));
        assert!(!f.is_enabled(Part::Timestamp));
        assert!(!f.is_enabled(Part::Level));
        assert!(!f.is_enabled(Part::Caller));
        assert!(f.is_enabled(Part::Message));
        assert!(!f.is_error_enabled());
    }

    // ==================== log_tag Tests ====================

    #[test]
    fn test_log_tag_strips_tag() {
        let sink = Capture::default();
        let logger = TaggedLogger::new("t", sink.clone(), &message_only()).unwrap();

        logger.log_tag(Level::Info, "hello", None).unwrap();
        assert_eq!(sink.text(), "hello\n");
    }

    #[test]
    fn test_log_tag_with_error() {
        let sink = Capture::default();
        let logger = TaggedLogger::new("t", sink.clone(), &message_only()).unwrap();
        let err = io::Error::new(io::ErrorKind::Other, "boom");

        logger.log_tag(Level::Error, "failed", Some(&err)).unwrap();
        assert_eq!(sink.text(), "failed, error=boom\n");
    }

    #[test]
    fn test_log_tag_full_line() {
        let sink = Capture::default();
        let logger = TaggedLogger::new("t", sink.clone(), &TaggedOptions::default()).unwrap();

        logger.log_tag(Level::Info, "hello", None).unwrap();
        let text = sink.text();
        assert!(text.contains(" INF, "), "{}", text);
        assert!(text.contains("tagged.rs:"), "{}", text);
        assert!(text.ends_with(", hello\n"), "{}", text);
        assert!(!text.contains("tag="));
    }

    #[test]
    fn test_log_tag_respects_min_level() {
        let sink = Capture::default();
        let options = TaggedOptions {
            min_level: Level::Warn,
            ..message_only()
        };
        let logger = TaggedLogger::new("t", sink.clone(), &options).unwrap();

        logger.log_tag(Level::Debug, "quiet", None).unwrap();
        logger.log_tag(Level::Warn, "loud", None).unwrap();
        assert_eq!(sink.text(), "loud\n");
    }

    // ==================== Multiplexing Tests ====================

    #[test]
    fn test_attached_loggers_only_see_their_lines() {
        let emitter = message_only().emitter(Formatters::delimited(',')).unwrap();
        let a_sink = Capture::default();
        let b_sink = Capture::default();
        let a = TaggedLogger::attach(&emitter, "a", a_sink.clone()).unwrap();
        let b = TaggedLogger::attach(&emitter, "b", b_sink.clone()).unwrap();

        a.log_tag(Level::Info, "from a", None).unwrap();
        b.log_tag(Level::Info, "from b", None).unwrap();
        a.log_tag(Level::Info, "again a", None).unwrap();

        assert_eq!(a_sink.text(), "from a\nagain a\n");
        assert_eq!(b_sink.text(), "from b\n");
        assert_ne!(a.tag(), b.tag());
    }

    #[test]
    fn test_untagged_lines_reach_mirror_only() {
        let filtered = Capture::default();
        let mirror = Capture::default();
        let logger = TaggedLogger::new("t", filtered.clone(), &message_only()).unwrap();
        logger.add_sink(mirror.clone());

        logger.info("plain").unwrap();
        logger.log_tag(Level::Info, "tagged", None).unwrap();

        assert_eq!(filtered.text(), "tagged\n");
        let mirrored = mirror.text();
        assert!(mirrored.starts_with("plain,\n"));
        assert!(mirrored.contains(logger.tag().as_str()));
    }

    #[test]
    fn test_log_with_fields() {
        let mirror = Capture::default();
        let logger = TaggedLogger::new("t", io::sink(), &message_only()).unwrap();
        logger.add_sink(mirror.clone());
        let port = 8080;
        let fields: [(&str, &dyn std::fmt::Display); 1] = [("port", &port)];

        logger.log(Level::Info, "listening", &fields).unwrap();
        assert_eq!(mirror.text(), "listening, port=8080,\n");
    }

    #[test]
    fn test_detach_stops_delivery() {
        let emitter = message_only().emitter(Formatters::delimited(',')).unwrap();
        let a_sink = Capture::default();
        let a = TaggedLogger::attach(&emitter, "a", a_sink.clone()).unwrap();
        let b = TaggedLogger::attach(&emitter, "b", Capture::default()).unwrap();
        assert_eq!(emitter.sink_count(), 2);

        a.detach().unwrap();
        assert_eq!(emitter.sink_count(), 1);
        b.log_tag(Level::Info, "after", None).unwrap();
        assert_eq!(a_sink.text(), "");
    }

    #[test]
    fn test_drop_unregisters_filter() {
        let emitter = message_only().emitter(Formatters::delimited(',')).unwrap();
        {
            let _logger = TaggedLogger::attach(&emitter, "a", Capture::default()).unwrap();
            assert_eq!(emitter.sink_count(), 1);
        }
        assert_eq!(emitter.sink_count(), 0);
    }

    // ==================== Accessor Tests ====================

    #[test]
    fn test_enabled_parts_reflect_options() {
        let logger = TaggedLogger::new("t", io::sink(), &message_only()).unwrap();
        assert!(!logger.is_timestamp_enabled());
        assert!(!logger.is_level_enabled());
        assert!(!logger.is_caller_enabled());
        assert!(logger.is_error_enabled());

        let full = TaggedLogger::new("t", io::sink(), &TaggedOptions::default()).unwrap();
        assert!(full.is_timestamp_enabled() && full.is_level_enabled() && full.is_caller_enabled());
    }

    #[test]
    fn test_console_logger() {
        let logger = TaggedLogger::console("console", &TaggedOptions::default()).unwrap();
        assert_eq!(logger.delimiter(), ',');
        assert!(logger.tag().as_str().starts_with("tag=console-"));
    }
}
