//! Fully formatted log lines, as carried by the queue.

use time::{format_description::BorrowedFormatItem, macros::format_description, UtcDateTime};

use crate::Severity;

/// Line terminator of every entry written to a sink.
pub(crate) const LINE_ENDING: &str = "\r\n";

/// Timestamp format of the startup and shutdown banners (`yyyy-MM-dd HH:mm:ss.fff`).
const BANNER_TIMESTAMP: &[BorrowedFormatItem<'static>] = format_description!(
    version = 2,
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
);

const STARTUP_RULE: &str = "-------------------------------------------------";
const SHUTDOWN_RULE: &str = "---------------------------------------------------";

/// An immutable, terminated line of text ready for output.
///
/// Lines are produced by the [`Formatter`](crate::Formatter) (or as banners), consumed exactly
/// once by the writer, and never mutated in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    text: String,
    tag_offset: Option<usize>,
}

impl LogLine {
    /// Wraps an already formatted line whose severity tag starts at byte `tag_offset`.
    pub(crate) fn tagged(text: String, tag_offset: usize) -> Self {
        Self {
            text,
            tag_offset: Some(tag_offset),
        }
    }

    /// Wraps text that carries no severity tag.
    pub(crate) fn untagged(text: String) -> Self {
        Self {
            text,
            tag_offset: None,
        }
    }

    /// The `Logging system is initialized` banner.
    pub fn startup_banner(now: UtcDateTime) -> Self {
        Self::banner(STARTUP_RULE, now, "Logging system is initialized")
    }

    /// The `Logging system is shutting down` banner.
    pub fn shutdown_banner(now: UtcDateTime) -> Self {
        Self::banner(SHUTDOWN_RULE, now, "Logging system is shutting down")
    }

    fn banner(rule: &str, now: UtcDateTime, message: &str) -> Self {
        let timestamp = now.format(BANNER_TIMESTAMP).unwrap_or_default();
        Self::untagged(format!(
            "{rule}{LINE_ENDING}{timestamp} {message}{LINE_ENDING}{rule}{LINE_ENDING}"
        ))
    }

    /// The full text of the line, including the terminator.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The raw bytes of the line.
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// The severity tag embedded in the line, if any.
    pub fn tag(&self) -> Option<&str> {
        let start = self.tag_offset?;
        self.text.get(start..start.checked_add(Severity::TAG_LEN)?)
    }

    /// The severity encoded by the embedded tag; `None` for banners.
    pub fn severity(&self) -> Option<Severity> {
        self.tag().and_then(Severity::from_tag)
    }
}
