//! The three fixed severities understood by the logger.

use std::fmt;

/// Severity of a log line.
///
/// Each severity has its own runtime toggle in [`Settings`](crate::Settings);
/// a disabled severity produces no line at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Progress and state information.
    Info,

    /// Failures worth attention.
    Error,

    /// Verbose diagnostics, annotated with the call site.
    Trace,
}

impl Severity {
    /// Width in bytes of every severity tag.
    pub const TAG_LEN: usize = 3;

    /// The three-character tag embedded in formatted lines.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Info => "INF",
            Self::Error => "ERR",
            Self::Trace => "TRC",
        }
    }

    /// Parses a tag back into a severity.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "INF" => Some(Self::Info),
            "ERR" => Some(Self::Error),
            "TRC" => Some(Self::Trace),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_back() {
        for severity in [Severity::Info, Severity::Error, Severity::Trace] {
            assert_eq!(severity.tag().len(), Severity::TAG_LEN);
            assert_eq!(Severity::from_tag(severity.tag()), Some(severity));
        }
        assert_eq!(Severity::from_tag("WRN"), None);
        assert_eq!(Severity::from_tag("inf"), None);
    }
}
