//! Turns a severity, a timestamp and caller-supplied text into a [`LogLine`].

use std::{
    fmt::{self, Display, Write as _},
    panic::Location,
    path::Path,
    sync::Arc,
};

use time::UtcDateTime;

use crate::{line::LINE_ENDING, Clock, FormatError, LogLine, Settings, Severity};

/// Location of a logging call, captured at compile time with [`call_site!`](crate::call_site).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// Source file path, as reported by `file!()`.
    pub file: &'static str,

    /// Enclosing member, as reported by `module_path!()`.
    pub member: &'static str,

    /// Source line number.
    pub line: u32,
}

impl CallSite {
    /// Member recorded by [`caller`](Self::caller), which has no access to `module_path!()`.
    pub const UNKNOWN_MEMBER: &'static str = "<unknown>";

    /// The file and line of the caller, as tracked through `#[track_caller]` functions.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            member: Self::UNKNOWN_MEMBER,
            line: location.line(),
        }
    }

    /// The file name component of the source path.
    pub fn file_name(&self) -> &str {
        Path::new(self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.file)
    }
}

impl Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}[{}]", self.file_name(), self.member, self.line)
    }
}

/// Substitutes positional arguments into a composite template.
///
/// Placeholders take the form `{index}` or `{index,alignment}`; a positive alignment pads on
/// the left, a negative one on the right, and widths beyond `u16::MAX` are rejected. `{{` and
/// `}}` produce literal braces.
///
/// With no arguments the template is returned verbatim and never parsed, so text such as
/// `"100% {done}"` is safe to log without substitution.
///
/// # Errors
///
/// Returns a [`FormatError`] if the template is malformed or refers to a missing argument.
///
/// ```
/// use fastlog::format_template;
///
/// assert_eq!(format_template("fail: {0}", &[&"disk full"]).unwrap(), "fail: disk full");
/// assert_eq!(format_template("[{0,4}|{1,-3}]", &[&7, &"a"]).unwrap(), "[   7|a  ]");
/// assert_eq!(format_template("100% {done}", &[]).unwrap(), "100% {done}");
/// assert!(format_template("{1}", &[&"only one"]).is_err());
/// ```
pub fn format_template(template: &str, args: &[&dyn Display]) -> Result<String, FormatError> {
    if args.is_empty() {
        return Ok(template.to_owned());
    }

    let mut output = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' if chars.next_if(|&(_, next)| next == '{').is_some() => output.push('{'),
            '}' if chars.next_if(|&(_, next)| next == '}').is_some() => output.push('}'),
            '}' => return Err(FormatError::UnescapedClosingBrace { position }),
            '{' => {
                let mut body = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, inner)) => body.push(inner),
                        None => return Err(FormatError::UnterminatedPlaceholder { position }),
                    }
                }
                write_placeholder(&mut output, &body, args)?;
            }
            other => output.push(other),
        }
    }

    Ok(output)
}

fn write_placeholder(
    output: &mut String,
    body: &str,
    args: &[&dyn Display],
) -> Result<(), FormatError> {
    let (head, specifier) = match body.split_once(':') {
        Some((head, specifier)) => (head, Some(specifier)),
        None => (body, None),
    };
    if let Some(specifier) = specifier {
        return Err(FormatError::UnsupportedSpecifier {
            specifier: specifier.to_owned(),
        });
    }

    let (index, alignment) = match head.split_once(',') {
        Some((index, alignment)) => (index, Some(alignment)),
        None => (head, None),
    };
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| FormatError::InvalidIndex {
            index: index.to_owned(),
        })?;
    let arg = args.get(index).ok_or(FormatError::IndexOutOfRange {
        index,
        count: args.len(),
    })?;

    // Writing into a `String` cannot fail.
    let _ = match alignment {
        None => write!(output, "{arg}"),
        Some(alignment) => {
            let invalid = || FormatError::InvalidAlignment {
                alignment: alignment.to_owned(),
            };
            let width: i64 = alignment.trim().parse().map_err(|_| invalid())?;
            let pad = u16::try_from(width.unsigned_abs())
                .map(usize::from)
                .map_err(|_| invalid())?;
            if width < 0 {
                write!(output, "{arg:<pad$}")
            } else {
                write!(output, "{arg:>pad$}")
            }
        }
    };

    Ok(())
}

/// Assembles log lines from the current settings and clock.
///
/// Line layout: `<timestamp> <TAG> <body>\r\n`, and for trace lines
/// `<timestamp> TRC <file>:<member>[<line>] <body>\r\n`.
#[derive(Clone)]
pub struct Formatter {
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatter")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Formatter {
    /// Creates a formatter reading `settings` and `clock` on every call.
    pub fn new(settings: Arc<Settings>, clock: Arc<dyn Clock>) -> Self {
        Self { settings, clock }
    }

    /// The current time according to the formatter's clock.
    pub fn now(&self) -> UtcDateTime {
        self.clock.now()
    }

    /// Formats an info or error line from a template and positional arguments.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if substitution or timestamp rendering fails.
    pub fn format_template(
        &self,
        severity: Severity,
        template: &str,
        args: &[&dyn Display],
    ) -> Result<LogLine, FormatError> {
        let body = format_template(template, args)?;
        self.format_line(severity, &body)
    }

    /// Formats a line whose body is already rendered.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Timestamp`] if the timestamp cannot be rendered.
    pub fn format_line(
        &self,
        severity: Severity,
        body: impl Display,
    ) -> Result<LogLine, FormatError> {
        let timestamp = self.settings.format_timestamp(self.clock.now())?;
        let tag_offset = timestamp.len() + 1;
        let text = format!("{timestamp} {severity} {body}{LINE_ENDING}");
        Ok(LogLine::tagged(text, tag_offset))
    }

    /// Formats a trace line annotated with the call site.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Timestamp`] if the timestamp cannot be rendered.
    pub fn format_trace(
        &self,
        call_site: &CallSite,
        body: impl Display,
    ) -> Result<LogLine, FormatError> {
        self.format_line(Severity::Trace, format_args!("{call_site} {body}"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use time::macros::utc_datetime;

    use super::*;
    use crate::{LoggerConfig, ManualClock};

    fn formatter() -> Formatter {
        let settings = Arc::new(Settings::from_config(&LoggerConfig::default()).unwrap());
        let clock = Arc::new(ManualClock::new(utc_datetime!(2024-06-30 21:15:03.042)));
        Formatter::new(settings, clock)
    }

    #[test]
    fn zero_arguments_is_verbatim() {
        assert_eq!(format_template("100% {done}", &[]).unwrap(), "100% {done}");
        assert_eq!(format_template("}{", &[]).unwrap(), "}{");
    }

    #[test]
    fn substitutes_positionally() {
        let out = format_template("{1} before {0}, {1} again", &[&"a", &2]).unwrap();
        assert_eq!(out, "2 before a, 2 again");
        assert_eq!(format_template("{{{0}}}", &[&"x"]).unwrap(), "{x}");
        assert_eq!(format_template("[{0,65535}]", &[&"x"]).unwrap().len(), 65_537);
    }

    #[test]
    fn rejects_malformed_templates() {
        let args: &[&dyn Display] = &[&1];
        assert_eq!(
            format_template("oops {0", args),
            Err(FormatError::UnterminatedPlaceholder { position: 5 })
        );
        assert_eq!(
            format_template("a } b", args),
            Err(FormatError::UnescapedClosingBrace { position: 2 })
        );
        assert_eq!(
            format_template("{done}", args),
            Err(FormatError::InvalidIndex {
                index: "done".to_owned()
            })
        );
        assert_eq!(
            format_template("{3}", args),
            Err(FormatError::IndexOutOfRange { index: 3, count: 1 })
        );
        assert!(matches!(
            format_template("{0,wide}", args),
            Err(FormatError::InvalidAlignment { .. })
        ));
        assert_eq!(
            format_template("{0,-70000}", args),
            Err(FormatError::InvalidAlignment {
                alignment: "-70000".to_owned()
            })
        );
        assert!(matches!(
            format_template("{0:N2}", args),
            Err(FormatError::UnsupportedSpecifier { .. })
        ));
    }

    #[test]
    fn lays_out_info_and_error_lines() {
        let formatter = formatter();
        assert_eq!(formatter.now(), utc_datetime!(2024-06-30 21:15:03.042));

        let info = formatter
            .format_template(Severity::Info, "build ok", &[])
            .unwrap();
        assert_eq!(info.text(), "21:15:03.042 INF build ok\r\n");
        assert_eq!(info.severity(), Some(Severity::Info));

        let error = formatter
            .format_template(Severity::Error, "fail: {0}", &[&"disk full"])
            .unwrap();
        assert_eq!(error.text(), "21:15:03.042 ERR fail: disk full\r\n");
    }

    #[test]
    fn trace_lines_carry_file_name_member_and_line() {
        let call_site = CallSite {
            file: "src/net/listener.rs",
            member: "app::net::listener",
            line: 42,
        };
        let line = formatter().format_trace(&call_site, "accepted").unwrap();
        assert_eq!(
            line.text(),
            "21:15:03.042 TRC listener.rs:app::net::listener[42] accepted\r\n"
        );
        assert_eq!(line.severity(), Some(Severity::Trace));
    }

    #[test]
    fn caller_records_file_and_line() {
        let call_site = CallSite::caller();
        assert_eq!(call_site.line, line!() - 1);
        assert_eq!(call_site.file_name(), "formatter.rs");
        assert_eq!(call_site.member, CallSite::UNKNOWN_MEMBER);
    }

    #[test]
    fn tag_offset_follows_timestamp_format() {
        let formatter = formatter();
        formatter
            .settings
            .set_timestamp_format("[year]-[month]-[day] [hour]:[minute]")
            .unwrap();
        let line = formatter.format_line(Severity::Error, "x").unwrap();
        assert_eq!(line.text(), "2024-06-30 21:15 ERR x\r\n");
        assert_eq!(line.severity(), Some(Severity::Error));
    }
}
