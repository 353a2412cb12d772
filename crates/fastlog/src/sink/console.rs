//! Terminal output colored by the severity tag of each line.

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use super::Sink;
use crate::{LogLine, Severity, SinkError};

/// Writes lines to a terminal, coloring errors red and info lines cyan.
///
/// The color is reset after every line. Trace lines and banners use the terminal's default
/// color. On writers that do not support color the line is written plainly.
#[derive(Debug)]
pub struct ConsoleSink<W> {
    out: W,
}

impl ConsoleSink<StandardStream> {
    /// A sink writing to standard output, with color enabled unless the environment disables it.
    pub fn stdout() -> Self {
        Self::new(StandardStream::stdout(ColorChoice::Auto))
    }
}

impl<W: WriteColor + Send> ConsoleSink<W> {
    /// Creates a sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Consumes the sink, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn color_for(severity: Option<Severity>) -> Option<ColorSpec> {
        let color = match severity? {
            Severity::Error => Color::Red,
            Severity::Info => Color::Cyan,
            Severity::Trace => return None,
        };
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color));
        Some(spec)
    }
}

impl<W: WriteColor + Send> Sink for ConsoleSink<W> {
    fn write_line(&mut self, line: &LogLine) -> Result<(), SinkError> {
        let colored = Self::color_for(line.severity())
            .filter(|_| self.out.supports_color())
            .is_some_and(|spec| self.out.set_color(&spec).is_ok());

        let written = self.out.write_all(line.as_bytes());
        if colored {
            let _ = self.out.reset();
        }
        written?;
        self.out.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.out.flush();
    }
}
