//! Destinations of formatted lines.
//!
//! Sinks are owned and driven exclusively by the writer thread, so they need no locking.

mod console;
mod file;
mod memory;

pub use self::{
    console::ConsoleSink,
    file::{default_log_directory, FileSink},
    memory::MemorySink,
};
use crate::{LogLine, SinkError};

/// A destination that accepts formatted lines.
pub trait Sink: Send {
    /// Writes one line.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the line could not be written; the writer treats this as
    /// unrecoverable.
    fn write_line(&mut self, line: &LogLine) -> Result<(), SinkError>;

    /// Flushes and releases any held resources. Further writes may reopen them.
    fn close(&mut self) {}
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write_line(&mut self, line: &LogLine) -> Result<(), SinkError> {
        (**self).write_line(line)
    }

    fn close(&mut self) {
        (**self).close();
    }
}
