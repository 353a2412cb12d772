//! In-memory sink for tests.

use std::{io, sync::Arc};

use parking_lot::Mutex;

use super::Sink;
use crate::{LogLine, SinkError};

#[derive(Debug, Default)]
struct Captured {
    lines: Vec<String>,
    fail_after: Option<usize>,
    closed: bool,
}

/// A sink that captures written lines in memory.
///
/// Clones share the same buffer, so one clone can be handed to the logger while another is
/// kept for assertions.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    captured: Arc<Mutex<Captured>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that accepts `count` lines and fails every write after that.
    pub fn failing_after(count: usize) -> Self {
        let sink = Self::default();
        sink.captured.lock().fail_after = Some(count);
        sink
    }

    /// The lines written so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.captured.lock().lines.clone()
    }

    /// All written lines concatenated.
    pub fn contents(&self) -> String {
        self.captured.lock().lines.concat()
    }

    /// Whether [`Sink::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.captured.lock().closed
    }
}

impl Sink for MemorySink {
    fn write_line(&mut self, line: &LogLine) -> Result<(), SinkError> {
        let mut captured = self.captured.lock();
        if captured
            .fail_after
            .is_some_and(|limit| captured.lines.len() >= limit)
        {
            return Err(SinkError::Console(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "memory sink refused the write",
            )));
        }
        captured.lines.push(line.text().to_owned());
        Ok(())
    }

    fn close(&mut self) {
        self.captured.lock().closed = true;
    }
}
