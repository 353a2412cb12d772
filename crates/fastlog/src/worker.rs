//! The single background loop that drains the queue into the sinks.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

use crate::{
    queue::{Dequeued, QueueConsumer},
    sink::Sink,
    Clock, LogLine, Settings, SinkError,
};

/// Lifecycle state of the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for and writing lines.
    Running,

    /// The queue is closed; remaining lines are being written.
    Draining,

    /// The shutdown banner has been written and the loop has exited. Final.
    Terminated,
}

impl WorkerState {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Draining => 1,
            Self::Terminated => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Draining,
            _ => Self::Terminated,
        }
    }
}

/// [`WorkerState`] shared between the writer thread and its observers.
#[derive(Debug)]
pub struct WorkerStatus(AtomicU8);

impl Default for WorkerStatus {
    fn default() -> Self {
        Self(AtomicU8::new(WorkerState::Running.to_u8()))
    }
}

impl WorkerStatus {
    /// The most recently published state.
    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }
}

/// Why the writer loop exited.
#[derive(Debug)]
pub enum WorkerExit {
    /// The queue was closed and fully drained.
    Closed,

    /// A sink failed; lines still queued were discarded.
    SinkFailed(SinkError),

    /// Writing a line panicked.
    Panicked,
}

/// Drains a [`QueueConsumer`] into a file sink and a console sink.
///
/// Each line goes to the file sink first and then to the console sink, each only if its output
/// flag in [`Settings`] is set at the time the line is written.
pub struct WriterWorker<F, K> {
    consumer: QueueConsumer,
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
    file: F,
    console: K,
    status: Arc<WorkerStatus>,
}

impl<F, K> std::fmt::Debug for WriterWorker<F, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterWorker")
            .field("consumer", &self.consumer)
            .field("status", &self.status.get())
            .finish_non_exhaustive()
    }
}

impl<F: Sink, K: Sink> WriterWorker<F, K> {
    /// Creates a worker that publishes its state through `status`.
    pub fn new(
        consumer: QueueConsumer,
        settings: Arc<Settings>,
        clock: Arc<dyn Clock>,
        file: F,
        console: K,
        status: Arc<WorkerStatus>,
    ) -> Self {
        Self {
            consumer,
            settings,
            clock,
            file,
            console,
            status,
        }
    }

    /// Runs the loop until the queue is closed and drained, or a line cannot be written.
    ///
    /// On exit the queue is closed (later lines are dropped at enqueue), the shutdown banner is
    /// written to every enabled sink, and the sinks are closed.
    pub fn run(mut self) -> WorkerExit {
        self.status.set(WorkerState::Running);

        let exit = loop {
            let line = match self.consumer.dequeue_blocking() {
                Dequeued::Line(line) => line,
                Dequeued::Closed => break WorkerExit::Closed,
            };

            if self.consumer.is_closed() {
                self.status.set(WorkerState::Draining);
            }

            match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&line))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::warn!(
                        target: "fastlog",
                        %error,
                        "log sink failed, stopping the writer"
                    );
                    break WorkerExit::SinkFailed(error);
                }
                Err(_) => {
                    tracing::warn!(
                        target: "fastlog",
                        "writing a log line panicked, stopping the writer"
                    );
                    break WorkerExit::Panicked;
                }
            }
        };

        self.consumer.close();
        self.write_shutdown_banner();
        self.file.close();
        self.console.close();
        self.status.set(WorkerState::Terminated);

        exit
    }

    fn dispatch(&mut self, line: &LogLine) -> Result<(), SinkError> {
        if self.settings.file_output_enabled() {
            self.file.write_line(line)?;
        }
        if self.settings.console_output_enabled() {
            self.console.write_line(line)?;
        }
        Ok(())
    }

    fn write_shutdown_banner(&mut self) {
        let banner = LogLine::shutdown_banner(self.clock.now());
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            if self.settings.file_output_enabled() {
                let _ = self.file.write_line(&banner);
            }
            if self.settings.console_output_enabled() {
                let _ = self.console.write_line(&banner);
            }
        }));
    }
}
