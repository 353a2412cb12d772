//! Error types produced inside the logging pipeline.
//!
//! None of these reach application code through the logging calls: format errors are
//! discarded at the call site, sink errors end the writer, and shutdown errors are swallowed.

use std::{io, path::PathBuf};

/// A template could not be combined with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// A `{` was not closed before the end of the template.
    #[error("unterminated placeholder starting at byte {position}")]
    UnterminatedPlaceholder {
        /// Byte offset of the opening brace.
        position: usize,
    },

    /// A `}` appeared outside a placeholder and was not doubled.
    #[error("unescaped closing brace at byte {position}")]
    UnescapedClosingBrace {
        /// Byte offset of the closing brace.
        position: usize,
    },

    /// The placeholder index is not a non-negative integer.
    #[error("invalid placeholder index `{index}`")]
    InvalidIndex {
        /// The text found where the index was expected.
        index: String,
    },

    /// The placeholder refers to an argument that was not supplied.
    #[error("placeholder index {index} is out of range for {count} argument(s)")]
    IndexOutOfRange {
        /// The requested argument index.
        index: usize,
        /// The number of arguments supplied.
        count: usize,
    },

    /// The alignment component is not an integer.
    #[error("invalid alignment `{alignment}`")]
    InvalidAlignment {
        /// The text found where the alignment was expected.
        alignment: String,
    },

    /// The placeholder carries a `:format` component, which is not supported.
    #[error("format specifier `{specifier}` is not supported")]
    UnsupportedSpecifier {
        /// The rejected specifier.
        specifier: String,
    },

    /// The timestamp could not be rendered with the configured format description.
    #[error("failed to format timestamp: {0}")]
    Timestamp(String),
}

/// Failure of a file or console sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The directory holding the log files could not be created.
    #[error("failed to create log directory at {path}: {source}")]
    CreateDirectory {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The log file for the current day could not be opened.
    #[error("failed to open log file {path}: {source}")]
    Open {
        /// The file that could not be opened.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Writing or flushing the log file failed.
    #[error("failed to write log file {path}: {source}")]
    Write {
        /// The file being written.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The rotated file name could not be rendered.
    #[error("failed to render log file name: {0}")]
    FileName(String),

    /// Writing to the console failed.
    #[error("failed to write to console: {0}")]
    Console(#[from] io::Error),
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The timestamp format description could not be parsed.
    #[error("invalid timestamp format `{format}`: {reason}")]
    InvalidTimestampFormat {
        /// The rejected format description.
        format: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors that can occur while starting the logger.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The configuration could not be applied.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The writer thread could not be spawned.
    #[error("failed to spawn the writer thread: {0}")]
    SpawnWorker(#[source] io::Error),

    /// [`init`](crate::init) was called more than once.
    #[error("the process-global logger is already initialized")]
    AlreadyInitialized,

    /// The termination signal handler could not be registered.
    #[error("failed to register the termination signal handler: {0}")]
    SignalHook(#[source] io::Error),
}

/// Failures during the graceful-shutdown sequence.
///
/// These are reported through `tracing` and then discarded; shutdown never fails visibly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShutdownError {
    /// The writer did not terminate within the configured timeout.
    #[error("the writer did not terminate within {timeout_ms} ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u128,
    },

    /// The writer thread panicked.
    #[error("the writer thread panicked")]
    WorkerPanicked,
}
