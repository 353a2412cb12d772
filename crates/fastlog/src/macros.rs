//! Logging macros.
//!
//! Each macro logs through the process-global logger (see [`init`](crate::init)), or through
//! an explicit handle given as `logger: <expr>,` before the message. A lone message is logged
//! verbatim; with arguments, the message is a [`format_args!`] string checked at compile time.
//!
//! The `info-log`, `error-log` and `trace-log` cargo features control whether each family
//! expands at all. When a feature is disabled, its macro expands to `()`, removing all
//! formatting overhead from the build.

/// Captures the [`CallSite`](crate::CallSite) of the invocation.
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite {
            file: ::core::file!(),
            member: ::core::module_path!(),
            line: ::core::line!(),
        }
    };
}

// ---------------------- INFO ----------------------

/// Logs an info line.
///
/// ```
/// # let logger = fastlog::LoggerBuilder::new(Default::default())
/// #     .file_sink(fastlog::MemorySink::new())
/// #     .start()
/// #     .unwrap();
/// fastlog::info!(logger: &logger, "100% {done}");
/// fastlog::info!(logger: &logger, "loaded {} plugins in {:?}", 3, std::time::Duration::ZERO);
/// # logger.shutdown();
/// ```
#[cfg(feature = "info-log")]
#[macro_export]
macro_rules! info {
    (logger: $logger:expr, $fmt:literal, $($arg:tt)+) => {
        $logger.info_args(::core::format_args!($fmt, $($arg)+))
    };
    (logger: $logger:expr, $message:expr $(,)?) => {
        $logger.info($message, &[])
    };
    ($fmt:literal, $($arg:tt)+) => {
        if let ::core::option::Option::Some(logger) = $crate::global() {
            logger.info_args(::core::format_args!($fmt, $($arg)+))
        }
    };
    ($message:expr $(,)?) => {
        if let ::core::option::Option::Some(logger) = $crate::global() {
            logger.info($message, &[])
        }
    };
}

/// Logs an info line. Compiled out: the `info-log` feature is disabled.
#[cfg(not(feature = "info-log"))]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        ()
    };
}

// ---------------------- ERROR ----------------------

/// Logs an error line.
#[cfg(feature = "error-log")]
#[macro_export]
macro_rules! error {
    (logger: $logger:expr, $fmt:literal, $($arg:tt)+) => {
        $logger.error_args(::core::format_args!($fmt, $($arg)+))
    };
    (logger: $logger:expr, $message:expr $(,)?) => {
        $logger.error($message, &[])
    };
    ($fmt:literal, $($arg:tt)+) => {
        if let ::core::option::Option::Some(logger) = $crate::global() {
            logger.error_args(::core::format_args!($fmt, $($arg)+))
        }
    };
    ($message:expr $(,)?) => {
        if let ::core::option::Option::Some(logger) = $crate::global() {
            logger.error($message, &[])
        }
    };
}

/// Logs an error line. Compiled out: the `error-log` feature is disabled.
#[cfg(not(feature = "error-log"))]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        ()
    };
}

// ---------------------- TRACE ----------------------

/// Logs a trace line annotated with the file, module and line of the invocation.
#[cfg(feature = "trace-log")]
#[macro_export]
macro_rules! trace {
    (logger: $logger:expr, $fmt:literal, $($arg:tt)+) => {
        $logger.trace_args($crate::call_site!(), ::core::format_args!($fmt, $($arg)+))
    };
    (logger: $logger:expr, $message:expr $(,)?) => {
        $logger.trace($message, $crate::call_site!())
    };
    ($fmt:literal, $($arg:tt)+) => {
        if let ::core::option::Option::Some(logger) = $crate::global() {
            logger.trace_args($crate::call_site!(), ::core::format_args!($fmt, $($arg)+))
        }
    };
    ($message:expr $(,)?) => {
        if let ::core::option::Option::Some(logger) = $crate::global() {
            logger.trace($message, $crate::call_site!())
        }
    };
}

/// Logs a trace line. Compiled out: the `trace-log` feature is disabled.
#[cfg(not(feature = "trace-log"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        ()
    };
}
