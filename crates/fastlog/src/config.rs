//! Logger configuration: the startup [`LoggerConfig`] and the runtime-mutable [`Settings`].

use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use parking_lot::RwLock;
use serde::Deserialize;
use time::{format_description::OwnedFormatItem, UtcDateTime};

use crate::{ConfigError, FormatError, Severity};

/// Default line timestamp format (`HH:mm:ss.fff`).
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "[hour]:[minute]:[second].[subsecond digits:3]";

/// Prefix of the environment variables read by [`LoggerConfig::from_env`].
pub const ENV_PREFIX: &str = "FASTLOG_";

/// Startup configuration of the logger.
///
/// Keys deserialize in PascalCase (`TimestampFormat`, `ConsoleOutputEnabled`, ...), so an
/// application settings file can be mapped onto this struct directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase", deny_unknown_fields)]
pub struct LoggerConfig {
    /// Format description (in [`time`] version 2 syntax) of the per-line UTC timestamp.
    pub timestamp_format: String,

    /// Echo every line to the console.
    pub console_output_enabled: bool,

    /// Append every line to the daily log file.
    pub file_output_enabled: bool,

    /// Emit [`Severity::Info`] lines.
    pub info_log_enabled: bool,

    /// Emit [`Severity::Error`] lines.
    pub error_log_enabled: bool,

    /// Emit [`Severity::Trace`] lines.
    pub trace_log_enabled: bool,

    /// Directory holding the daily files. If `None`, `logs` next to the executable is used.
    pub log_directory: Option<PathBuf>,

    /// Upper bound on how long shutdown waits for the writer to drain.
    pub shutdown_timeout_ms: u64,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_owned(),
            console_output_enabled: false,
            file_output_enabled: true,
            info_log_enabled: true,
            error_log_enabled: true,
            trace_log_enabled: true,
            log_directory: None,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl LoggerConfig {
    /// Builds a configuration from the defaults overlaid with `FASTLOG_*` environment variables.
    ///
    /// See [`from_lookup`](Self::from_lookup) for the variable names and parsing rules.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from the defaults overlaid with values returned by `lookup`.
    ///
    /// `lookup` is queried with `FASTLOG_TIMESTAMP_FORMAT`, `FASTLOG_CONSOLE_OUTPUT_ENABLED`,
    /// `FASTLOG_FILE_OUTPUT_ENABLED`, `FASTLOG_INFO_LOG_ENABLED`, `FASTLOG_ERROR_LOG_ENABLED`,
    /// `FASTLOG_TRACE_LOG_ENABLED`, `FASTLOG_LOG_DIRECTORY` and `FASTLOG_SHUTDOWN_TIMEOUT_MS`.
    /// Blank or unparsable values leave the default in place.
    ///
    /// ```
    /// use fastlog::LoggerConfig;
    ///
    /// let config = LoggerConfig::from_lookup(|name| match name {
    ///     "FASTLOG_CONSOLE_OUTPUT_ENABLED" => Some("True".to_owned()),
    ///     "FASTLOG_INFO_LOG_ENABLED" => Some("maybe".to_owned()),
    ///     _ => None,
    /// });
    /// assert!(config.console_output_enabled);
    /// assert!(config.info_log_enabled);
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}"))
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        if let Some(format) = read("TIMESTAMP_FORMAT") {
            config.timestamp_format = format;
        }
        for (key, flag) in [
            ("CONSOLE_OUTPUT_ENABLED", &mut config.console_output_enabled),
            ("FILE_OUTPUT_ENABLED", &mut config.file_output_enabled),
            ("INFO_LOG_ENABLED", &mut config.info_log_enabled),
            ("ERROR_LOG_ENABLED", &mut config.error_log_enabled),
            ("TRACE_LOG_ENABLED", &mut config.trace_log_enabled),
        ] {
            if let Some(value) = read(key).as_deref().and_then(parse_bool) {
                *flag = value;
            }
        }
        if let Some(directory) = read("LOG_DIRECTORY") {
            config.log_directory = Some(PathBuf::from(directory));
        }
        if let Some(timeout) = read("SHUTDOWN_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            config.shutdown_timeout_ms = timeout;
        }

        config
    }

    /// The shutdown timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// A parsed timestamp format description, with its source text.
#[derive(Debug, Clone)]
struct TimestampFormat {
    source: String,
    items: OwnedFormatItem,
}

impl TimestampFormat {
    fn parse(source: &str) -> Result<Self, ConfigError> {
        let items = time::format_description::parse_owned::<2>(source).map_err(|error| {
            ConfigError::InvalidTimestampFormat {
                format: source.to_owned(),
                reason: error.to_string(),
            }
        })?;
        Ok(Self {
            source: source.to_owned(),
            items,
        })
    }
}

/// Runtime-mutable logger settings.
///
/// Read by the formatter and writer on every call, so changes apply to lines logged afterwards
/// (lines already queued are unaffected). Toggles use relaxed atomics: concurrent updates are
/// last-write-wins.
#[derive(Debug)]
pub struct Settings {
    console_output: AtomicBool,
    file_output: AtomicBool,
    info: AtomicBool,
    error: AtomicBool,
    trace: AtomicBool,
    timestamp_format: RwLock<TimestampFormat>,
}

impl Settings {
    /// Creates settings from a startup configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimestampFormat`] if the timestamp format does not parse.
    pub fn from_config(config: &LoggerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            console_output: AtomicBool::new(config.console_output_enabled),
            file_output: AtomicBool::new(config.file_output_enabled),
            info: AtomicBool::new(config.info_log_enabled),
            error: AtomicBool::new(config.error_log_enabled),
            trace: AtomicBool::new(config.trace_log_enabled),
            timestamp_format: RwLock::new(TimestampFormat::parse(&config.timestamp_format)?),
        })
    }

    fn severity_flag(&self, severity: Severity) -> &AtomicBool {
        match severity {
            Severity::Info => &self.info,
            Severity::Error => &self.error,
            Severity::Trace => &self.trace,
        }
    }

    /// Whether lines of `severity` are currently produced.
    #[inline]
    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.severity_flag(severity).load(Ordering::Relaxed)
    }

    /// Enables or disables lines of `severity`.
    pub fn set_enabled(&self, severity: Severity, enabled: bool) {
        self.severity_flag(severity).store(enabled, Ordering::Relaxed);
    }

    /// Whether lines are echoed to the console.
    #[inline]
    pub fn console_output_enabled(&self) -> bool {
        self.console_output.load(Ordering::Relaxed)
    }

    /// Enables or disables console output.
    pub fn set_console_output_enabled(&self, enabled: bool) {
        self.console_output.store(enabled, Ordering::Relaxed);
    }

    /// Whether lines are appended to the daily file.
    #[inline]
    pub fn file_output_enabled(&self) -> bool {
        self.file_output.load(Ordering::Relaxed)
    }

    /// Enables or disables file output.
    pub fn set_file_output_enabled(&self, enabled: bool) {
        self.file_output.store(enabled, Ordering::Relaxed);
    }

    /// The current timestamp format description.
    pub fn timestamp_format(&self) -> String {
        self.timestamp_format.read().source.clone()
    }

    /// Replaces the timestamp format description.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimestampFormat`] and keeps the previous format if
    /// `format` does not parse.
    pub fn set_timestamp_format(&self, format: &str) -> Result<(), ConfigError> {
        let parsed = TimestampFormat::parse(format)?;
        *self.timestamp_format.write() = parsed;
        Ok(())
    }

    pub(crate) fn format_timestamp(&self, now: UtcDateTime) -> Result<String, FormatError> {
        now.format(&self.timestamp_format.read().items)
            .map_err(|error| FormatError::Timestamp(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::collections::HashMap;

    use time::macros::utc_datetime;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = LoggerConfig::default();
        assert_eq!(config.timestamp_format, DEFAULT_TIMESTAMP_FORMAT);
        assert!(!config.console_output_enabled);
        assert!(config.file_output_enabled);
        assert!(config.info_log_enabled && config.error_log_enabled && config.trace_log_enabled);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn lookup_overlays_only_valid_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("FASTLOG_TIMESTAMP_FORMAT", "[hour]:[minute]"),
            ("FASTLOG_FILE_OUTPUT_ENABLED", "FALSE"),
            ("FASTLOG_TRACE_LOG_ENABLED", "  "),
            ("FASTLOG_ERROR_LOG_ENABLED", "nope"),
            ("FASTLOG_LOG_DIRECTORY", "/var/log/app"),
            ("FASTLOG_SHUTDOWN_TIMEOUT_MS", "250"),
        ]);
        let config = LoggerConfig::from_lookup(|name| env.get(name).map(|v| (*v).to_owned()));

        assert_eq!(config.timestamp_format, "[hour]:[minute]");
        assert!(!config.file_output_enabled);
        assert!(config.trace_log_enabled);
        assert!(config.error_log_enabled);
        assert_eq!(config.log_directory, Some(PathBuf::from("/var/log/app")));
        assert_eq!(config.shutdown_timeout_ms, 250);
    }

    #[test]
    fn deserializes_pascal_case_keys() {
        let config: LoggerConfig = serde_json::from_value(serde_json::json!({
            "ConsoleOutputEnabled": true,
            "InfoLogEnabled": false,
        }))
        .unwrap();
        assert!(config.console_output_enabled);
        assert!(!config.info_log_enabled);
        assert!(config.file_output_enabled);

        let unknown = serde_json::from_value::<LoggerConfig>(serde_json::json!({
            "Verbose": true,
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn settings_toggle_at_runtime() {
        let settings = Settings::from_config(&LoggerConfig::default()).unwrap();
        assert!(settings.is_enabled(Severity::Info));
        settings.set_enabled(Severity::Info, false);
        assert!(!settings.is_enabled(Severity::Info));
        assert!(settings.is_enabled(Severity::Error));

        settings.set_console_output_enabled(true);
        assert!(settings.console_output_enabled());
    }

    #[test]
    fn timestamp_format_is_validated() {
        let settings = Settings::from_config(&LoggerConfig::default()).unwrap();
        let now = utc_datetime!(2024-01-02 03:04:05.678);
        assert_eq!(settings.format_timestamp(now).unwrap(), "03:04:05.678");

        assert!(settings.set_timestamp_format("[hour").is_err());
        assert_eq!(settings.timestamp_format(), DEFAULT_TIMESTAMP_FORMAT);

        settings.set_timestamp_format("[year]/[month]").unwrap();
        assert_eq!(settings.format_timestamp(now).unwrap(), "2024/01");

        let invalid = LoggerConfig {
            timestamp_format: "[bogus]".to_owned(),
            ..LoggerConfig::default()
        };
        assert!(matches!(
            Settings::from_config(&invalid),
            Err(ConfigError::InvalidTimestampFormat { .. })
        ));
    }
}
