//! Provides a [`tracing_subscriber::Layer`] ([`FastLogLayer`]) forwarding `tracing` events into
//! a [`LoggerHandle`].

use std::fmt::{self, Display};

use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, Layer};

use crate::{CallSite, LoggerHandle, Severity};

const MESSAGE: &str = "message";

/// A [`tracing_subscriber::Layer`] that writes `tracing` events as fastlog lines.
///
/// `ERROR` and `WARN` events become error lines, `INFO` events info lines, and `DEBUG` and
/// `TRACE` events trace lines annotated with the event's source location. Fields other than
/// the message are appended as ` key=value`, with values rendered as JSON.
///
/// Events targeting `fastlog` itself are skipped, so the logger's own diagnostics never loop
/// back into its queue.
#[derive(Debug, Clone)]
pub struct FastLogLayer {
    logger: LoggerHandle,
}

impl FastLogLayer {
    /// Creates a layer writing to `logger`.
    pub fn new(logger: LoggerHandle) -> Self {
        Self { logger }
    }
}

fn severity_for(level: Level) -> Severity {
    match level {
        Level::ERROR | Level::WARN => Severity::Error,
        Level::INFO => Severity::Info,
        _ => Severity::Trace,
    }
}

/// Fields recorded from a single event.
#[derive(Debug, Default)]
struct EventFields {
    message: Option<String>,
    values: Vec<(&'static str, serde_json::Value)>,
}

impl EventFields {
    fn record_value(&mut self, field: &Field, value: serde_json::Value) {
        let name = field.name();
        if name.starts_with("log.") {
            return;
        }
        let name = name.strip_prefix("r#").unwrap_or(name);
        self.values.push((name, value));
    }
}

impl Visit for EventFields {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, serde_json::Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, serde_json::Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == MESSAGE {
            self.message = Some(value.to_owned());
        } else {
            self.record_value(field, serde_json::Value::from(value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE {
            if self.message.is_none() {
                self.message = Some(format!("{value:?}"));
            }
        } else {
            self.record_value(field, serde_json::Value::from(format!("{value:?}")));
        }
    }
}

impl Display for EventFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separator = "";
        if let Some(message) = &self.message {
            f.write_str(message)?;
            separator = " ";
        }
        for (key, value) in &self.values {
            write!(f, "{separator}{key}={value}")?;
            separator = " ";
        }
        Ok(())
    }
}

impl<S: Subscriber> Layer<S> for FastLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with("fastlog") {
            return;
        }

        let severity = severity_for(*metadata.level());
        if !self.logger.is_enabled(severity) {
            return;
        }

        let mut fields = EventFields::default();
        event.record(&mut fields);

        match severity {
            Severity::Trace => {
                let call_site = CallSite {
                    file: metadata.file().unwrap_or_else(|| metadata.target()),
                    member: metadata.module_path().unwrap_or_else(|| metadata.target()),
                    line: metadata.line().unwrap_or_default(),
                };
                self.logger.trace_args(call_site, format_args!("{fields}"));
            }
            Severity::Info | Severity::Error => {
                self.logger.log_args(severity, format_args!("{fields}"));
            }
        }
    }
}
