//! Record rendering: one JSON object per line, or a console line.
//!
//! Logger fields do not travel as `tracing` span fields, whose names must be
//! known at compile time. Each logger span instead carries its [`Fields`] in
//! its extensions as [`AttachedFields`], and [`RecordFormat`] merges them
//! from the root span down before adding the event's own fields.

use chrono::{SecondsFormat, Utc};
use colored::{ColoredString, Colorize};
use slogging_types::{FieldValue, Fields, LogLevel, RenderMode};
use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

pub(crate) const MESSAGE_KEY: &str = "message";
pub(crate) const CALLER_KEY: &str = "caller";
const LEVEL_KEY: &str = "level";
const TIME_KEY: &str = "time";

/// Keys owned by the record itself. Fields using one of them are written
/// as `fields.<key>` instead.
const RESERVED_KEYS: &[&str] = &[LEVEL_KEY, TIME_KEY, CALLER_KEY, MESSAGE_KEY];

fn field_key(key: &str) -> Cow<'_, str> {
    if RESERVED_KEYS.contains(&key) {
        Cow::Owned(format!("fields.{}", key))
    } else {
        Cow::Borrowed(key)
    }
}

/// Field set stored in a logger span's extensions.
pub(crate) struct AttachedFields(pub(crate) Arc<Fields>);

/// A fully resolved record, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Record {
    pub(crate) level: LogLevel,
    pub(crate) time: String,
    pub(crate) fields: Fields,
    pub(crate) caller: Option<String>,
    pub(crate) message: String,
}

impl Record {
    /// Render as a single JSON object.
    ///
    /// Keys come out as `level`, `time`, the fields in order, `caller`,
    /// `message`. A field can never replace one of the record's own keys.
    pub(crate) fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut map = serde_json::Map::new();
        map.insert(LEVEL_KEY.to_string(), self.level.as_str().into());
        map.insert(TIME_KEY.to_string(), self.time.clone().into());
        for (key, value) in &self.fields {
            map.insert(field_key(key).into_owned(), value.to_json());
        }
        if let Some(caller) = &self.caller {
            map.insert(CALLER_KEY.to_string(), caller.clone().into());
        }
        map.insert(MESSAGE_KEY.to_string(), self.message.clone().into());
        serde_json::to_string(&serde_json::Value::Object(map))
    }

    /// Render as `<time> <LVL> [<caller> >] <message> key=value ...`.
    pub(crate) fn to_console_line(&self, ansi: bool) -> String {
        let mut line = String::new();
        if ansi {
            let _ = write!(line, "{} {}", self.time.dimmed(), level_color(self.level));
        } else {
            let _ = write!(line, "{} {}", self.time, self.level.abbreviation());
        }
        if let Some(caller) = &self.caller {
            if ansi {
                let _ = write!(line, " {} {}", caller.bold(), ">".cyan());
            } else {
                let _ = write!(line, " {} >", caller);
            }
        }
        let _ = write!(line, " {}", self.message);
        for (key, value) in &self.fields {
            let key = field_key(key);
            let value = console_value(value);
            if ansi {
                let _ = write!(line, " {}{}{}", key.cyan(), "=".cyan(), value);
            } else {
                let _ = write!(line, " {}={}", key, value);
            }
        }
        line
    }
}

fn level_color(level: LogLevel) -> ColoredString {
    let tag = level.abbreviation();
    match level {
        LogLevel::Error => tag.red().bold(),
        LogLevel::Warn => tag.yellow(),
        LogLevel::Info => tag.green(),
        LogLevel::Debug => tag.blue(),
        LogLevel::Trace => tag.purple(),
        LogLevel::Disabled => tag.normal(),
    }
}

fn console_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Str(s) if needs_quotes(s) => format!("{:?}", s),
        other => other.to_string(),
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty() || s.contains(|c: char| c.is_whitespace() || c == '=' || c == '"')
}

/// Collects the message, caller, and remaining fields of an event.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    caller: Option<String>,
    fields: Fields,
}

impl EventVisitor {
    fn put(&mut self, field: &Field, value: FieldValue) {
        match field.name() {
            MESSAGE_KEY => self.message = Some(value.to_string()),
            CALLER_KEY => self.caller = Some(value.to_string()),
            name => self.fields.insert(name, value),
        }
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string().into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{:?}", value).into());
    }
}

/// Event formatter for every logger built by this crate.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordFormat {
    mode: RenderMode,
    with_caller: bool,
}

impl RecordFormat {
    pub(crate) fn new(mode: RenderMode, with_caller: bool) -> Self {
        Self { mode, with_caller }
    }
}

impl<S, N> FormatEvent<S, N> for RecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = Fields::new();
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                if let Some(attached) = span.extensions().get::<AttachedFields>() {
                    fields.extend_from(&attached.0);
                }
            }
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        fields.extend_from(&visitor.fields);

        let meta = event.metadata();
        let caller = visitor.caller.or_else(|| {
            if !self.with_caller {
                return None;
            }
            match (meta.file(), meta.line()) {
                (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
                _ => None,
            }
        });

        let record = Record {
            level: LogLevel::from(*meta.level()),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            fields,
            caller,
            message: visitor.message.unwrap_or_default(),
        };

        match self.mode {
            RenderMode::Structured => {
                let line = record.to_json_line().map_err(|_| fmt::Error)?;
                writeln!(writer, "{}", line)
            }
            RenderMode::Console => {
                let line = record.to_console_line(writer.has_ansi_escapes());
                writeln!(writer, "{}", line)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slogging_types::fields;

    fn record() -> Record {
        Record {
            level: LogLevel::Warn,
            time: "2024-05-01T12:00:00Z".to_string(),
            fields: fields! { "service" => "billing", "request_id" => "r-1", "attempt" => 3 },
            caller: Some("src/main.rs:42".to_string()),
            message: "retrying".to_string(),
        }
    }

    #[test]
    fn test_json_key_order() {
        let line = record().to_json_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec!["level", "time", "service", "request_id", "attempt", "caller", "message"]
        );
        assert_eq!(value["level"], "warn");
        assert_eq!(value["attempt"], 3);
    }

    #[test]
    fn test_json_without_caller() {
        let mut record = record();
        record.caller = None;
        let value: serde_json::Value = serde_json::from_str(&record.to_json_line().unwrap()).unwrap();
        assert!(value.get("caller").is_none());
        assert_eq!(value["message"], "retrying");
    }

    #[test]
    fn test_console_line() {
        let line = record().to_console_line(false);
        assert_eq!(
            line,
            "2024-05-01T12:00:00Z WRN src/main.rs:42 > retrying service=billing request_id=r-1 attempt=3"
        );
    }

    #[test]
    fn test_fields_cannot_shadow_record_keys() {
        let mut record = record();
        record.level = LogLevel::Error;
        record.fields = fields! {
            "level" => "debug",
            "time" => "yesterday",
            "message" => "user msg",
            "caller" => "elsewhere",
            "error" => "disk",
        };
        let line = record.to_json_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["level"], "error");
        assert_eq!(value["time"], "2024-05-01T12:00:00Z");
        assert_eq!(value["message"], "retrying");
        assert_eq!(value["caller"], "src/main.rs:42");
        assert_eq!(value["fields.level"], "debug");
        assert_eq!(value["fields.time"], "yesterday");
        assert_eq!(value["fields.message"], "user msg");
        assert_eq!(value["fields.caller"], "elsewhere");

        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.first().map(|k| k.as_str()), Some("level"));
        assert_eq!(keys.last().map(|k| k.as_str()), Some("message"));
        let error_at = keys.iter().position(|k| *k == "error").unwrap();
        assert_eq!(keys[error_at + 1], "caller");
    }

    #[test]
    fn test_console_prefixes_reserved_fields() {
        let mut record = record();
        record.caller = None;
        record.fields = fields! { "message" => "shadow" };
        assert_eq!(
            record.to_console_line(false),
            "2024-05-01T12:00:00Z WRN retrying fields.message=shadow"
        );
    }

    #[test]
    fn test_console_quotes_awkward_values() {
        let mut record = record();
        record.caller = None;
        record.fields = fields! { "error" => "disk full", "expr" => "a=b", "empty" => "" };
        let line = record.to_console_line(false);
        assert!(line.ends_with(r#"retrying error="disk full" expr="a=b" empty="""#));
    }
}
