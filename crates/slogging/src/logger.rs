//! The logger handle.
//!
//! A [`Logger`] is a shared core (the dispatcher, its threshold, and the
//! optional background writer) plus an immutable field set. Deriving a child
//! with [`Logger::with`] copies the parent's fields into a new set; the
//! parent, and every other handle sharing the core, is left untouched.

use crate::format::AttachedFields;
use crate::TARGET;
use slogging_types::{FieldValue, Fields, LogLevel};
use parking_lot::Mutex;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use tracing::{dispatcher, Dispatch, Level, Span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Registry;

/// State shared by a logger and every handle derived from it.
pub(crate) struct Core {
    pub(crate) dispatch: Dispatch,
    pub(crate) level: LogLevel,
    pub(crate) with_caller: bool,
    /// Background writer; dropping it flushes and stops the worker
    pub(crate) guard: Mutex<Option<WorkerGuard>>,
}

/// Cheap-to-clone handle for emitting records.
///
/// Clones share the same fields and sinks. Every emitting method takes the
/// caller location from its call site, so wrappers marked
/// `#[track_caller]` report their own callers.
#[derive(Clone)]
pub struct Logger {
    core: Arc<Core>,
    span: Span,
    fields: Arc<Fields>,
}

macro_rules! emit_at {
    ($level:expr, $span:expr, $caller:expr, $error:expr, $message:expr) => {
        tracing::event!(
            target: TARGET,
            parent: $span,
            $level,
            caller = $caller,
            error = $error,
            "{}",
            $message
        )
    };
}

impl Logger {
    pub(crate) fn from_core(core: Arc<Core>, fields: Fields) -> Self {
        let fields = Arc::new(fields);
        let span = dispatcher::with_default(&core.dispatch, || {
            tracing::info_span!(target: TARGET, parent: None, "fields")
        });
        attach_fields(&span, &fields);
        Self { core, span, fields }
    }

    /// Child logger carrying these fields as well. Pairs with an empty name
    /// are dropped.
    pub fn with<I, K, V>(&self, pairs: I) -> Logger
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.with_fields(&Fields::from_pairs(pairs))
    }

    /// Child logger carrying one more field.
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Logger {
        let mut extra = Fields::new();
        extra.insert(key, value);
        self.with_fields(&extra)
    }

    /// Child logger built from a flat, alternating key/value list.
    ///
    /// Never fails: pairs with a non-string key are skipped and a trailing
    /// key without a value is dropped, so `["a", 1, "b"]` adds only `a`.
    pub fn with_flat<I>(&self, values: I) -> Logger
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        self.with_fields(&Fields::from_flat(values.into_iter().map(Into::into)))
    }

    /// Child logger carrying `extra` on top of this logger's fields.
    pub fn with_fields(&self, extra: &Fields) -> Logger {
        if extra.is_empty() {
            return self.clone();
        }
        Logger::from_core(self.core.clone(), self.fields.merged(extra))
    }

    /// Fields attached to every record of this logger.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Minimum severity this logger emits.
    pub fn level(&self) -> LogLevel {
        self.core.level
    }

    /// Whether a record at `level` would pass the threshold.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Disabled && level <= self.core.level
    }

    /// Whether both handles share the same sinks and the same field set.
    pub fn ptr_eq(a: &Logger, b: &Logger) -> bool {
        Arc::ptr_eq(&a.core, &b.core) && Arc::ptr_eq(&a.fields, &b.fields)
    }

    /// Emit at trace level.
    #[track_caller]
    pub fn trace(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Trace, None, &message, Location::caller(), None);
    }

    /// Emit at debug level.
    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Debug, None, &message, Location::caller(), None);
    }

    /// Emit at info level.
    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Info, None, &message, Location::caller(), None);
    }

    /// Emit at warn level.
    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Warn, None, &message, Location::caller(), None);
    }

    /// Emit at error level with `err` recorded under the `error` key.
    #[track_caller]
    pub fn error(&self, err: impl fmt::Display, message: impl fmt::Display) {
        let err = err.to_string();
        self.emit(LogLevel::Error, Some(&err), &message, Location::caller(), None);
    }

    /// Emit at `level`. [`LogLevel::Disabled`] emits nothing.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        self.emit(level, None, &message, Location::caller(), None);
    }

    /// Emit at `level`, naming `module` as the origin alongside the call
    /// site. This is what the [`log!`](crate::log!) macro expands to.
    #[track_caller]
    pub fn log_from(&self, module: &str, level: LogLevel, message: impl fmt::Display) {
        self.emit(level, None, &message, Location::caller(), Some(module));
    }

    /// Flush and stop the background writer, if this logger has one.
    ///
    /// Blocks until queued records are written. Records emitted afterwards
    /// through any handle sharing these sinks are discarded. Loggers writing
    /// synchronously have nothing to flush.
    pub fn shutdown(&self) {
        let guard = self.core.guard.lock().take();
        drop(guard);
    }

    /// Run `f` with this logger's dispatcher and fields active.
    ///
    /// Plain `tracing` macros called inside `f` are written through this
    /// logger's sinks and carry its fields.
    ///
    /// ```
    /// use slogging::{Builder, Options};
    ///
    /// let logger = Builder::new(Options::default()).build().with([("job", "nightly")]);
    /// logger.in_scope(|| tracing::info!(rows = 12, "export finished"));
    /// ```
    pub fn in_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        dispatcher::with_default(&self.core.dispatch, || self.span.in_scope(f))
    }

    fn emit(
        &self,
        level: LogLevel,
        error: Option<&str>,
        message: &dyn fmt::Display,
        location: &Location<'_>,
        module: Option<&str>,
    ) {
        if !self.enabled(level) {
            return;
        }
        let caller = self.core.with_caller.then(|| match module {
            Some(module) => format!("{} {}:{}", module, location.file(), location.line()),
            None => format!("{}:{}", location.file(), location.line()),
        });
        let caller = caller.as_deref();
        let span = &self.span;

        dispatcher::with_default(&self.core.dispatch, || match level {
            LogLevel::Disabled => {}
            LogLevel::Error => emit_at!(Level::ERROR, span, caller, error, message),
            LogLevel::Warn => emit_at!(Level::WARN, span, caller, error, message),
            LogLevel::Info => emit_at!(Level::INFO, span, caller, error, message),
            LogLevel::Debug => emit_at!(Level::DEBUG, span, caller, error, message),
            LogLevel::Trace => emit_at!(Level::TRACE, span, caller, error, message),
        });
    }
}

fn attach_fields(span: &Span, fields: &Arc<Fields>) {
    span.with_subscriber(|(id, dispatch)| {
        let Some(registry) = dispatch.downcast_ref::<Registry>() else {
            return;
        };
        if let Some(span) = registry.span(id) {
            span.extensions_mut().insert(AttachedFields(fields.clone()));
        }
    });
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.core.level)
            .field("with_caller", &self.core.with_caller)
            .field("fields", &self.fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SharedBuffer;
    use crate::Builder;
    use slogging_types::{kv, Options};

    fn capture(options: Options) -> (Logger, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let logger = Builder::new(options).console_writer(buffer.clone()).build();
        (logger, buffer)
    }

    fn options() -> Options {
        Options {
            service: "billing".to_string(),
            environment: "staging".to_string(),
            ..Options::default()
        }
    }

    #[test]
    fn test_info_record_shape() {
        let (logger, buffer) = capture(options());
        logger.info("charged");

        let records = buffer.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["level"], "info");
        assert_eq!(record["service"], "billing");
        assert_eq!(record["env"], "staging");
        assert_eq!(record["message"], "charged");
        assert!(record["time"].as_str().unwrap().ends_with('Z'));
        assert!(record.get("caller").is_none());
    }

    #[test]
    fn test_threshold_suppresses_lower_levels() {
        let (logger, buffer) = capture(Options {
            level: "warn".to_string(),
            ..options()
        });
        logger.info("quiet");
        logger.debug("quieter");
        logger.warn("loud");

        let records = buffer.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["message"], "loud");
        assert!(logger.enabled(LogLevel::Error));
        assert!(!logger.enabled(LogLevel::Info));
    }

    #[test]
    fn test_disabled_level_emits_nothing() {
        let (logger, buffer) = capture(Options {
            level: "off".to_string(),
            ..options()
        });
        logger.error("boom", "failed");
        logger.log(LogLevel::Disabled, "never");
        assert!(buffer.contents().is_empty());
        assert!(!logger.enabled(LogLevel::Error));
    }

    #[test]
    fn test_error_field_precedes_message() {
        let (logger, buffer) = capture(options());
        logger.error("disk full", "write failed");

        let record = &buffer.records()[0];
        assert_eq!(record["level"], "error");
        assert_eq!(record["error"], "disk full");
        let keys: Vec<&String> = record.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["level", "time", "service", "env", "error", "message"]);
    }

    #[test]
    fn test_child_does_not_touch_parent() {
        let (parent, buffer) = capture(options());
        let child = parent.with([("user", "alice")]).with_field("attempt", 2);
        parent.info("parent");
        child.info("child");

        let records = buffer.records();
        assert!(records[0].get("user").is_none());
        assert_eq!(records[1]["user"], "alice");
        assert_eq!(records[1]["attempt"], 2);
        assert_eq!(parent.fields().len(), 2);
        assert_eq!(child.fields().len(), 4);
    }

    #[test]
    fn test_with_flat_drops_dangling_key() {
        let (logger, buffer) = capture(options());
        logger.with_flat(kv!["a", 1, "b"]).info("flat");

        let record = &buffer.records()[0];
        assert_eq!(record["a"], 1);
        assert!(record.get("b").is_none());
    }

    #[test]
    fn test_with_nothing_returns_same_handle() {
        let (logger, _buffer) = capture(options());
        let same = logger.with(Vec::<(String, FieldValue)>::new());
        assert!(Logger::ptr_eq(&logger, &same));
    }

    #[test]
    fn test_caller_is_call_site() {
        let (logger, buffer) = capture(Options {
            with_caller: true,
            ..options()
        });
        logger.info("here");

        let record = &buffer.records()[0];
        let caller = record["caller"].as_str().unwrap();
        assert!(caller.contains("logger.rs:"), "caller was {}", caller);
    }

    #[test]
    fn test_log_macro_names_module() {
        let (logger, buffer) = capture(Options {
            with_caller: true,
            ..options()
        });
        crate::log!(logger, LogLevel::Warn, "retry {} of {}", 2, 3);

        let record = &buffer.records()[0];
        assert_eq!(record["level"], "warn");
        assert_eq!(record["message"], "retry 2 of 3");
        let caller = record["caller"].as_str().unwrap();
        assert!(caller.starts_with("slogging::logger::tests "), "caller was {}", caller);
        assert!(caller.contains("logger.rs:"), "caller was {}", caller);
    }

    #[test]
    fn test_fields_do_not_override_record_keys() {
        let (logger, buffer) = capture(options());
        logger
            .with([("level", "debug"), ("time", "yesterday"), ("message", "user msg")])
            .error("disk", "real message");

        let record = &buffer.records()[0];
        assert_eq!(record["level"], "error");
        assert_ne!(record["time"], "yesterday");
        assert_eq!(record["message"], "real message");
        assert_eq!(record["fields.level"], "debug");
        assert_eq!(record["fields.message"], "user msg");
        let keys: Vec<&String> = record.as_object().unwrap().keys().collect();
        assert_eq!(keys[keys.len() - 2], "error");
        assert_eq!(keys[keys.len() - 1], "message");
    }

    #[test]
    fn test_shutdown_flushes_shared_core() {
        let (logger, buffer) = capture(Options {
            non_blocking: true,
            ..options()
        });
        let child = logger.with_field("user", "alice");
        for i in 0..500 {
            child.info(format!("queued {}", i));
        }
        logger.shutdown();

        assert_eq!(buffer.lines().len(), 500);
        child.info("after shutdown");
        logger.shutdown();
        assert_eq!(buffer.lines().len(), 500);
    }

    #[test]
    fn test_in_scope_carries_fields() {
        let (logger, buffer) = capture(options());
        let logger = logger.with_field("request_id", "r-9");
        logger.in_scope(|| tracing::info!(rows = 12, "export finished"));

        let record = &buffer.records()[0];
        assert_eq!(record["request_id"], "r-9");
        assert_eq!(record["rows"], 12);
        assert_eq!(record["message"], "export finished");
    }

    #[test]
    fn test_console_rendering() {
        let (logger, buffer) = capture(Options {
            pretty: true,
            ..options()
        });
        logger.with_field("user", "alice").warn("slow request");

        let line = &buffer.lines()[0];
        assert!(line.contains(" WRN slow request "), "line was {}", line);
        assert!(line.ends_with("service=billing env=staging user=alice"));
    }

    #[test]
    fn test_non_blocking_flushes_on_drop() {
        let (logger, buffer) = capture(Options {
            non_blocking: true,
            ..options()
        });
        logger.info("queued");
        drop(logger);

        assert_eq!(buffer.records()[0]["message"], "queued");
    }
}
