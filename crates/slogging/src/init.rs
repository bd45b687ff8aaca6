//! Logger construction and the process-wide logger.
//!
//! [`Builder`] turns [`Options`] into a [`Logger`]. [`init`] builds one and
//! installs it as the process-wide logger returned by [`global`]. Nothing in
//! here can fail: unusable options degrade to defaults.

use crate::filter::EventFilter;
use crate::format::RecordFormat;
use crate::logger::{Core, Logger};
use crate::rotate::{RotatingFile, RotationPolicy};
use crate::sink::{FanOut, SinkKind};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use slogging_types::{FieldValue, Fields, Options, RenderMode};
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};
use tracing::Dispatch;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, Layer, Registry};

static GLOBAL: Lazy<RwLock<Logger>> =
    Lazy::new(|| RwLock::new(Builder::new(Options::default()).build()));

/// Builds a [`Logger`] from [`Options`] plus writers that cannot be
/// expressed in configuration.
pub struct Builder {
    options: Options,
    extra: Option<Box<dyn Write + Send>>,
    console: Option<Box<dyn Write + Send>>,
}

impl Builder {
    /// Start from `options`.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            extra: None,
            console: None,
        }
    }

    /// Also write every record to `writer`.
    pub fn extra_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.extra = Some(Box::new(writer));
        self
    }

    /// Use `writer` wherever standard output would be used.
    pub fn console_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.console = Some(Box::new(writer));
        self
    }

    /// Build a logger without installing it.
    pub fn build(self) -> Logger {
        let Builder {
            options,
            extra,
            console,
        } = self;

        let level = options.log_level();
        let mode = options.render_mode();
        let ansi = mode == RenderMode::Console
            && options.file_path().is_none()
            && console.is_none()
            && io::stdout().is_terminal();
        let console: Box<dyn Write + Send> = match console {
            Some(writer) => writer,
            None => Box::new(io::stdout()),
        };

        let mut fanout = FanOut::new();
        match options.file_path() {
            Some(path) => {
                let policy = RotationPolicy::from_options(&options);
                fanout.push(SinkKind::File, Box::new(RotatingFile::new(path, policy)));
                if options.also_stdout {
                    fanout.push(SinkKind::Stdout, console);
                }
            }
            None => fanout.push(SinkKind::Stdout, console),
        }
        if let Some(extra) = extra {
            fanout.push(SinkKind::Extra, extra);
        }

        tracing::debug!(
            level = %level,
            mode = ?mode,
            sinks = ?fanout.kinds(),
            sample_every = ?options.effective_sample_every(),
            non_blocking = options.non_blocking,
            "building logger"
        );

        let (writer, guard) = if options.non_blocking {
            let (writer, guard) = tracing_appender::non_blocking(fanout);
            (BoxMakeWriter::new(writer), Some(guard))
        } else {
            (BoxMakeWriter::new(Mutex::new(fanout)), None)
        };

        let layer = fmt::layer()
            .event_format(RecordFormat::new(mode, options.with_caller))
            .with_ansi(ansi)
            .with_writer(writer)
            .with_filter(EventFilter::new(level, options.effective_sample_every()));

        let core = Arc::new(Core {
            dispatch: Dispatch::new(Registry::default().with(layer)),
            level,
            with_caller: options.with_caller,
            guard: parking_lot::Mutex::new(guard),
        });

        let base = Fields::from_pairs([
            ("service", FieldValue::from(options.service)),
            ("env", FieldValue::from(options.environment)),
        ]);
        Logger::from_core(core, base)
    }

    /// Build a logger and make it the process-wide logger.
    pub fn install(self) -> Logger {
        let logger = self.build();
        set_global(logger.clone());
        logger
    }
}

/// Flushes the background writer of an installed logger when dropped.
///
/// Hold it in `main` for as long as records should be written. The
/// process-wide logger lives in a static, which is never dropped, so without
/// the guard records still queued at exit would be lost.
#[derive(Debug)]
#[must_use = "dropping the guard stops background writes immediately"]
pub struct LogGuard {
    logger: Logger,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        self.logger.shutdown();
    }
}

/// Build a logger from `options` and install it as the process-wide logger.
///
/// Call once at start-up and keep the returned guard alive. Calling it again
/// replaces the logger; records emitted concurrently with the swap may go to
/// either one.
pub fn init(options: Options) -> LogGuard {
    LogGuard {
        logger: Builder::new(options).install(),
    }
}

/// Flush and stop the process-wide logger's background writer.
pub fn shutdown() {
    global().shutdown();
}

/// The process-wide logger.
///
/// Before [`init`] this writes structured `info` records to standard output.
pub fn global() -> Logger {
    GLOBAL.read().clone()
}

/// Replace the process-wide logger.
///
/// The previous logger is dropped after the lock is released, which flushes
/// its background writer if nothing else holds it.
pub fn set_global(logger: Logger) {
    let previous = std::mem::replace(&mut *GLOBAL.write(), logger);
    drop(previous);
}

/// Detached child of the process-wide logger carrying extra fields.
pub fn with<I, K, V>(pairs: I) -> Logger
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    global().with(pairs)
}

/// Detached child of the process-wide logger built from a flat,
/// alternating key/value list.
pub fn with_flat<I>(values: I) -> Logger
where
    I: IntoIterator,
    I::Item: Into<FieldValue>,
{
    global().with_flat(values)
}
