//! Output sinks and the fan-out writer.

use std::fmt;
use std::io::{self, Write};

/// Where a sink writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// The process's standard output (or its substitute)
    Stdout,
    /// The rotating log file
    File,
    /// A caller-supplied writer
    Extra,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Stdout => write!(f, "stdout"),
            SinkKind::File => write!(f, "file"),
            SinkKind::Extra => write!(f, "extra"),
        }
    }
}

struct Sink {
    kind: SinkKind,
    writer: Box<dyn Write + Send>,
}

/// Writes every buffer to all of its sinks.
///
/// A failing sink does not stop the others from being written; the first
/// error is returned once every sink has been tried.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Sink>,
}

impl FanOut {
    /// Create a fan-out with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn push(&mut self, kind: SinkKind, writer: Box<dyn Write + Send>) {
        self.sinks.push(Sink { kind, writer });
    }

    /// Kinds of the configured sinks, in write order.
    pub fn kinds(&self) -> Vec<SinkKind> {
        self.sinks.iter().map(|s| s.kind).collect()
    }

    /// Number of sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no sinks.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Write for FanOut {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.writer.write_all(buf) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.writer.flush() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for FanOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOut").field("sinks", &self.kinds()).finish()
    }
}
