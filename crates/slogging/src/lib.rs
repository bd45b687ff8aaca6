//! # Slogging
//!
//! Context-scoped structured logging on top of `tracing`.
//!
//! This crate provides:
//!
//! - **Initialization**: [`init`] and [`Builder`] turn [`Options`] into the
//!   process-wide [`Logger`], writing to standard output, a rotating file,
//!   and any extra writer
//! - **Request context**: [`Context`] carries request ID, API ID, operator,
//!   role, trace ID, and client IP, and [`from`] returns a logger tagged with
//!   all of them
//! - **Rendering**: one JSON object per line, or a human-readable console
//!   line outside production
//! - **Rotation**: [`RotatingFile`] rolls files over by size, with optional
//!   gzip and pruning by count and age
//! - **Legacy**: [`RequestLogger`] tags records with raw inbound header values
//!
//! ## Example
//!
//! ```
//! use slogging::{Context, Options};
//!
//! let _guard = slogging::init(Options {
//!     service: "billing".to_string(),
//!     environment: "staging".to_string(),
//!     level: "debug".to_string(),
//!     ..Options::default()
//! });
//!
//! let ctx = Context::new().with_request_id("req-42").with_role("admin");
//! let log = slogging::from(Some(&ctx));
//! log.info("charge accepted");
//! log.with([("amount_cents", 1250)]).debug("ledger updated");
//! slogging::log!(log, slogging::LogLevel::Info, "settled {} charges", 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod filter;
mod format;
pub mod init;
pub mod legacy;
pub mod logger;
pub mod rotate;
pub mod sink;

#[cfg(test)]
mod test_support;

// Re-export commonly used items
pub use context::{from, Context};
pub use init::{global, init, set_global, shutdown, with, with_flat, Builder, LogGuard};
pub use legacy::RequestLogger;
pub use logger::Logger;
pub use rotate::{RotatingFile, RotationPolicy};
pub use slogging_types::{fields, kv, FieldValue, Fields, LogLevel, Options, RenderMode};

/// Inbound key of the request ID read by [`RequestLogger`].
pub const X_REQUEST_ID: &str = "X-Request-ID";

/// Inbound key of the API ID read by [`RequestLogger`].
pub const API_ID: &str = "api_id";

/// Inbound key of the operator read by [`RequestLogger`].
pub const X_OPERATOR: &str = "x-operator";

/// Emit through a [`Logger`] with a formatted message, recording the calling
/// module next to `file:line` when the logger reports callers.
///
/// ```
/// use slogging::{Builder, LogLevel, Options};
///
/// let logger = Builder::new(Options::default()).build();
/// slogging::log!(logger, LogLevel::Warn, "retry {} of {}", 2, 3);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_from(::std::module_path!(), $level, ::std::format_args!($($arg)+))
    };
}

/// Target of every event emitted through a [`Logger`].
pub(crate) const TARGET: &str = "slogging";
