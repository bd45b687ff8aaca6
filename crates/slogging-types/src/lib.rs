//! # Slogging Types
//!
//! Value types shared by the slogging crates.
//!
//! This crate provides the building blocks the logging facade is configured
//! and fed with:
//!
//! - [`LogLevel`] and [`RenderMode`] for verbosity and output rendering
//! - [`FieldValue`] and [`Fields`], the closed set of loggable scalars and the
//!   ordered field set carried by every logger
//! - [`Options`], the serialisable initializer configuration
//! - [`SloggingError`] and the [`Result`] alias
//!
//! ## Example
//!
//! ```
//! use slogging_types::{fields, FieldValue, LogLevel};
//!
//! let level = LogLevel::parse_or_default("bogus");
//! assert_eq!(level, LogLevel::Info);
//!
//! let fields = fields! { "a" => 1, "b" => "two" };
//! assert_eq!(fields.get("a"), Some(&FieldValue::Int(1)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod enums;
pub mod errors;
pub mod fields;

// Re-export common types for convenience
pub use config::Options;
pub use enums::{LogLevel, RenderMode};
pub use errors::{Result, SloggingError};
pub use fields::{FieldValue, Fields};
