//! Header-keyed request logger kept for older call sites.
//!
//! [`RequestLogger`] predates [`Context`] correlation fields. It reads the
//! raw inbound values stored on a context and tags each record with them
//! under the inbound key names, always through the process-wide logger.

use crate::context::Context;
use crate::init::global;
use crate::{API_ID, X_OPERATOR, X_REQUEST_ID};
use std::fmt;

/// Request logger keyed by inbound header names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLogger {
    request_id: String,
    api_id: String,
    operator: String,
}

impl RequestLogger {
    /// Read the request ID, API ID, and operator from the context's inbound
    /// values. Missing values are empty.
    pub fn new(ctx: &Context) -> Self {
        let read = |key: &str| ctx.value(key).unwrap_or_default().to_string();
        Self {
            request_id: read(X_REQUEST_ID),
            api_id: read(API_ID),
            operator: read(X_OPERATOR),
        }
    }

    /// Inbound request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Inbound API ID.
    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    /// Inbound operator.
    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Emit at info level.
    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.logger().info(message);
    }

    /// Emit at error level with `err` under the `error` key.
    #[track_caller]
    pub fn error(&self, err: impl fmt::Display, message: impl fmt::Display) {
        self.logger().error(err, message);
    }

    fn logger(&self) -> crate::Logger {
        global().with([
            (X_REQUEST_ID, self.request_id.as_str()),
            (API_ID, self.api_id.as_str()),
            (X_OPERATOR, self.operator.as_str()),
        ])
    }
}
