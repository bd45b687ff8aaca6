//! Request-scoped context.
//!
//! A [`Context`] travels with a request. It holds the raw correlation values
//! set on it, inbound string values such as request headers, and a logger
//! that already carries the correlation fields. Every `with_*` call returns a
//! new context and leaves the receiver untouched.
//!
//! ```
//! use slogging::Context;
//!
//! let ctx = Context::new()
//!     .with_request_id("req-42")
//!     .with_operator_name("ops@example.com");
//!
//! assert_eq!(ctx.request_id(), "req-42");
//! slogging::from(Some(&ctx)).info("handling request");
//! ```

use crate::init::global;
use crate::logger::Logger;
use slogging_types::{FieldValue, Fields};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Field key of the request ID.
pub const REQUEST_ID_KEY: &str = "request_id";
/// Field key of the API ID.
pub const API_ID_KEY: &str = "api_id";
/// Field key of the operator name.
pub const OPERATOR_NAME_KEY: &str = "operator_name";
/// Field key of the operator role.
pub const ROLE_KEY: &str = "role";
/// Field key of the trace ID.
pub const TRACE_ID_KEY: &str = "trace_id";
/// Field key of the client IP address.
pub const IP_ADDRESS_KEY: &str = "ip_address";

#[derive(Clone, Default)]
struct Inner {
    values: HashMap<String, String>,
    request_id: Option<String>,
    api_id: Option<String>,
    operator_name: Option<String>,
    role: Option<FieldValue>,
    trace_id: Option<String>,
    ip_address: Option<String>,
    logger: Option<Logger>,
}

/// Immutable, append-only request context. Clones are cheap.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// An empty context with no values and no attached logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying `id` as the request ID.
    pub fn with_request_id(&self, id: impl Into<String>) -> Context {
        let id = id.into();
        self.derive(REQUEST_ID_KEY, id.clone().into(), |inner| {
            inner.request_id = Some(id)
        })
    }

    /// Context carrying `id` as the API ID.
    pub fn with_api_id(&self, id: impl Into<String>) -> Context {
        let id = id.into();
        self.derive(API_ID_KEY, id.clone().into(), |inner| inner.api_id = Some(id))
    }

    /// Context carrying `name` as the operator name.
    pub fn with_operator_name(&self, name: impl Into<String>) -> Context {
        let name = name.into();
        self.derive(OPERATOR_NAME_KEY, name.clone().into(), |inner| {
            inner.operator_name = Some(name)
        })
    }

    /// Context carrying `role` as the operator role.
    pub fn with_role(&self, role: impl Into<FieldValue>) -> Context {
        let role = role.into();
        self.derive(ROLE_KEY, role.clone(), |inner| inner.role = Some(role))
    }

    /// Context carrying `id` as the trace ID.
    pub fn with_trace_id(&self, id: impl Into<String>) -> Context {
        let id = id.into();
        self.derive(TRACE_ID_KEY, id.clone().into(), |inner| inner.trace_id = Some(id))
    }

    /// Context carrying `ip` as the client IP address.
    pub fn with_ip_address(&self, ip: impl Into<String>) -> Context {
        let ip = ip.into();
        self.derive(IP_ADDRESS_KEY, ip.clone().into(), |inner| {
            inner.ip_address = Some(ip)
        })
    }

    /// Context whose logger carries these extra fields.
    pub fn with_fields<I, K, V>(&self, pairs: I) -> Context
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let extra = Fields::from_pairs(pairs);
        let mut inner = (*self.inner).clone();
        inner.logger = Some(self.logger().with_fields(&extra));
        Context::from_inner(inner)
    }

    /// Context with `logger` attached. Later `with_*` calls build on it.
    pub fn with_logger(&self, logger: Logger) -> Context {
        let mut inner = (*self.inner).clone();
        inner.logger = Some(logger);
        Context::from_inner(inner)
    }

    /// Context carrying an inbound string value, such as a request header.
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Context {
        let mut inner = (*self.inner).clone();
        inner.values.insert(key.into(), value.into());
        Context::from_inner(inner)
    }

    /// Inbound value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.inner.values.get(key).map(String::as_str)
    }

    /// Request ID, or `""` when unset.
    pub fn request_id(&self) -> &str {
        self.inner.request_id.as_deref().unwrap_or_default()
    }

    /// API ID, or `""` when unset.
    pub fn api_id(&self) -> &str {
        self.inner.api_id.as_deref().unwrap_or_default()
    }

    /// Operator name, or `""` when unset.
    pub fn operator_id(&self) -> &str {
        self.inner.operator_name.as_deref().unwrap_or_default()
    }

    /// Operator role.
    pub fn role(&self) -> Option<&FieldValue> {
        self.inner.role.as_ref()
    }

    /// Trace ID, or `""` when unset.
    pub fn trace_id(&self) -> &str {
        self.inner.trace_id.as_deref().unwrap_or_default()
    }

    /// Client IP address, or `""` when unset.
    pub fn ip_address(&self) -> &str {
        self.inner.ip_address.as_deref().unwrap_or_default()
    }

    /// The attached logger, or the process-wide logger when none is
    /// attached.
    pub fn logger(&self) -> Logger {
        match &self.inner.logger {
            Some(logger) => logger.clone(),
            None => global(),
        }
    }

    fn derive<F>(&self, key: &str, value: FieldValue, update: F) -> Context
    where
        F: FnOnce(&mut Inner),
    {
        let mut inner = (*self.inner).clone();
        update(&mut inner);
        inner.logger = Some(self.logger().with_field(key, value));
        Context::from_inner(inner)
    }

    fn from_inner(inner: Inner) -> Context {
        Context {
            inner: Arc::new(inner),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.inner.request_id)
            .field("api_id", &self.inner.api_id)
            .field("operator_name", &self.inner.operator_name)
            .field("role", &self.inner.role)
            .field("trace_id", &self.inner.trace_id)
            .field("ip_address", &self.inner.ip_address)
            .field("has_logger", &self.inner.logger.is_some())
            .finish()
    }
}

/// Logger for a request.
///
/// The context's attached logger when it has one, otherwise the
/// process-wide logger unmodified. `None` also yields the process-wide
/// logger.
pub fn from(ctx: Option<&Context>) -> Logger {
    match ctx {
        Some(ctx) => ctx.logger(),
        None => global(),
    }
}
