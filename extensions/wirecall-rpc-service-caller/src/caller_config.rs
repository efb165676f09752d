use crate::Interceptor;
use http::{HeaderMap, Uri};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use wirecall::context::AbortSignal;
use wirecall::protocol::{Encoding, Protocol, ProtocolOptions};

/// Settings shared by every call made through one caller.
#[derive(Clone)]
pub struct CallerConfig {
    /// Scheme and authority of the endpoint, plus an optional path prefix.
    pub base_uri: Uri,
    pub protocol: Protocol,
    pub encoding: Encoding,
    /// Name of the algorithm used to compress outgoing messages.
    pub send_compression: Option<String>,
    /// Issue unary calls to side-effect-free methods as GET (Connect only).
    pub use_http_get: bool,
    /// Applied when a call does not set its own timeout.
    pub timeout: Option<Duration>,
    /// Size limits, compression threshold and the accepted algorithms.
    pub protocol_options: ProtocolOptions,
    pub interceptors: Vec<Arc<dyn Interceptor>>,
}

impl CallerConfig {
    pub fn new(base_uri: Uri) -> Self {
        Self {
            base_uri,
            protocol: Protocol::default(),
            encoding: Encoding::default(),
            send_compression: None,
            use_http_get: false,
            timeout: None,
            protocol_options: ProtocolOptions::default(),
            interceptors: Vec::new(),
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_send_compression(mut self, name: impl Into<String>) -> Self {
        self.send_compression = Some(name.into());
        self
    }

    pub fn with_http_get(mut self, use_http_get: bool) -> Self {
        self.use_http_get = use_http_get;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_protocol_options(mut self, protocol_options: ProtocolOptions) -> Self {
        self.protocol_options = protocol_options;
        self
    }

    /// Appends an interceptor. Earlier interceptors wrap later ones.
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }
}

impl fmt::Debug for CallerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerConfig")
            .field("base_uri", &self.base_uri)
            .field("protocol", &self.protocol)
            .field("encoding", &self.encoding)
            .field("send_compression", &self.send_compression)
            .field("use_http_get", &self.use_http_get)
            .field("timeout", &self.timeout)
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

/// Per-call settings.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Cancels the call when fired.
    pub signal: Option<AbortSignal>,
    /// Overrides the caller's default timeout.
    pub timeout: Option<Duration>,
    /// Extra request headers.
    pub headers: HeaderMap,
}

impl CallOptions {
    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}
