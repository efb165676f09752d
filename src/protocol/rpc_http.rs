use crate::body::{BodyFrame, ByteStream, FrameStream, empty_bytes};
use futures::stream::{self, StreamExt};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, Version};
use std::fmt;

/// Transport-neutral HTTP request as seen by the protocol layer.
pub struct RpcHttpRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

/// Transport-neutral HTTP response.
///
/// The body yields data frames and, for protocols that use them, a final
/// trailers frame.
pub struct RpcHttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: FrameStream,
}

impl RpcHttpRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: ByteStream) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_2,
            headers,
            body,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// An empty-bodied request, mostly useful in tests.
    pub fn empty(method: Method, uri: Uri) -> Self {
        Self::new(method, uri, HeaderMap::new(), empty_bytes())
    }
}

impl RpcHttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: FrameStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// A response with no body.
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, HeaderMap::new(), stream::empty().boxed())
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Replaces the body with a single data chunk.
    pub fn with_data(mut self, data: bytes::Bytes) -> Self {
        self.body = stream::once(async move { Ok(BodyFrame::Data(data)) }).boxed();
        self
    }
}

impl fmt::Debug for RpcHttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcHttpRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for RpcHttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcHttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
