use crate::body::{ByteStream, TrailerSlot};
use crate::compression::{CompressionAlgorithm, NegotiatedCompression};
use crate::context::CallContext;
use crate::method::MethodDescriptor;
use crate::protocol::{Encoding, ProtocolOptions, RpcHttpRequest, RpcHttpResponse};
use crate::status::Status;
use async_trait::async_trait;
use http::{HeaderMap, Method, Uri};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A lazy sequence of serialized messages. An `Err` item is the terminal
/// outcome of the sequence.
pub type MessageStream = ByteStream;

/// What an adapter learned from request headers before any body is read.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    pub encoding: Encoding,
    /// Peer-requested timeout, after clamping.
    pub timeout: Option<Duration>,
    pub compression: NegotiatedCompression,
    /// Set when the request must be rejected before dispatch.
    pub error: Option<Status>,
}

/// Everything the client side needs to issue one call.
#[derive(Debug, Clone)]
pub struct ClientCall {
    pub descriptor: MethodDescriptor,
    /// Scheme and authority, plus an optional path prefix.
    pub base_uri: Uri,
    pub encoding: Encoding,
    pub send_compression: Option<Arc<dyn CompressionAlgorithm>>,
    pub timeout: Option<Duration>,
    pub headers: HeaderMap,
    /// Issue side-effect-free unary Connect calls as GET.
    pub use_get: bool,
}

/// A response as decoded by the client half of an adapter.
///
/// `messages` ends with an `Err` item when the call failed. `trailers` is
/// filled once `messages` has been drained.
pub struct ClientResponse {
    pub headers: HeaderMap,
    pub messages: MessageStream,
    pub trailers: TrailerSlot,
}

impl fmt::Debug for ClientResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientResponse")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// One wire protocol: content-type grammar, header names, status mapping
/// and body framing, for both the server and the client side.
#[async_trait]
pub trait ProtocolAdapter: fmt::Debug + Send + Sync {
    /// Protocol name used in logs and on the call context.
    fn name(&self) -> &'static str;

    fn options(&self) -> &ProtocolOptions;

    /// Whether the HTTP verb is acceptable for calls to `descriptor`.
    fn allows_method(&self, descriptor: &MethodDescriptor, method: &Method) -> bool;

    /// Whether a request with this verb and content type is spoken by this
    /// adapter.
    fn matches(
        &self,
        descriptor: &MethodDescriptor,
        method: &Method,
        content_type: Option<&str>,
    ) -> bool;

    /// Content types accepted for request bodies of `descriptor`.
    fn supported_content_types(&self, descriptor: &MethodDescriptor) -> Vec<&'static str>;

    /// Parses encoding, timeout and compression headers.
    fn decode_request_metadata(
        &self,
        descriptor: &MethodDescriptor,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
    ) -> RequestMetadata;

    /// Turns a request body into its lazy sequence of serialized messages.
    fn read_request(
        &self,
        descriptor: &MethodDescriptor,
        request: RpcHttpRequest,
        metadata: &RequestMetadata,
    ) -> MessageStream;

    /// Frames the implementation's output into a wire response.
    ///
    /// Waits for the first output item so that response headers set by the
    /// implementation, or an early error, shape the response head.
    async fn build_response(
        &self,
        context: &CallContext,
        metadata: &RequestMetadata,
        output: MessageStream,
    ) -> RpcHttpResponse;

    /// Builds the HTTP request for a client call.
    async fn build_request(
        &self,
        call: &ClientCall,
        messages: MessageStream,
    ) -> Result<RpcHttpRequest, Status>;

    /// Decodes the HTTP response of a client call.
    ///
    /// Fails outright when the response head already tells the call failed.
    async fn read_response(
        &self,
        call: &ClientCall,
        response: RpcHttpResponse,
    ) -> Result<ClientResponse, Status>;
}
