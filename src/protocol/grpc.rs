use crate::body::{BodyFrame, TrailerSlot, split_trailers};
use crate::compression::negotiate_compression;
use crate::constants::{
    HEADER_CONTENT_TYPE, HEADER_GRPC_ACCEPT_ENCODING, HEADER_GRPC_ENCODING, HEADER_GRPC_TIMEOUT,
    HEADER_TE, HEADER_USER_AGENT, USER_AGENT,
};
use crate::context::CallContext;
use crate::envelope::EnvelopeCompressor;
use crate::method::MethodDescriptor;
use crate::protocol::content_type_cache::ContentTypeCache;
use crate::protocol::encoding::{encoding_from_suffix, parse_media_type};
use crate::protocol::enveloped::{
    encode_message, read_envelopes, request_messages, response_body, response_messages,
};
use crate::protocol::grpc_status::{find_grpc_status, set_grpc_status};
use crate::protocol::headers::{append_all, header_str, set_header};
use crate::protocol::timeout::{encode_grpc_timeout, parse_grpc_timeout};
use crate::protocol::{
    ClientCall, ClientResponse, Encoding, MessageStream, ProtocolAdapter, ProtocolOptions,
    RequestMetadata, RpcHttpRequest, RpcHttpResponse,
};
use crate::status::{Code, Status};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use http::{HeaderMap, Method, StatusCode, Uri, Version};

pub(crate) const GRPC_CONTENT_TYPES: [&str; 3] =
    ["application/grpc", "application/grpc+proto", "application/grpc+json"];

/// Strict gRPC over HTTP/2, with status in real HTTP trailers.
#[derive(Debug)]
pub struct GrpcAdapter {
    options: ProtocolOptions,
    content_types: ContentTypeCache<Option<Encoding>>,
}

impl GrpcAdapter {
    pub fn new(options: ProtocolOptions) -> Self {
        let content_types = ContentTypeCache::new(options.content_type_cache_capacity);
        Self {
            options,
            content_types,
        }
    }

    /// Encoding named by a gRPC content type, or `None` if it is not one.
    pub fn parse_content_type(&self, content_type: &str) -> Option<Encoding> {
        self.content_types
            .get_or_insert_with(content_type, |value| parse_grpc_family(value, "application/grpc"))
    }
}

/// Parses `<base>`, `<base>+proto` and `<base>+json[; charset=utf-8]`.
pub(crate) fn parse_grpc_family(content_type: &str, base: &str) -> Option<Encoding> {
    let (media, charset) = parse_media_type(content_type);
    let rest = media.strip_prefix(base)?;
    if rest.is_empty() {
        return charset.is_none().then_some(Encoding::Binary);
    }
    encoding_from_suffix(rest.strip_prefix('+')?, charset.as_deref())
}

pub(crate) fn grpc_content_type(base: &str, encoding: Encoding) -> String {
    format!("{base}+{}", encoding.as_str())
}

/// Request metadata shared by gRPC and gRPC-Web.
pub(crate) fn decode_grpc_metadata(
    options: &ProtocolOptions,
    encoding: Option<Encoding>,
    headers: &HeaderMap,
) -> RequestMetadata {
    let compression = negotiate_compression(
        &options.compression,
        header_str(headers, HEADER_GRPC_ENCODING),
        header_str(headers, HEADER_GRPC_ACCEPT_ENCODING),
        HEADER_GRPC_ACCEPT_ENCODING,
    );

    let mut error = compression.error.clone();
    let timeout = match header_str(headers, HEADER_GRPC_TIMEOUT).map(parse_grpc_timeout) {
        Some(Ok(timeout)) => Some(timeout),
        Some(Err(err)) => {
            error.get_or_insert(err);
            None
        }
        None => None,
    };

    RequestMetadata {
        encoding: encoding.unwrap_or_default(),
        timeout: options.clamp_timeout(timeout),
        compression,
        error,
    }
}

/// Response headers common to both gRPC flavors.
pub(crate) fn grpc_response_headers(
    options: &ProtocolOptions,
    content_type: &str,
    metadata: &RequestMetadata,
    compressed: bool,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    set_header(&mut headers, HEADER_CONTENT_TYPE, content_type);
    if let Some(accept) = options.compression.accept_header_value() {
        set_header(&mut headers, HEADER_GRPC_ACCEPT_ENCODING, &accept);
    }
    if compressed {
        if let Some(algorithm) = &metadata.compression.response {
            set_header(&mut headers, HEADER_GRPC_ENCODING, algorithm.name());
        }
    }
    headers
}

/// Request headers common to both gRPC flavors.
pub(crate) fn grpc_request_headers(
    options: &ProtocolOptions,
    call: &ClientCall,
    content_type: &str,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    append_all(&mut headers, &call.headers);
    set_header(&mut headers, HEADER_CONTENT_TYPE, content_type);
    set_header(&mut headers, HEADER_USER_AGENT, USER_AGENT);
    if let Some(timeout) = call.timeout {
        set_header(&mut headers, HEADER_GRPC_TIMEOUT, &encode_grpc_timeout(timeout));
    }
    if let Some(algorithm) = &call.send_compression {
        set_header(&mut headers, HEADER_GRPC_ENCODING, algorithm.name());
    }
    if let Some(accept) = options.compression.accept_header_value() {
        set_header(&mut headers, HEADER_GRPC_ACCEPT_ENCODING, &accept);
    }
    headers
}

/// Joins a base URI and a method path.
pub(crate) fn call_uri(base: &Uri, descriptor: &MethodDescriptor, query: Option<&str>) -> Result<Uri, Status> {
    let prefix = base.path().trim_end_matches('/');
    let path_and_query = match query {
        Some(query) => format!("{prefix}{}?{query}", descriptor.path()),
        None => format!("{prefix}{}", descriptor.path()),
    };
    let mut parts = base.clone().into_parts();
    parts.path_and_query = Some(
        path_and_query
            .parse()
            .map_err(|err| Status::internal(format!("invalid request path: {err}")))?,
    );
    Uri::from_parts(parts).map_err(|err| Status::internal(format!("invalid request uri: {err}")))
}

/// Frames and compresses every outgoing client message, lazily.
pub(crate) fn request_body(
    messages: MessageStream,
    compressor: EnvelopeCompressor,
    write_max_bytes: usize,
) -> MessageStream {
    messages
        .map(move |message| message.and_then(|message| encode_message(message, &compressor, write_max_bytes)))
        .boxed()
}

/// Validates the head of a gRPC-family response and resolves its
/// compression. A trailers-only error surfaces here.
pub(crate) fn check_grpc_response_head(
    options: &ProtocolOptions,
    response: &RpcHttpResponse,
    encoding_ok: impl FnOnce(&str) -> bool,
) -> Result<(EnvelopeCompressor, bool), Status> {
    if response.status != StatusCode::OK {
        return Err(Status::new(
            Code::from_http_status(response.status),
            format!("HTTP {}", response.status),
        )
        .with_metadata(response.headers.clone()));
    }

    let trailers_only = match find_grpc_status(&response.headers) {
        Some(Err(status)) => return Err(status),
        Some(Ok(())) => true,
        None => false,
    };

    if !trailers_only {
        let content_type = response.content_type().unwrap_or_default();
        if !encoding_ok(content_type) {
            return Err(Status::internal(format!(
                "unexpected response content type \"{content_type}\""
            )));
        }
    }

    let algorithm = match header_str(&response.headers, HEADER_GRPC_ENCODING) {
        None | Some("identity") => None,
        Some(name) => Some(options.compression.get(name).ok_or_else(|| {
            Status::internal(format!("unsupported response encoding \"{name}\""))
        })?),
    };

    Ok((options.compressor(algorithm), trailers_only))
}

#[async_trait]
impl ProtocolAdapter for GrpcAdapter {
    fn name(&self) -> &'static str {
        "grpc"
    }

    fn options(&self) -> &ProtocolOptions {
        &self.options
    }

    fn allows_method(&self, _descriptor: &MethodDescriptor, method: &Method) -> bool {
        method == Method::POST
    }

    fn matches(
        &self,
        descriptor: &MethodDescriptor,
        method: &Method,
        content_type: Option<&str>,
    ) -> bool {
        self.allows_method(descriptor, method)
            && content_type.is_some_and(|content_type| self.parse_content_type(content_type).is_some())
    }

    fn supported_content_types(&self, _descriptor: &MethodDescriptor) -> Vec<&'static str> {
        GRPC_CONTENT_TYPES.to_vec()
    }

    fn decode_request_metadata(
        &self,
        _descriptor: &MethodDescriptor,
        _method: &Method,
        _uri: &Uri,
        headers: &HeaderMap,
    ) -> RequestMetadata {
        let encoding = header_str(headers, HEADER_CONTENT_TYPE)
            .and_then(|content_type| self.parse_content_type(content_type));
        decode_grpc_metadata(&self.options, encoding, headers)
    }

    fn read_request(
        &self,
        _descriptor: &MethodDescriptor,
        request: RpcHttpRequest,
        metadata: &RequestMetadata,
    ) -> MessageStream {
        request_messages(
            request.body,
            self.options.compressor(metadata.compression.request.clone()),
            self.options.read_max_bytes,
        )
    }

    async fn build_response(
        &self,
        context: &CallContext,
        metadata: &RequestMetadata,
        mut output: MessageStream,
    ) -> RpcHttpResponse {
        let content_type = grpc_content_type("application/grpc", metadata.encoding);
        let first = output.next().await;

        if let Some(Err(status)) = first {
            // Trailers-only: nothing was sent, so the status travels in the head.
            let mut headers = grpc_response_headers(&self.options, &content_type, metadata, false);
            append_all(&mut headers, &context.take_response_headers());
            append_all(&mut headers, &context.take_response_trailers());
            set_grpc_status(&mut headers, Some(&status));
            return RpcHttpResponse::new(StatusCode::OK, headers, stream::empty().boxed());
        }

        let compressor = self.options.compressor(metadata.compression.response.clone());
        let mut headers = grpc_response_headers(&self.options, &content_type, metadata, true);
        append_all(&mut headers, &context.take_response_headers());

        let trailer_context = context.clone();
        let body = response_body(
            first.and_then(Result::ok),
            output,
            compressor,
            self.options.write_max_bytes,
            Box::new(move |error| {
                let mut trailers = trailer_context.take_response_trailers();
                set_grpc_status(&mut trailers, error.as_ref());
                vec![BodyFrame::Trailers(trailers)]
            }),
        );

        RpcHttpResponse::new(StatusCode::OK, headers, body)
    }

    async fn build_request(
        &self,
        call: &ClientCall,
        messages: MessageStream,
    ) -> Result<RpcHttpRequest, Status> {
        let mut headers = grpc_request_headers(
            &self.options,
            call,
            &grpc_content_type("application/grpc", call.encoding),
        );
        set_header(&mut headers, HEADER_TE, "trailers");

        let body = request_body(
            messages,
            self.options.compressor(call.send_compression.clone()),
            self.options.write_max_bytes,
        );

        Ok(RpcHttpRequest::new(
            Method::POST,
            call_uri(&call.base_uri, &call.descriptor, None)?,
            headers,
            body,
        )
        .with_version(Version::HTTP_2))
    }

    async fn read_response(
        &self,
        _call: &ClientCall,
        response: RpcHttpResponse,
    ) -> Result<ClientResponse, Status> {
        let (compressor, trailers_only) = check_grpc_response_head(&self.options, &response, |ct| {
            self.parse_content_type(ct).is_some()
        })?;

        let trailers = TrailerSlot::default();
        if trailers_only {
            trailers.set(response.headers.clone());
            return Ok(ClientResponse {
                headers: response.headers,
                messages: stream::empty().boxed(),
                trailers,
            });
        }

        let (data, http_trailers) = split_trailers(response.body);
        let envelopes = read_envelopes(data, compressor, self.options.read_max_bytes);
        let client_trailers = trailers.clone();

        let messages = response_messages(
            envelopes,
            |_| false,
            |_| Ok(()),
            move |_| {
                let received = http_trailers.take().unwrap_or_default();
                client_trailers.set(received.clone());
                match find_grpc_status(&received) {
                    Some(outcome) => outcome,
                    None => Err(Status::data_loss("protocol error: missing trailer")),
                }
            },
        );

        Ok(ClientResponse {
            headers: response.headers,
            messages,
            trailers,
        })
    }
}
