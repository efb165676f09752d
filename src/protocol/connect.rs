use crate::body::{BodyFrame, TrailerSlot, collect_bytes, once_bytes, split_trailers};
use crate::compression::{CompressionAlgorithm, negotiate_compression};
use crate::constants::{
    CONNECT_INTERNAL_END_STREAM_FRAME, CONNECT_PROTOCOL_VERSION, CONNECT_TRAILER_PREFIX,
    ENVELOPE_FLAG_CONNECT_END_STREAM,
    HEADER_ACCEPT_ENCODING, HEADER_CONNECT_ACCEPT_ENCODING, HEADER_CONNECT_CONTENT_ENCODING,
    HEADER_CONNECT_PROTOCOL_VERSION, HEADER_CONNECT_TIMEOUT_MS, HEADER_CONTENT_ENCODING,
    HEADER_CONTENT_TYPE, HEADER_USER_AGENT, QUERY_BASE64, QUERY_COMPRESSION, QUERY_CONNECT,
    QUERY_CONNECT_VALUE, QUERY_ENCODING, QUERY_MESSAGE, USER_AGENT,
};
use crate::context::CallContext;
use crate::envelope::{Envelope, EnvelopeCodec};
use crate::method::{MethodDescriptor, MethodKind};
use crate::protocol::connect_error::{
    decode_connect_error, decode_end_stream, encode_connect_error, encode_end_stream,
};
use crate::protocol::content_type_cache::ContentTypeCache;
use crate::protocol::encoding::{encoding_from_suffix, parse_media_type};
use crate::protocol::enveloped::{read_envelopes, request_messages, response_body, response_messages};
use crate::protocol::grpc::{call_uri, request_body};
use crate::protocol::headers::{append_all, header_str, set_header};
use crate::protocol::timeout::{encode_connect_timeout, parse_connect_timeout};
use crate::protocol::{
    ClientCall, ClientResponse, Encoding, MessageStream, ProtocolAdapter, ProtocolOptions,
    RequestMetadata, RpcHttpRequest, RpcHttpResponse,
};
use crate::status::{Code, Status};
use crate::utils::{decode_base64_lenient, encode_base64_url, query_decode, query_encode};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use http::{HeaderMap, HeaderName, Method, StatusCode, Uri, Version};
use std::sync::Arc;
use std::time::Duration;

const UNARY_CONTENT_TYPES: [&str; 2] = ["application/proto", "application/json"];
const STREAM_CONTENT_TYPES: [&str; 2] = ["application/connect+proto", "application/connect+json"];

/// A parsed Connect content type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConnectContentType {
    pub streaming: bool,
    pub encoding: Encoding,
}

/// The Connect protocol: plain HTTP bodies for unary calls (including GET
/// for side-effect-free methods), enveloped bodies with an end-of-stream
/// record for streaming calls.
#[derive(Debug)]
pub struct ConnectAdapter {
    options: ProtocolOptions,
    content_types: ContentTypeCache<Option<ConnectContentType>>,
}

impl ConnectAdapter {
    pub fn new(options: ProtocolOptions) -> Self {
        let content_types = ContentTypeCache::new(options.content_type_cache_capacity);
        Self {
            options,
            content_types,
        }
    }

    pub fn parse_content_type(&self, content_type: &str) -> Option<ConnectContentType> {
        self.content_types
            .get_or_insert_with(content_type, parse_connect_content_type)
    }

    fn encoding_matches(&self, content_type: &str, streaming: bool) -> bool {
        self.parse_content_type(content_type)
            .is_some_and(|parsed| parsed.streaming == streaming)
    }

    fn decode_get_metadata(&self, uri: &Uri, headers: &HeaderMap) -> RequestMetadata {
        let query = GetQuery::parse(uri);
        let mut error = None;

        match query.connect.as_deref() {
            Some(QUERY_CONNECT_VALUE) => {}
            Some(other) => {
                error = Some(Status::invalid_argument(format!(
                    "connect must be \"{QUERY_CONNECT_VALUE}\": got \"{other}\""
                )));
            }
            None if self.options.require_connect_protocol_header => {
                error = Some(Status::invalid_argument(format!(
                    "missing required parameter: set {QUERY_CONNECT} to \"{QUERY_CONNECT_VALUE}\""
                )));
            }
            None => {}
        }

        let encoding = match query.encoding.as_deref().map(Encoding::from_name) {
            Some(Some(encoding)) => encoding,
            Some(None) | None => {
                error.get_or_insert_with(|| {
                    Status::invalid_argument(format!(
                        "invalid or missing {QUERY_ENCODING} parameter: {:?}",
                        query.encoding.as_deref().unwrap_or_default()
                    ))
                });
                Encoding::default()
            }
        };

        let compression = negotiate_compression(
            &self.options.compression,
            query.compression.as_deref(),
            header_str(headers, HEADER_ACCEPT_ENCODING),
            HEADER_ACCEPT_ENCODING,
        );
        if let Some(err) = &compression.error {
            error.get_or_insert_with(|| err.clone());
        }

        let timeout = self.decode_timeout(headers, &mut error);
        RequestMetadata {
            encoding,
            timeout,
            compression,
            error,
        }
    }

    fn decode_post_metadata(&self, descriptor: &MethodDescriptor, headers: &HeaderMap) -> RequestMetadata {
        let mut error = None;

        match header_str(headers, HEADER_CONNECT_PROTOCOL_VERSION) {
            Some(CONNECT_PROTOCOL_VERSION) => {}
            Some(other) => {
                error = Some(Status::invalid_argument(format!(
                    "{HEADER_CONNECT_PROTOCOL_VERSION} must be \"{CONNECT_PROTOCOL_VERSION}\": got \"{other}\""
                )));
            }
            None if self.options.require_connect_protocol_header => {
                error = Some(Status::invalid_argument(format!(
                    "missing required header: set {HEADER_CONNECT_PROTOCOL_VERSION} to \"{CONNECT_PROTOCOL_VERSION}\""
                )));
            }
            None => {}
        }

        let encoding = header_str(headers, HEADER_CONTENT_TYPE)
            .and_then(|content_type| self.parse_content_type(content_type))
            .map(|parsed| parsed.encoding)
            .unwrap_or_default();

        let (encoding_header, accept_header) = if descriptor.kind.is_unary() {
            (HEADER_CONTENT_ENCODING, HEADER_ACCEPT_ENCODING)
        } else {
            (HEADER_CONNECT_CONTENT_ENCODING, HEADER_CONNECT_ACCEPT_ENCODING)
        };
        let compression = negotiate_compression(
            &self.options.compression,
            header_str(headers, encoding_header),
            header_str(headers, accept_header),
            accept_header,
        );
        if let Some(err) = &compression.error {
            error.get_or_insert_with(|| err.clone());
        }

        let timeout = self.decode_timeout(headers, &mut error);
        RequestMetadata {
            encoding,
            timeout,
            compression,
            error,
        }
    }

    fn decode_timeout(&self, headers: &HeaderMap, error: &mut Option<Status>) -> Option<Duration> {
        let timeout = match header_str(headers, HEADER_CONNECT_TIMEOUT_MS).map(parse_connect_timeout) {
            Some(Ok(timeout)) => Some(timeout),
            Some(Err(err)) => {
                error.get_or_insert(err);
                None
            }
            None => None,
        };
        self.options.clamp_timeout(timeout)
    }

    fn accept_encoding_header(&self, headers: &mut HeaderMap, name: &'static str) {
        if let Some(accept) = self.options.compression.accept_header_value() {
            set_header(headers, name, &accept);
        }
    }

    /// Compresses a unary body when an algorithm is set and the threshold is met.
    fn compress_unary(
        &self,
        algorithm: Option<&Arc<dyn CompressionAlgorithm>>,
        message: Bytes,
    ) -> Result<(Bytes, Option<&'static str>), Status> {
        if message.len() > self.options.write_max_bytes {
            return Err(Status::resource_exhausted(format!(
                "message size {} exceeds writeMaxBytes {}",
                message.len(),
                self.options.write_max_bytes
            )));
        }
        match algorithm {
            Some(algorithm) if message.len() >= self.options.compress_min_bytes => {
                Ok((algorithm.compress(&message)?, Some(algorithm.name())))
            }
            _ => Ok((message, None)),
        }
    }

    async fn build_unary_response(
        &self,
        context: &CallContext,
        metadata: &RequestMetadata,
        mut output: MessageStream,
    ) -> RpcHttpResponse {
        let outcome = match output.next().await {
            Some(Ok(message)) => match output.next().await {
                None => Ok(message),
                Some(Ok(_)) => Err(Status::invalid_argument(
                    "protocol error: unary response has multiple messages",
                )),
                Some(Err(err)) => Err(err),
            },
            Some(Err(err)) => Err(err),
            None => Err(Status::invalid_argument("protocol error: missing output message")),
        };

        let outcome = outcome.and_then(|message| {
            self.compress_unary(metadata.compression.response.as_ref(), message)
        });

        let mut headers = HeaderMap::new();
        self.accept_encoding_header(&mut headers, HEADER_ACCEPT_ENCODING);
        append_all(&mut headers, &context.take_response_headers());
        let trailers = context.take_response_trailers();

        match outcome {
            Ok((body, content_encoding)) => {
                set_header(
                    &mut headers,
                    HEADER_CONTENT_TYPE,
                    &format!("application/{}", metadata.encoding.as_str()),
                );
                if let Some(name) = content_encoding {
                    set_header(&mut headers, HEADER_CONTENT_ENCODING, name);
                }
                append_trailers_as_headers(&mut headers, &trailers);
                RpcHttpResponse::new(StatusCode::OK, headers, stream::empty().boxed()).with_data(body)
            }
            Err(status) => {
                tracing::debug!(code = %status.code(), message = status.message(), "unary call failed");
                set_header(&mut headers, HEADER_CONTENT_TYPE, "application/json");
                append_all(&mut headers, status.metadata());
                append_trailers_as_headers(&mut headers, &trailers);
                RpcHttpResponse::new(status.code().to_http_status(), headers, stream::empty().boxed())
                    .with_data(encode_connect_error(&status))
            }
        }
    }

    async fn build_unary_request(
        &self,
        call: &ClientCall,
        mut messages: MessageStream,
    ) -> Result<RpcHttpRequest, Status> {
        let message = messages
            .next()
            .await
            .ok_or_else(|| Status::internal("unary request has no message"))??;
        let (payload, compression) = self.compress_unary(call.send_compression.as_ref(), message)?;

        let mut headers = HeaderMap::new();
        append_all(&mut headers, &call.headers);
        set_header(&mut headers, HEADER_USER_AGENT, USER_AGENT);
        if let Some(timeout) = call.timeout {
            set_header(&mut headers, HEADER_CONNECT_TIMEOUT_MS, &encode_connect_timeout(timeout));
        }
        self.accept_encoding_header(&mut headers, HEADER_ACCEPT_ENCODING);

        if call.use_get && call.descriptor.allows_get() {
            let query = encode_get_query(call.encoding, &payload, compression);
            return Ok(RpcHttpRequest::new(
                Method::GET,
                call_uri(&call.base_uri, &call.descriptor, Some(&query))?,
                headers,
                stream::empty().boxed(),
            )
            .with_version(Version::HTTP_11));
        }

        set_header(&mut headers, HEADER_CONNECT_PROTOCOL_VERSION, CONNECT_PROTOCOL_VERSION);
        set_header(
            &mut headers,
            HEADER_CONTENT_TYPE,
            &format!("application/{}", call.encoding.as_str()),
        );
        if let Some(name) = compression {
            set_header(&mut headers, HEADER_CONTENT_ENCODING, name);
        }

        Ok(RpcHttpRequest::new(
            Method::POST,
            call_uri(&call.base_uri, &call.descriptor, None)?,
            headers,
            once_bytes(payload),
        )
        .with_version(Version::HTTP_11))
    }

    async fn read_unary_response(
        &self,
        response: RpcHttpResponse,
    ) -> Result<ClientResponse, Status> {
        let (headers, received_trailers) = split_unary_trailers(&response.headers);
        let trailers = TrailerSlot::default();
        trailers.set(received_trailers.clone());

        let algorithm = match header_str(&headers, HEADER_CONTENT_ENCODING) {
            None | Some("identity") => None,
            Some(name) => Some(self.options.compression.get(name).ok_or_else(|| {
                Status::internal(format!("unsupported response encoding \"{name}\""))
            })?),
        };
        let read_max_bytes = self.options.read_max_bytes;
        let (data, _) = split_trailers(response.body);

        if response.status != StatusCode::OK {
            let body = collect_bytes(data, read_max_bytes).await?;
            let body = match &algorithm {
                Some(algorithm) => algorithm.decompress(&body, read_max_bytes)?,
                None => body,
            };
            let fallback = Code::from_http_status(response.status);
            let mut status = decode_connect_error(
                &body,
                fallback,
                response.status.canonical_reason().unwrap_or(response.status.as_str()),
            );
            append_all(status.metadata_mut(), &headers);
            append_all(status.metadata_mut(), &received_trailers);
            return Err(status);
        }

        let content_type = header_str(&headers, HEADER_CONTENT_TYPE).unwrap_or_default();
        if !self.encoding_matches(content_type, false) {
            return Err(Status::internal(format!(
                "unexpected response content type \"{content_type}\""
            )));
        }

        let messages = stream::once(async move {
            let body = collect_bytes(data, read_max_bytes).await?;
            match algorithm {
                Some(algorithm) => algorithm.decompress(&body, read_max_bytes),
                None => Ok(body),
            }
        })
        .boxed();

        Ok(ClientResponse {
            headers,
            messages,
            trailers,
        })
    }
}

/// Parses `application/(connect+)?(proto|json)[; charset=utf-8]`.
fn parse_connect_content_type(content_type: &str) -> Option<ConnectContentType> {
    let (media, charset) = parse_media_type(content_type);
    let subtype = media.strip_prefix("application/")?;
    let (streaming, suffix) = match subtype.strip_prefix("connect+") {
        Some(suffix) => (true, suffix),
        None => (false, subtype),
    };
    let encoding = encoding_from_suffix(suffix, charset.as_deref())?;
    Some(ConnectContentType { streaming, encoding })
}

/// Copies trailers into the head under the `trailer-` prefix.
fn append_trailers_as_headers(headers: &mut HeaderMap, trailers: &HeaderMap) {
    for (name, value) in trailers.iter() {
        let prefixed = format!("{CONNECT_TRAILER_PREFIX}{}", name.as_str());
        if let Ok(name) = HeaderName::from_bytes(prefixed.as_bytes()) {
            headers.append(name, value.clone());
        }
    }
}

/// Separates `trailer-` prefixed entries from the real headers.
fn split_unary_trailers(received: &HeaderMap) -> (HeaderMap, HeaderMap) {
    let mut headers = HeaderMap::new();
    let mut trailers = HeaderMap::new();
    for (name, value) in received.iter() {
        match name.as_str().strip_prefix(CONNECT_TRAILER_PREFIX) {
            Some(stripped) => {
                if let Ok(name) = HeaderName::from_bytes(stripped.as_bytes()) {
                    trailers.append(name, value.clone());
                }
            }
            None => {
                headers.append(name.clone(), value.clone());
            }
        }
    }
    (headers, trailers)
}

/// Query string of a unary GET request.
///
/// A compressed message is always base64 encoded, and so is a binary one.
fn encode_get_query(encoding: Encoding, payload: &[u8], compression: Option<&str>) -> String {
    let base64 = compression.is_some() || encoding == Encoding::Binary;
    let mut query = format!(
        "{QUERY_CONNECT}={QUERY_CONNECT_VALUE}&{QUERY_ENCODING}={}",
        encoding.as_str()
    );
    if base64 {
        query.push_str(&format!("&{QUERY_BASE64}=1&{QUERY_MESSAGE}={}", encode_base64_url(payload)));
    } else {
        query.push_str(&format!("&{QUERY_MESSAGE}={}", query_encode(payload)));
    }
    if let Some(name) = compression {
        query.push_str(&format!("&{QUERY_COMPRESSION}={}", query_encode(name.as_bytes())));
    }
    query
}

#[derive(Debug, Default)]
struct GetQuery {
    connect: Option<String>,
    encoding: Option<String>,
    compression: Option<String>,
    base64: bool,
    message: Option<Vec<u8>>,
}

impl GetQuery {
    fn parse(uri: &Uri) -> Self {
        let mut query = GetQuery::default();
        for pair in uri.query().unwrap_or_default().split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let text = || String::from_utf8_lossy(&query_decode(value)).into_owned();
            match key {
                QUERY_CONNECT => query.connect = Some(text()),
                QUERY_ENCODING => query.encoding = Some(text()),
                QUERY_COMPRESSION => query.compression = Some(text()),
                QUERY_BASE64 => query.base64 = value == "1",
                QUERY_MESSAGE => query.message = Some(query_decode(value)),
                _ => {}
            }
        }
        query
    }

    fn message(&self) -> Result<Bytes, Status> {
        let raw = self.message.clone().unwrap_or_default();
        if !self.base64 {
            return Ok(Bytes::from(raw));
        }
        let text = String::from_utf8_lossy(&raw);
        decode_base64_lenient(&text)
            .map(Bytes::from)
            .map_err(|err| Status::invalid_argument(format!("invalid base64 message: {err}")))
    }
}

#[async_trait]
impl ProtocolAdapter for ConnectAdapter {
    fn name(&self) -> &'static str {
        "connect"
    }

    fn options(&self) -> &ProtocolOptions {
        &self.options
    }

    fn allows_method(&self, descriptor: &MethodDescriptor, method: &Method) -> bool {
        method == Method::POST || (method == Method::GET && descriptor.allows_get())
    }

    fn matches(
        &self,
        descriptor: &MethodDescriptor,
        method: &Method,
        content_type: Option<&str>,
    ) -> bool {
        if !self.allows_method(descriptor, method) {
            return false;
        }
        if method == Method::GET {
            return true;
        }
        let streaming = !descriptor.kind.is_unary();
        content_type.is_some_and(|content_type| self.encoding_matches(content_type, streaming))
    }

    fn supported_content_types(&self, descriptor: &MethodDescriptor) -> Vec<&'static str> {
        if descriptor.kind.is_unary() {
            UNARY_CONTENT_TYPES.to_vec()
        } else {
            STREAM_CONTENT_TYPES.to_vec()
        }
    }

    fn decode_request_metadata(
        &self,
        descriptor: &MethodDescriptor,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
    ) -> RequestMetadata {
        if method == Method::GET {
            self.decode_get_metadata(uri, headers)
        } else {
            self.decode_post_metadata(descriptor, headers)
        }
    }

    fn read_request(
        &self,
        descriptor: &MethodDescriptor,
        request: RpcHttpRequest,
        metadata: &RequestMetadata,
    ) -> MessageStream {
        let algorithm = metadata.compression.request.clone();
        let read_max_bytes = self.options.read_max_bytes;

        if request.method == Method::GET {
            let query = GetQuery::parse(&request.uri);
            return stream::once(async move {
                let message = query.message()?;
                match algorithm {
                    Some(algorithm) => algorithm.decompress(&message, read_max_bytes),
                    None if message.len() > read_max_bytes => Err(Status::resource_exhausted(
                        format!("message size is larger than configured readMaxBytes {read_max_bytes}"),
                    )),
                    None => Ok(message),
                }
            })
            .boxed();
        }

        if descriptor.kind.is_unary() {
            let body = request.body;
            return stream::once(async move {
                let message = collect_bytes(body, read_max_bytes).await?;
                match algorithm {
                    Some(algorithm) => algorithm.decompress(&message, read_max_bytes),
                    None => Ok(message),
                }
            })
            .boxed();
        }

        request_messages(request.body, self.options.compressor(algorithm), read_max_bytes)
    }

    async fn build_response(
        &self,
        context: &CallContext,
        metadata: &RequestMetadata,
        mut output: MessageStream,
    ) -> RpcHttpResponse {
        if context.descriptor().kind.is_unary() {
            return self.build_unary_response(context, metadata, output).await;
        }

        let first = output.next().await;
        let compressed = matches!(first, Some(Ok(_)));

        let mut headers = HeaderMap::new();
        set_header(
            &mut headers,
            HEADER_CONTENT_TYPE,
            &format!("application/connect+{}", metadata.encoding.as_str()),
        );
        self.accept_encoding_header(&mut headers, HEADER_CONNECT_ACCEPT_ENCODING);
        if compressed {
            if let Some(algorithm) = &metadata.compression.response {
                set_header(&mut headers, HEADER_CONNECT_CONTENT_ENCODING, algorithm.name());
            }
        }
        append_all(&mut headers, &context.take_response_headers());

        let (first, rest) = match first {
            Some(Ok(message)) => (Some(message), output),
            Some(Err(status)) => (None, stream::once(async move { Err(status) }).boxed()),
            None => (None, output),
        };
        let compressor = if compressed {
            self.options.compressor(metadata.compression.response.clone())
        } else {
            self.options.compressor(None)
        };

        let trailer_context = context.clone();
        let body = response_body(
            first,
            rest,
            compressor,
            self.options.write_max_bytes,
            Box::new(move |error| {
                let trailers = trailer_context.take_response_trailers();
                let payload = encode_end_stream(&trailers, error.as_ref());
                let frame = EnvelopeCodec::frame(ENVELOPE_FLAG_CONNECT_END_STREAM, &payload)
                    .unwrap_or_else(|err| {
                        tracing::error!(%err, "Failed to frame connect end-stream message");
                        Bytes::from_static(CONNECT_INTERNAL_END_STREAM_FRAME)
                    });
                vec![BodyFrame::Data(frame)]
            }),
        );

        RpcHttpResponse::new(StatusCode::OK, headers, body)
    }

    async fn build_request(
        &self,
        call: &ClientCall,
        messages: MessageStream,
    ) -> Result<RpcHttpRequest, Status> {
        if call.descriptor.kind.is_unary() {
            return self.build_unary_request(call, messages).await;
        }

        let mut headers = HeaderMap::new();
        append_all(&mut headers, &call.headers);
        set_header(
            &mut headers,
            HEADER_CONTENT_TYPE,
            &format!("application/connect+{}", call.encoding.as_str()),
        );
        set_header(&mut headers, HEADER_USER_AGENT, USER_AGENT);
        set_header(&mut headers, HEADER_CONNECT_PROTOCOL_VERSION, CONNECT_PROTOCOL_VERSION);
        if let Some(timeout) = call.timeout {
            set_header(&mut headers, HEADER_CONNECT_TIMEOUT_MS, &encode_connect_timeout(timeout));
        }
        if let Some(algorithm) = &call.send_compression {
            set_header(&mut headers, HEADER_CONNECT_CONTENT_ENCODING, algorithm.name());
        }
        self.accept_encoding_header(&mut headers, HEADER_CONNECT_ACCEPT_ENCODING);

        let version = if call.descriptor.kind == MethodKind::BiDiStreaming {
            Version::HTTP_2
        } else {
            Version::HTTP_11
        };

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
        .with_version(version))
    }

    async fn read_response(
        &self,
        call: &ClientCall,
        response: RpcHttpResponse,
    ) -> Result<ClientResponse, Status> {
        if call.descriptor.kind.is_unary() {
            return self.read_unary_response(response).await;
        }

        if response.status != StatusCode::OK {
            return Err(Status::new(
                Code::from_http_status(response.status),
                format!("HTTP {}", response.status),
            )
            .with_metadata(response.headers.clone()));
        }

        let content_type = response.content_type().unwrap_or_default();
        if !self.encoding_matches(content_type, true) {
            return Err(Status::internal(format!(
                "unexpected response content type \"{content_type}\""
            )));
        }

        let algorithm = match header_str(&response.headers, HEADER_CONNECT_CONTENT_ENCODING) {
            None | Some("identity") => None,
            Some(name) => Some(self.options.compression.get(name).ok_or_else(|| {
                Status::internal(format!("unsupported response encoding \"{name}\""))
            })?),
        };

        let (data, _) = split_trailers(response.body);
        let envelopes = read_envelopes(
            data,
            self.options.compressor(algorithm),
            self.options.read_max_bytes,
        );
        let trailers = TrailerSlot::default();
        let end_stream_trailers = trailers.clone();

        let messages = response_messages(
            envelopes,
            Envelope::is_connect_end_stream,
            move |envelope: Envelope| {
                let (received, error) = decode_end_stream(&envelope.data)?;
                end_stream_trailers.set(received);
                match error {
                    Some(status) => Err(status),
                    None => Ok(()),
                }
            },
            |terminal_seen| {
                if terminal_seen {
                    Ok(())
                } else {
                    Err(Status::data_loss("protocol error: missing EndStreamResponse"))
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

