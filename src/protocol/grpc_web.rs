use crate::body::{BodyFrame, TrailerSlot, split_trailers};
use crate::constants::{
    ENVELOPE_FLAG_GRPC_WEB_TRAILER, GRPC_WEB_INTERNAL_TRAILER_FRAME, HEADER_CONTENT_TYPE,
    HEADER_X_GRPC_WEB,
};
use crate::context::CallContext;
use crate::envelope::{Envelope, EnvelopeCodec};
use crate::method::{MethodDescriptor, MethodKind};
use crate::protocol::content_type_cache::ContentTypeCache;
use crate::protocol::enveloped::{read_envelopes, request_messages, response_body, response_messages};
use crate::protocol::grpc::{
    call_uri, check_grpc_response_head, decode_grpc_metadata, grpc_content_type,
    grpc_request_headers, grpc_response_headers, parse_grpc_family, request_body,
};
use crate::protocol::grpc_status::{find_grpc_status, set_grpc_status};
use crate::protocol::headers::{append_all, header_str, set_header};
use crate::protocol::trailer_block::{decode_trailer_block, encode_trailer_block};
use crate::protocol::{
    ClientCall, ClientResponse, Encoding, MessageStream, ProtocolAdapter, ProtocolOptions,
    RequestMetadata, RpcHttpRequest, RpcHttpResponse,
};
use crate::status::Status;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use http::{HeaderMap, Method, StatusCode, Uri, Version};

const GRPC_WEB_BASE: &str = "application/grpc-web";
const GRPC_WEB_CONTENT_TYPES: [&str; 3] = [
    "application/grpc-web",
    "application/grpc-web+proto",
    "application/grpc-web+json",
];

/// gRPC-Web: gRPC framing with trailers carried in a final envelope, usable
/// over HTTP/1.1 and from clients that cannot read HTTP trailers.
#[derive(Debug)]
pub struct GrpcWebAdapter {
    options: ProtocolOptions,
    content_types: ContentTypeCache<Option<Encoding>>,
}

impl GrpcWebAdapter {
    pub fn new(options: ProtocolOptions) -> Self {
        let content_types = ContentTypeCache::new(options.content_type_cache_capacity);
        Self {
            options,
            content_types,
        }
    }

    pub fn parse_content_type(&self, content_type: &str) -> Option<Encoding> {
        self.content_types
            .get_or_insert_with(content_type, |value| parse_grpc_family(value, GRPC_WEB_BASE))
    }
}

/// The trailer envelope ending a gRPC-Web body.
///
/// Trailers too large to frame are replaced by a bare `Internal` status.
fn trailer_frame(trailers: &HeaderMap) -> BodyFrame {
    let block = encode_trailer_block(trailers);
    let frame = EnvelopeCodec::frame(ENVELOPE_FLAG_GRPC_WEB_TRAILER, &block).unwrap_or_else(|err| {
        tracing::error!(%err, "Failed to frame grpc-web trailers");
        Bytes::from_static(GRPC_WEB_INTERNAL_TRAILER_FRAME)
    });
    BodyFrame::Data(frame)
}

#[async_trait]
impl ProtocolAdapter for GrpcWebAdapter {
    fn name(&self) -> &'static str {
        "grpc-web"
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
        GRPC_WEB_CONTENT_TYPES.to_vec()
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
        let content_type = grpc_content_type(GRPC_WEB_BASE, metadata.encoding);
        let first = output.next().await;

        let compressed = matches!(first, Some(Ok(_)));
        let mut headers = grpc_response_headers(&self.options, &content_type, metadata, compressed);
        append_all(&mut headers, &context.take_response_headers());

        let (first, early_error) = match first {
            Some(Ok(message)) => (Some(message), None),
            Some(Err(status)) => (None, Some(status)),
            None => (None, None),
        };
        let rest = match early_error {
            Some(status) => futures::stream::once(async move { Err(status) }).boxed(),
            None => output,
        };

        let trailer_context = context.clone();
        let body = response_body(
            first,
            rest,
            self.options.compressor(metadata.compression.response.clone()),
            self.options.write_max_bytes,
            Box::new(move |error| {
                let mut trailers = trailer_context.take_response_trailers();
                set_grpc_status(&mut trailers, error.as_ref());
                vec![trailer_frame(&trailers)]
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
            &grpc_content_type(GRPC_WEB_BASE, call.encoding),
        );
        set_header(&mut headers, HEADER_X_GRPC_WEB, "1");

        // Full duplex needs HTTP/2; every other shape works over HTTP/1.1.
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
                messages: futures::stream::empty().boxed(),
                trailers,
            });
        }

        // Some servers send real trailers even to gRPC-Web clients.
        let (data, http_trailers) = split_trailers(response.body);
        let envelopes = read_envelopes(data, compressor, self.options.read_max_bytes);
        let from_envelope = trailers.clone();
        let from_http = trailers.clone();

        let messages = response_messages(
            envelopes,
            Envelope::is_grpc_web_trailer,
            move |envelope: Envelope| {
                let received = decode_trailer_block(&envelope.data)?;
                from_envelope.set(received.clone());
                match find_grpc_status(&received) {
                    Some(outcome) => outcome,
                    None => Err(Status::internal("protocol error: missing grpc-status in trailer")),
                }
            },
            move |terminal_seen| {
                if terminal_seen {
                    return Ok(());
                }
                let received = http_trailers.take().unwrap_or_default();
                from_http.set(received.clone());
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

