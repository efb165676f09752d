use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, Version};
use std::sync::Arc;
use wirecall::body::{BodyFrame, ByteStream};
use wirecall::context::CallContext;
use wirecall::method::{MethodDescriptor, MethodKind};
use wirecall::protocol::{
    ClientCall, Encoding, Protocol, ProtocolAdapter, ProtocolOptions, RequestMetadata,
    RpcHttpResponse, decode_connect_error, decode_end_stream, decode_trailer_block,
    encode_connect_error, encode_end_stream, encode_trailer_block, find_grpc_status,
    set_grpc_status,
};
use wirecall::{Code, ErrorDetail, Status};

const UNARY: MethodDescriptor =
    MethodDescriptor::new("test.v1.Quota", "Take", MethodKind::Unary, "test.v1.In", "test.v1.Out");
const STREAM: MethodDescriptor = MethodDescriptor::new(
    "test.v1.Quota",
    "Watch",
    MethodKind::ServerStreaming,
    "test.v1.In",
    "test.v1.Out",
);

fn quota_error() -> Status {
    Status::resource_exhausted("quota").with_detail(ErrorDetail::new(
        "google.rpc.QuotaFailure",
        Bytes::from_static(&[0x0a, 0x03, 0x01, 0xff, 0x00]),
    ))
}

fn assert_same_error(decoded: &Status, original: &Status) {
    assert_eq!(decoded.code(), original.code());
    assert_eq!(decoded.message(), original.message());
    assert_eq!(decoded.details(), original.details());
}

#[test]
fn grpc_trailers_round_trip() {
    let original = quota_error();
    let mut trailers = HeaderMap::new();
    set_grpc_status(&mut trailers, Some(&original));

    assert_eq!(trailers.get("grpc-status").map(HeaderValue::as_bytes), Some(&b"8"[..]));
    let decoded = find_grpc_status(&trailers)
        .expect("status present")
        .expect_err("expected error");
    assert_same_error(&decoded, &original);
}

#[test]
fn grpc_web_trailer_block_round_trip() {
    let original = quota_error();
    let mut trailers = HeaderMap::new();
    set_grpc_status(&mut trailers, Some(&original));

    let block = encode_trailer_block(&trailers);
    let parsed = decode_trailer_block(&block).expect("parse failed");
    let decoded = find_grpc_status(&parsed)
        .expect("status present")
        .expect_err("expected error");
    assert_same_error(&decoded, &original);
}

#[test]
fn connect_unary_error_body_round_trip() {
    let original = quota_error();
    let body = encode_connect_error(&original);

    let decoded = decode_connect_error(&body, Code::Unknown, "Too Many Requests");
    assert_same_error(&decoded, &original);
    assert_eq!(original.code().to_http_status(), StatusCode::TOO_MANY_REQUESTS);
}

#[test]
fn connect_end_stream_round_trip() {
    let original = quota_error();
    let mut trailers = HeaderMap::new();
    trailers.insert("x-trailer", HeaderValue::from_static("t"));

    let payload = encode_end_stream(&trailers, Some(&original));
    let (parsed_trailers, error) = decode_end_stream(&payload).expect("parse failed");

    assert_eq!(parsed_trailers.get("x-trailer").map(HeaderValue::as_bytes), Some(&b"t"[..]));
    assert_same_error(&error.expect("expected error"), &original);
}

#[test]
fn grpc_message_is_percent_encoded() {
    let original = Status::internal("100% ünïcode\nline");
    let mut trailers = HeaderMap::new();
    set_grpc_status(&mut trailers, Some(&original));

    let raw = trailers.get("grpc-message").expect("message header");
    assert!(raw.to_str().expect("ascii").contains("100%25"));
    let decoded = find_grpc_status(&trailers)
        .expect("status present")
        .expect_err("expected error");
    assert_eq!(decoded.message(), original.message());
}

#[test]
fn unparseable_grpc_status_is_internal() {
    for value in ["abc", "99", "-1"] {
        let mut trailers = HeaderMap::new();
        trailers.insert("grpc-status", HeaderValue::from_static(value));
        let decoded = find_grpc_status(&trailers)
            .expect("status present")
            .expect_err("expected error");
        assert_eq!(decoded.code(), Code::Internal, "grpc-status {value}");
    }
}

#[test]
fn ok_grpc_status_is_not_an_error() {
    let mut trailers = HeaderMap::new();
    set_grpc_status(&mut trailers, None);
    assert!(matches!(find_grpc_status(&trailers), Some(Ok(()))));
    assert!(find_grpc_status(&HeaderMap::new()).is_none());
}

fn client_call(descriptor: MethodDescriptor) -> ClientCall {
    ClientCall {
        descriptor,
        base_uri: Uri::from_static("http://localhost"),
        encoding: Encoding::Binary,
        send_compression: None,
        timeout: None,
        headers: HeaderMap::new(),
        use_get: false,
    }
}

/// Rebuilds a response from its materialized frames so the client half can
/// read what the server half wrote.
async fn replay(response: RpcHttpResponse) -> RpcHttpResponse {
    let frames: Vec<_> = response.body.collect().await;
    RpcHttpResponse::new(response.status, response.headers, stream::iter(frames).boxed())
}

async fn round_trip_through_adapter(
    adapter: Arc<dyn ProtocolAdapter>,
    descriptor: MethodDescriptor,
) -> Status {
    let original = quota_error();
    let context = CallContext::new(descriptor, adapter.name(), HeaderMap::new(), None, []);
    let output: ByteStream = stream::once(async move { Err(quota_error()) }).boxed();

    let response = adapter
        .build_response(&context, &RequestMetadata::default(), output)
        .await;
    let response = replay(response).await;

    let call = client_call(descriptor);
    let error = match adapter.read_response(&call, response).await {
        Err(status) => status,
        Ok(mut client) => {
            let items: Vec<_> = client.messages.by_ref().collect().await;
            assert_eq!(items.len(), 1, "only the terminal error is expected");
            items
                .into_iter()
                .next()
                .and_then(Result::err)
                .expect("expected terminal error")
        }
    };

    assert_same_error(&error, &original);
    error
}

#[tokio::test]
async fn every_adapter_round_trips_an_error() {
    let options = ProtocolOptions::default();
    for protocol in Protocol::ALL {
        round_trip_through_adapter(protocol.adapter(options.clone()), STREAM).await;
    }
    round_trip_through_adapter(Protocol::Connect.adapter(options), UNARY).await;
}

#[tokio::test]
async fn grpc_error_before_first_message_is_trailers_only() {
    let adapter = Protocol::Grpc.adapter(ProtocolOptions::default());
    let context = CallContext::new(STREAM, adapter.name(), HeaderMap::new(), None, []);
    let output: ByteStream = stream::once(async move { Err(quota_error()) }).boxed();

    let response = adapter
        .build_response(&context, &RequestMetadata::default(), output)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers.get("grpc-status").map(HeaderValue::as_bytes),
        Some(&b"8"[..])
    );
    let frames: Vec<_> = response.body.collect().await;
    assert!(frames.is_empty());
}

#[tokio::test]
async fn connect_unary_trailers_travel_as_prefixed_headers() {
    let adapter = Protocol::Connect.adapter(ProtocolOptions::default());
    let context = CallContext::new(UNARY, adapter.name(), HeaderMap::new(), None, []);
    context
        .response_trailers()
        .insert("x-cost", HeaderValue::from_static("3"));
    let output: ByteStream = stream::once(async { Ok(Bytes::from_static(b"out")) }).boxed();

    let response = adapter
        .build_response(&context, &RequestMetadata::default(), output)
        .await;
    assert_eq!(
        response.headers.get("trailer-x-cost").map(HeaderValue::as_bytes),
        Some(&b"3"[..])
    );

    let response = replay(response).await;
    let mut client = adapter
        .read_response(&client_call(UNARY), response)
        .await
        .expect("read failed");
    let messages: Vec<_> = client.messages.by_ref().collect().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].as_ref().expect("message"), "out");

    let trailers = client.trailers.take().expect("trailers");
    assert_eq!(trailers.get("x-cost").map(HeaderValue::as_bytes), Some(&b"3"[..]));
    assert!(client.headers.get("trailer-x-cost").is_none());
}

#[tokio::test]
async fn missing_end_stream_is_detected() {
    let adapter = Protocol::Connect.adapter(ProtocolOptions::default());
    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static("application/connect+proto"));
    let message = wirecall::envelope::EnvelopeCodec::frame(0, b"m").expect("frame");
    let response = RpcHttpResponse::new(
        StatusCode::OK,
        headers,
        stream::iter(vec![Ok(BodyFrame::Data(message))]).boxed(),
    );

    let client = adapter
        .read_response(&client_call(STREAM), response)
        .await
        .expect("head ok");
    let items: Vec<_> = client.messages.collect().await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert_eq!(
        items[1].as_ref().expect_err("expected error").code(),
        Code::DataLoss
    );
}

#[test]
fn unknown_connect_end_stream_code_is_internal() {
    let (_, error) =
        decode_end_stream(br#"{"error":{"code":"bogus","message":"x"}}"#).expect("parse failed");
    let error = error.expect("expected error");

    assert_eq!(error.code(), Code::Internal);
    assert_eq!(error.message(), "x");
}

#[test]
fn unknown_connect_unary_code_is_internal() {
    let decoded = decode_connect_error(br#"{"code":"bogus"}"#, Code::Unavailable, "Service Unavailable");
    assert_eq!(decoded.code(), Code::Internal);

    let not_connect = decode_connect_error(b"<html>", Code::Unavailable, "Service Unavailable");
    assert_eq!(not_connect.code(), Code::Unavailable);
}

fn failed_unary_response(headers: HeaderMap, body: &'static [u8]) -> RpcHttpResponse {
    RpcHttpResponse::new(
        StatusCode::SERVICE_UNAVAILABLE,
        headers,
        stream::iter(vec![Ok(BodyFrame::Data(Bytes::from_static(body)))]).boxed(),
    )
}

async fn read_failed_unary(options: ProtocolOptions, response: RpcHttpResponse) -> Status {
    let adapter = Protocol::Connect.adapter(options);
    match adapter.read_response(&client_call(UNARY), response).await {
        Err(status) => status,
        Ok(_) => panic!("expected error"),
    }
}

#[tokio::test]
async fn oversized_connect_error_body_is_resource_exhausted() {
    let options = ProtocolOptions::default().with_read_max_bytes(16);
    let response = failed_unary_response(
        HeaderMap::new(),
        br#"{"code":"unavailable","message":"a body well past sixteen bytes"}"#,
    );

    let status = read_failed_unary(options, response).await;
    assert_eq!(status.code(), Code::ResourceExhausted);
}

#[tokio::test]
async fn corrupt_compressed_connect_error_body_is_invalid_argument() {
    let mut headers = HeaderMap::new();
    headers.insert("content-encoding", HeaderValue::from_static("gzip"));
    let response = failed_unary_response(headers, b"definitely not gzip");

    let status = read_failed_unary(ProtocolOptions::default(), response).await;
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn grpc_web_uses_http2_only_for_bidi_streams() {
    const BIDI: MethodDescriptor = MethodDescriptor::new(
        "test.v1.Quota",
        "Exchange",
        MethodKind::BiDiStreaming,
        "test.v1.In",
        "test.v1.Out",
    );
    let adapter = Protocol::GrpcWeb.adapter(ProtocolOptions::default());

    let bidi = adapter
        .build_request(&client_call(BIDI), stream::empty().boxed())
        .await
        .expect("build failed");
    assert_eq!(bidi.version, Version::HTTP_2);

    let unary = adapter
        .build_request(&client_call(UNARY), stream::empty().boxed())
        .await
        .expect("build failed");
    assert_eq!(unary.version, Version::HTTP_11);
}

#[test]
fn request_metadata_reads_grpc_headers() {
    let adapter = Protocol::Grpc.adapter(ProtocolOptions::default());
    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static("application/grpc+json"));
    headers.insert("grpc-timeout", HeaderValue::from_static("250m"));
    headers.insert("grpc-encoding", HeaderValue::from_static("gzip"));

    let metadata = adapter.decode_request_metadata(
        &STREAM,
        &Method::POST,
        &Uri::from_static("/test.v1.Quota/Watch"),
        &headers,
    );

    assert!(metadata.error.is_none());
    assert_eq!(metadata.encoding, Encoding::Json);
    assert_eq!(metadata.timeout, Some(std::time::Duration::from_millis(250)));
    assert_eq!(
        metadata.compression.request.as_ref().map(|a| a.name()),
        Some("gzip")
    );
}
