use http::{Method, StatusCode, Version};
use std::sync::Arc;
use wirecall::method::{Idempotency, MethodDescriptor, MethodKind};
use wirecall::protocol::{Protocol, ProtocolAdapter, ProtocolOptions, negotiate_protocol};

const UNARY: MethodDescriptor =
    MethodDescriptor::new("test.v1.Svc", "Get", MethodKind::Unary, "test.v1.In", "test.v1.Out");
const PURE_UNARY: MethodDescriptor = UNARY.with_idempotency(Idempotency::NoSideEffects);
const BIDI: MethodDescriptor =
    MethodDescriptor::new("test.v1.Svc", "Chat", MethodKind::BiDiStreaming, "test.v1.In", "test.v1.Out");

fn all_adapters() -> Vec<Arc<dyn ProtocolAdapter>> {
    Protocol::ALL
        .into_iter()
        .map(|protocol| protocol.adapter(ProtocolOptions::default()))
        .collect()
}

fn selected(
    adapters: &[Arc<dyn ProtocolAdapter>],
    descriptor: &MethodDescriptor,
    method: Method,
    content_type: Option<&str>,
) -> Result<&'static str, StatusCode> {
    negotiate_protocol(adapters, descriptor, &method, Version::HTTP_2, content_type)
        .map(|adapter| adapter.name())
        .map_err(|response| response.status)
}

#[test]
fn selects_by_content_type() {
    let adapters = all_adapters();
    let cases = [
        ("application/grpc", "grpc"),
        ("application/grpc+proto", "grpc"),
        ("application/grpc+json; charset=utf-8", "grpc"),
        ("application/grpc-web+proto", "grpc-web"),
        ("application/GRPC-WEB", "grpc-web"),
        ("application/proto", "connect"),
        ("application/json; charset=utf-8", "connect"),
    ];
    for (content_type, expected) in cases {
        assert_eq!(
            selected(&adapters, &UNARY, Method::POST, Some(content_type)),
            Ok(expected),
            "{content_type}"
        );
    }
}

#[test]
fn connect_streaming_content_types_depend_on_call_shape() {
    let adapters = all_adapters();
    let stream = MethodDescriptor::new("s", "m", MethodKind::ServerStreaming, "i", "o");

    assert_eq!(
        selected(&adapters, &stream, Method::POST, Some("application/connect+json")),
        Ok("connect")
    );
    assert_eq!(
        selected(&adapters, &stream, Method::POST, Some("application/json")),
        Err(StatusCode::UNSUPPORTED_MEDIA_TYPE)
    );
    assert_eq!(
        selected(&adapters, &UNARY, Method::POST, Some("application/connect+json")),
        Err(StatusCode::UNSUPPORTED_MEDIA_TYPE)
    );
}

#[test]
fn unmatched_verb_is_405() {
    let adapters = all_adapters();
    let result = negotiate_protocol(&adapters, &UNARY, &Method::PUT, Version::HTTP_2, None);
    let response = result.expect_err("expected rejection");
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        response.headers.get("allow").and_then(|v| v.to_str().ok()),
        Some("POST")
    );

    // GET is only for side-effect-free methods.
    assert_eq!(
        selected(&adapters, &UNARY, Method::GET, None),
        Err(StatusCode::METHOD_NOT_ALLOWED)
    );
    assert_eq!(selected(&adapters, &PURE_UNARY, Method::GET, None), Ok("connect"));
}

#[test]
fn unmatched_content_type_is_415_with_accept_post() {
    let adapters = all_adapters();
    let response = negotiate_protocol(
        &adapters,
        &UNARY,
        &Method::POST,
        Version::HTTP_2,
        Some("text/plain"),
    )
    .expect_err("expected rejection");

    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let accept_post = response
        .headers
        .get("accept-post")
        .and_then(|v| v.to_str().ok())
        .expect("accept-post header");
    assert!(accept_post.contains("application/grpc+proto"));
    assert!(accept_post.contains("application/json"));
}

#[test]
fn missing_content_type_with_single_candidate_is_accepted() {
    let connect_only = vec![Protocol::Connect.adapter(ProtocolOptions::default())];
    assert_eq!(
        selected(&connect_only, &UNARY, Method::POST, None),
        Ok("connect")
    );

    // With several candidates the content type decides, and there is none.
    let adapters = all_adapters();
    assert_eq!(
        selected(&adapters, &UNARY, Method::POST, None),
        Err(StatusCode::UNSUPPORTED_MEDIA_TYPE)
    );
}

#[test]
fn bidi_over_http1_is_505_and_closes() {
    let adapters = all_adapters();
    let response = negotiate_protocol(
        &adapters,
        &BIDI,
        &Method::POST,
        Version::HTTP_11,
        Some("application/grpc"),
    )
    .expect_err("expected rejection");

    assert_eq!(response.status, StatusCode::HTTP_VERSION_NOT_SUPPORTED);
    assert_eq!(
        response.headers.get("connection").and_then(|v| v.to_str().ok()),
        Some("close")
    );

    let over_h2 = negotiate_protocol(
        &adapters,
        &BIDI,
        &Method::POST,
        Version::HTTP_2,
        Some("application/grpc"),
    );
    assert!(over_h2.is_ok());
}
