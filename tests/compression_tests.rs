use std::sync::Arc;
use wirecall::Code;
use wirecall::compression::{
    CompressionAlgorithm, CompressionRegistry, Deflate, Gzip, negotiate_compression,
};

const ACCEPT: &str = "grpc-accept-encoding";

fn names(
    negotiated: &wirecall::compression::NegotiatedCompression,
) -> (Option<&'static str>, Option<&'static str>) {
    (
        negotiated.request.as_ref().map(|algorithm| algorithm.name()),
        negotiated.response.as_ref().map(|algorithm| algorithm.name()),
    )
}

#[test]
fn gzip_and_deflate_round_trip() {
    let payload = b"the quick brown fox jumps over the lazy dog ".repeat(50);
    let algorithms: [Arc<dyn CompressionAlgorithm>; 2] = [Arc::new(Gzip), Arc::new(Deflate)];

    for algorithm in algorithms {
        let compressed = algorithm.compress(&payload).expect("compress failed");
        assert!(compressed.len() < payload.len());
        let restored = algorithm
            .decompress(&compressed, payload.len())
            .expect("decompress failed");
        assert_eq!(restored, payload);
    }
}

#[test]
fn decompression_enforces_read_limit() {
    let payload = vec![0u8; 10_000];
    let compressed = Gzip.compress(&payload).expect("compress failed");

    let err = Gzip
        .decompress(&compressed, 9_999)
        .expect_err("expected limit error");
    assert_eq!(err.code(), Code::ResourceExhausted);
}

#[test]
fn garbage_input_is_invalid_argument() {
    let err = Gzip
        .decompress(b"definitely not gzip", 1024)
        .expect_err("expected error");
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[test]
fn negotiation_uses_requested_encoding_for_both_directions() {
    let registry = CompressionRegistry::with_defaults();
    let negotiated = negotiate_compression(&registry, Some("gzip"), None, ACCEPT);

    assert!(negotiated.error.is_none());
    assert_eq!(names(&negotiated), (Some("gzip"), Some("gzip")));
}

#[test]
fn negotiation_prefers_first_accepted_encoding() {
    let registry = CompressionRegistry::with_defaults();
    let negotiated = negotiate_compression(
        &registry,
        Some("gzip"),
        Some("br, deflate;q=0.9, gzip"),
        ACCEPT,
    );

    assert_eq!(names(&negotiated), (Some("gzip"), Some("deflate")));
}

#[test]
fn identity_means_no_compression() {
    let registry = CompressionRegistry::with_defaults();
    let negotiated = negotiate_compression(&registry, Some("identity"), Some("identity"), ACCEPT);

    assert!(negotiated.error.is_none());
    assert_eq!(names(&negotiated), (None, None));
}

#[test]
fn unknown_requested_encoding_is_unimplemented() {
    let registry = CompressionRegistry::with_defaults();
    let negotiated = negotiate_compression(&registry, Some("snappy"), None, ACCEPT);

    let err = negotiated.error.expect("expected error");
    assert_eq!(err.code(), Code::Unimplemented);
    assert!(err.message().contains("gzip,deflate"));
    assert_eq!(
        err.metadata().get(ACCEPT).and_then(|v| v.to_str().ok()),
        Some("gzip,deflate")
    );
}

#[test]
fn registry_replaces_same_name() {
    let registry = CompressionRegistry::new()
        .with(Arc::new(Gzip))
        .with(Arc::new(Deflate))
        .with(Arc::new(Gzip));

    assert_eq!(registry.names(), vec!["gzip", "deflate"]);
    assert_eq!(registry.accept_header_value().as_deref(), Some("gzip,deflate"));
    assert!(CompressionRegistry::new().accept_header_value().is_none());
}
