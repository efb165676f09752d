use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use rand::Rng;
use std::sync::Arc;
use wirecall::body::ByteStream;
use wirecall::compression::Gzip;
use wirecall::constants::{
    CONNECT_INTERNAL_END_STREAM_FRAME, ENVELOPE_FLAG_COMPRESSED, ENVELOPE_FLAG_CONNECT_END_STREAM,
    ENVELOPE_FLAG_GRPC_WEB_TRAILER, ENVELOPE_HEADER_SIZE, GRPC_WEB_INTERNAL_TRAILER_FRAME,
};
use wirecall::envelope::{Envelope, EnvelopeCodec, EnvelopeCompressor, EnvelopeStreamDecoder, unframe};
use wirecall::protocol::{decode_end_stream, decode_trailer_block, find_grpc_status};
use wirecall::{Code, Status};

fn chunks(parts: Vec<Vec<u8>>) -> ByteStream {
    stream::iter(parts.into_iter().map(|part| Ok::<_, Status>(Bytes::from(part)))).boxed()
}

#[test]
fn frame_writes_big_endian_header() {
    let framed = EnvelopeCodec::frame(0x02, b"abc").expect("frame failed");
    assert_eq!(&framed[..], &[0x02, 0, 0, 0, 3, b'a', b'b', b'c']);
}

#[tokio::test]
async fn unframe_recovers_any_payload_and_flags() {
    let mut rng = rand::rng();

    for _ in 0..64 {
        let len = rng.random_range(0..4096);
        let mut data = vec![0u8; len];
        rng.fill(&mut data[..]);
        let flags: u8 = rng.random();

        let framed = EnvelopeCodec::frame(flags, &data).expect("frame failed");
        let envelopes: Vec<_> = unframe(chunks(vec![framed.to_vec()]), usize::MAX)
            .collect()
            .await;

        assert_eq!(envelopes.len(), 1);
        let envelope = envelopes[0].as_ref().expect("expected envelope");
        assert_eq!(envelope.flags, flags);
        assert_eq!(envelope.data, data);
    }
}

#[tokio::test]
async fn unframe_handles_arbitrary_chunk_boundaries() {
    let mut rng = rand::rng();
    let payloads: Vec<Vec<u8>> = (0..10).map(|i| vec![i as u8; i * 37]).collect();

    let mut wire = Vec::new();
    for payload in &payloads {
        wire.extend_from_slice(&EnvelopeCodec::frame(0, payload).expect("frame failed"));
    }

    let mut parts = Vec::new();
    let mut rest = wire.as_slice();
    while !rest.is_empty() {
        let take = rng.random_range(1..=rest.len().min(17));
        let (head, tail) = rest.split_at(take);
        parts.push(head.to_vec());
        rest = tail;
    }

    let decoded: Vec<Vec<u8>> = unframe(chunks(parts), usize::MAX)
        .map(|envelope| envelope.expect("decode failed").data.to_vec())
        .collect()
        .await;

    assert_eq!(decoded, payloads);
}

#[tokio::test]
async fn empty_source_is_a_clean_end() {
    let envelopes: Vec<_> = unframe(chunks(vec![]), 1024).collect().await;
    assert!(envelopes.is_empty());
}

#[tokio::test]
async fn truncated_body_is_data_loss() {
    let framed = EnvelopeCodec::frame(0, &[7u8; 100]).expect("frame failed");
    let truncated = framed[..ENVELOPE_HEADER_SIZE + 40].to_vec();

    let envelopes: Vec<_> = unframe(chunks(vec![truncated]), 1024).collect().await;

    assert_eq!(envelopes.len(), 1);
    let err = envelopes[0].as_ref().expect_err("expected framing error");
    assert_eq!(err.code(), Code::DataLoss);
}

#[tokio::test]
async fn truncated_header_is_data_loss() {
    let mut wire = EnvelopeCodec::frame(0, b"ok").expect("frame failed").to_vec();
    wire.extend_from_slice(&[0, 0, 0]);

    let envelopes: Vec<_> = unframe(chunks(vec![wire]), 1024).collect().await;

    assert_eq!(envelopes.len(), 2);
    assert_eq!(envelopes[0].as_ref().expect("first envelope").data, "ok");
    assert_eq!(
        envelopes[1].as_ref().expect_err("expected error").code(),
        Code::DataLoss
    );
}

#[test]
fn oversize_length_is_rejected_before_buffering() {
    let mut decoder = EnvelopeStreamDecoder::new(16);
    let header = [0u8, 0, 0, 1, 0];

    let results: Vec<_> = decoder.read_bytes(&header).collect();

    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].as_ref().expect_err("expected error").code(),
        Code::ResourceExhausted
    );
    assert_eq!(decoder.buffered_len(), 0);
    assert!(decoder.read_bytes(&[0u8; 32]).next().is_none());
}

#[test]
fn decoder_waits_for_complete_envelope() {
    let framed = EnvelopeCodec::frame(0, b"xyz").expect("frame failed");
    let (a, b) = framed.split_at(framed.len() / 2);
    let mut decoder = EnvelopeStreamDecoder::default();

    assert_eq!(decoder.read_bytes(a).count(), 0);
    assert!(decoder.finish().is_err());

    let decoded: Vec<_> = decoder.read_bytes(b).collect();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].as_ref().expect("envelope").data, "xyz");
    assert!(decoder.finish().is_ok());
}

#[test]
fn decode_rejects_trailing_bytes() {
    let mut wire = EnvelopeCodec::frame(0, b"a").expect("frame failed").to_vec();
    wire.push(9);
    assert_eq!(
        EnvelopeCodec::decode(&wire).expect_err("expected error").code(),
        Code::InvalidArgument
    );
}

#[test]
fn compression_respects_min_bytes_threshold() {
    let compressor = EnvelopeCompressor::new(Some(Arc::new(Gzip))).with_min_bytes(1024);

    let small = compressor
        .compress(Envelope::message(vec![b'a'; 500]))
        .expect("compress failed");
    assert_eq!(small.flags & ENVELOPE_FLAG_COMPRESSED, 0);
    assert_eq!(small.data.len(), 500);

    let large = compressor
        .compress(Envelope::message(vec![b'a'; 2000]))
        .expect("compress failed");
    assert_eq!(large.flags & ENVELOPE_FLAG_COMPRESSED, ENVELOPE_FLAG_COMPRESSED);
    assert!(large.data.len() < 2000);

    let restored = compressor.decompress(large).expect("decompress failed");
    assert!(!restored.is_compressed());
    assert_eq!(restored.data, vec![b'a'; 2000]);
}

#[test]
fn compression_is_never_applied_twice() {
    let compressor = EnvelopeCompressor::new(Some(Arc::new(Gzip))).with_min_bytes(0);
    let once = compressor
        .compress(Envelope::message(&b"payload"[..]))
        .expect("compress failed");

    let err = compressor.compress(once).expect_err("expected error");
    assert_eq!(err.code(), Code::Internal);
}

#[test]
fn compressed_envelope_without_algorithm_is_rejected() {
    let compressor = EnvelopeCompressor::new(None);
    let envelope = Envelope::new(ENVELOPE_FLAG_COMPRESSED, &b"??"[..]);
    assert_eq!(
        compressor.decompress(envelope).expect_err("expected error").code(),
        Code::Internal
    );
}

#[test]
fn fallback_grpc_web_trailer_frame_is_internal() {
    let envelope = EnvelopeCodec::decode(GRPC_WEB_INTERNAL_TRAILER_FRAME).expect("decode failed");
    assert_eq!(envelope.flags, ENVELOPE_FLAG_GRPC_WEB_TRAILER);

    let trailers = decode_trailer_block(&envelope.data).expect("parse failed");
    let status = find_grpc_status(&trailers)
        .expect("status present")
        .expect_err("expected error");
    assert_eq!(status.code(), Code::Internal);
}

#[test]
fn fallback_connect_end_stream_frame_is_internal() {
    let envelope = EnvelopeCodec::decode(CONNECT_INTERNAL_END_STREAM_FRAME).expect("decode failed");
    assert_eq!(envelope.flags, ENVELOPE_FLAG_CONNECT_END_STREAM);

    let (_, error) = decode_end_stream(&envelope.data).expect("parse failed");
    assert_eq!(error.expect("expected error").code(), Code::Internal);
}
