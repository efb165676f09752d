use crate::status::Status;
use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};

/// Serializes trailers as an HTTP/1 header block (`name: value\r\n`), the
/// payload of a gRPC-Web trailer envelope.
pub fn encode_trailer_block(trailers: &HeaderMap) -> Bytes {
    let mut buf = BytesMut::new();
    for (name, value) in trailers.iter() {
        buf.put_slice(name.as_str().as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(value.as_bytes());
        buf.put_slice(b"\r\n");
    }
    buf.freeze()
}

/// Parses a gRPC-Web trailer envelope payload.
pub fn decode_trailer_block(block: &[u8]) -> Result<HeaderMap, Status> {
    let mut trailers = HeaderMap::new();
    for line in block.split(|&byte| byte == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let colon = line.iter().position(|&byte| byte == b':').ok_or_else(|| {
            Status::internal("protocol error: invalid trailer line in grpc-web response")
        })?;
        let name = HeaderName::from_bytes(line[..colon].trim_ascii()).map_err(|_| {
            Status::internal("protocol error: invalid trailer name in grpc-web response")
        })?;
        let value = HeaderValue::from_bytes(line[colon + 1..].trim_ascii()).map_err(|_| {
            Status::internal("protocol error: invalid trailer value in grpc-web response")
        })?;
        trailers.append(name, value);
    }
    Ok(trailers)
}
