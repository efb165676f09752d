// Envelope related constants
pub const ENVELOPE_FLAGS_SIZE: usize = 1;
pub const ENVELOPE_LENGTH_OFFSET: usize = 1;
pub const ENVELOPE_HEADER_SIZE: usize = 5;

/// Flag bit set when the envelope payload is compressed.
pub const ENVELOPE_FLAG_COMPRESSED: u8 = 0b0000_0001;

/// Flag bit marking the Connect end-of-stream envelope.
pub const ENVELOPE_FLAG_CONNECT_END_STREAM: u8 = 0b0000_0010;

/// Flag bit marking the gRPC-Web trailer envelope.
pub const ENVELOPE_FLAG_GRPC_WEB_TRAILER: u8 = 0b1000_0000;

/// gRPC-Web trailer envelope carrying only `grpc-status: 13`.
pub const GRPC_WEB_INTERNAL_TRAILER_FRAME: &[u8] = b"\x80\x00\x00\x00\x11grpc-status: 13\r\n";

/// Connect end-stream envelope carrying a bare `internal` error.
pub const CONNECT_INTERNAL_END_STREAM_FRAME: &[u8] =
    b"\x02\x00\x00\x00\x1d{\"error\":{\"code\":\"internal\"}}";

/// Payloads smaller than this are sent uncompressed.
pub const DEFAULT_COMPRESS_MIN_BYTES: usize = 1024;

/// Upper bound on a single inbound message, compressed or not.
pub const DEFAULT_READ_MAX_BYTES: usize = 4 * 1024 * 1024;

/// Upper bound on a single outbound message.
pub const DEFAULT_WRITE_MAX_BYTES: usize = 4 * 1024 * 1024;

/// Number of distinct content-type strings remembered per adapter.
pub const DEFAULT_CONTENT_TYPE_CACHE_CAPACITY: usize = 1024;

// Header names
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_CONTENT_ENCODING: &str = "content-encoding";
pub const HEADER_ACCEPT_ENCODING: &str = "accept-encoding";
pub const HEADER_ACCEPT_POST: &str = "accept-post";
pub const HEADER_USER_AGENT: &str = "user-agent";
pub const HEADER_TE: &str = "te";

pub const HEADER_GRPC_STATUS: &str = "grpc-status";
pub const HEADER_GRPC_MESSAGE: &str = "grpc-message";
pub const HEADER_GRPC_STATUS_DETAILS_BIN: &str = "grpc-status-details-bin";
pub const HEADER_GRPC_TIMEOUT: &str = "grpc-timeout";
pub const HEADER_GRPC_ENCODING: &str = "grpc-encoding";
pub const HEADER_GRPC_ACCEPT_ENCODING: &str = "grpc-accept-encoding";
pub const HEADER_X_GRPC_WEB: &str = "x-grpc-web";

pub const HEADER_CONNECT_PROTOCOL_VERSION: &str = "connect-protocol-version";
pub const HEADER_CONNECT_TIMEOUT_MS: &str = "connect-timeout-ms";
pub const HEADER_CONNECT_CONTENT_ENCODING: &str = "connect-content-encoding";
pub const HEADER_CONNECT_ACCEPT_ENCODING: &str = "connect-accept-encoding";

/// Prefix for unary Connect trailers carried in the header block.
pub const CONNECT_TRAILER_PREFIX: &str = "trailer-";
pub const CONNECT_PROTOCOL_VERSION: &str = "1";

// Connect GET query parameters
pub const QUERY_CONNECT: &str = "connect";
pub const QUERY_ENCODING: &str = "encoding";
pub const QUERY_COMPRESSION: &str = "compression";
pub const QUERY_BASE64: &str = "base64";
pub const QUERY_MESSAGE: &str = "message";
pub const QUERY_CONNECT_VALUE: &str = "v1";

pub const USER_AGENT: &str = concat!("wirecall-rust/", env!("CARGO_PKG_VERSION"));
