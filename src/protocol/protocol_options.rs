use crate::compression::CompressionRegistry;
use crate::constants::{
    DEFAULT_COMPRESS_MIN_BYTES, DEFAULT_CONTENT_TYPE_CACHE_CAPACITY, DEFAULT_READ_MAX_BYTES,
    DEFAULT_WRITE_MAX_BYTES,
};
use crate::envelope::EnvelopeCompressor;
use crate::compression::CompressionAlgorithm;
use std::sync::Arc;
use std::time::Duration;

/// Limits and compression settings shared by every protocol adapter.
#[derive(Debug, Clone)]
pub struct ProtocolOptions {
    /// Algorithms offered and accepted, in order of preference.
    pub compression: CompressionRegistry,
    /// Messages shorter than this are sent uncompressed.
    pub compress_min_bytes: usize,
    pub read_max_bytes: usize,
    pub write_max_bytes: usize,
    /// Upper bound applied to timeouts requested by peers.
    pub max_timeout: Option<Duration>,
    /// Reject Connect requests that omit the protocol version marker.
    pub require_connect_protocol_header: bool,
    pub content_type_cache_capacity: usize,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self {
            compression: CompressionRegistry::with_defaults(),
            compress_min_bytes: DEFAULT_COMPRESS_MIN_BYTES,
            read_max_bytes: DEFAULT_READ_MAX_BYTES,
            write_max_bytes: DEFAULT_WRITE_MAX_BYTES,
            max_timeout: None,
            require_connect_protocol_header: false,
            content_type_cache_capacity: DEFAULT_CONTENT_TYPE_CACHE_CAPACITY,
        }
    }
}

impl ProtocolOptions {
    pub fn with_compression(mut self, compression: CompressionRegistry) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_compress_min_bytes(mut self, compress_min_bytes: usize) -> Self {
        self.compress_min_bytes = compress_min_bytes;
        self
    }

    pub fn with_read_max_bytes(mut self, read_max_bytes: usize) -> Self {
        self.read_max_bytes = read_max_bytes;
        self
    }

    pub fn with_write_max_bytes(mut self, write_max_bytes: usize) -> Self {
        self.write_max_bytes = write_max_bytes;
        self
    }

    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = Some(max_timeout);
        self
    }

    pub fn with_require_connect_protocol_header(mut self, require: bool) -> Self {
        self.require_connect_protocol_header = require;
        self
    }

    pub fn with_content_type_cache_capacity(mut self, capacity: usize) -> Self {
        self.content_type_cache_capacity = capacity;
        self
    }

    /// Envelope compressor configured with these limits.
    pub fn compressor(&self, algorithm: Option<Arc<dyn CompressionAlgorithm>>) -> EnvelopeCompressor {
        EnvelopeCompressor::new(algorithm)
            .with_min_bytes(self.compress_min_bytes)
            .with_read_max_bytes(self.read_max_bytes)
    }

    /// Applies `max_timeout` to a peer-requested timeout.
    pub fn clamp_timeout(&self, timeout: Option<Duration>) -> Option<Duration> {
        match (timeout, self.max_timeout) {
            (Some(timeout), Some(max)) => Some(timeout.min(max)),
            (None, Some(max)) => Some(max),
            (timeout, None) => timeout,
        }
    }
}
