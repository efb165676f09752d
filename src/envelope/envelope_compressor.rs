use crate::compression::CompressionAlgorithm;
use crate::constants::{DEFAULT_COMPRESS_MIN_BYTES, DEFAULT_READ_MAX_BYTES, ENVELOPE_FLAG_COMPRESSED};
use crate::envelope::Envelope;
use crate::status::Status;
use std::sync::Arc;

/// Applies the negotiated compression to individual envelopes.
///
/// Compression is per envelope: payloads shorter than `min_bytes` go out
/// uncompressed, and the compressed flag is set exactly when the payload was
/// compressed.
#[derive(Debug, Clone)]
pub struct EnvelopeCompressor {
    algorithm: Option<Arc<dyn CompressionAlgorithm>>,
    min_bytes: usize,
    read_max_bytes: usize,
}

impl Default for EnvelopeCompressor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl EnvelopeCompressor {
    pub fn new(algorithm: Option<Arc<dyn CompressionAlgorithm>>) -> Self {
        Self {
            algorithm,
            min_bytes: DEFAULT_COMPRESS_MIN_BYTES,
            read_max_bytes: DEFAULT_READ_MAX_BYTES,
        }
    }

    pub fn with_min_bytes(mut self, min_bytes: usize) -> Self {
        self.min_bytes = min_bytes;
        self
    }

    pub fn with_read_max_bytes(mut self, read_max_bytes: usize) -> Self {
        self.read_max_bytes = read_max_bytes;
        self
    }

    pub fn algorithm(&self) -> Option<&Arc<dyn CompressionAlgorithm>> {
        self.algorithm.as_ref()
    }

    /// Compresses an outgoing envelope if an algorithm is set and the payload
    /// meets the threshold.
    ///
    /// An envelope that already carries the compressed flag is refused with
    /// `Internal`.
    pub fn compress(&self, envelope: Envelope) -> Result<Envelope, Status> {
        if envelope.is_compressed() {
            return Err(Status::internal("invalid envelope, already compressed"));
        }

        let Some(algorithm) = &self.algorithm else {
            return Ok(envelope);
        };

        if envelope.data.len() < self.min_bytes {
            return Ok(envelope);
        }

        let data = algorithm.compress(&envelope.data)?;
        tracing::trace!(
            algorithm = algorithm.name(),
            before = envelope.data.len(),
            after = data.len(),
            "compressed envelope"
        );
        Ok(Envelope::new(envelope.flags | ENVELOPE_FLAG_COMPRESSED, data))
    }

    /// Decompresses an incoming envelope when its compressed flag is set, and
    /// clears the flag.
    ///
    /// A compressed envelope on a call without negotiated compression is an
    /// `Internal` error.
    pub fn decompress(&self, envelope: Envelope) -> Result<Envelope, Status> {
        if !envelope.is_compressed() {
            return Ok(envelope);
        }

        let Some(algorithm) = &self.algorithm else {
            return Err(Status::internal(
                "received compressed envelope, but no compression was negotiated",
            ));
        };

        let data = algorithm.decompress(&envelope.data, self.read_max_bytes)?;
        Ok(Envelope::new(envelope.flags & !ENVELOPE_FLAG_COMPRESSED, data))
    }
}
