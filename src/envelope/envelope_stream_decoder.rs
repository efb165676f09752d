use crate::constants::{DEFAULT_READ_MAX_BYTES, ENVELOPE_HEADER_SIZE};
use crate::envelope::{Envelope, EnvelopeCodec};
use crate::status::Status;
use bytes::{Buf, BytesMut};
use std::collections::VecDeque;

/// Incremental decoder splitting an arbitrary chunked byte stream into
/// envelopes.
///
/// Bytes are fed with [`read_bytes`](Self::read_bytes) as they arrive; every
/// envelope completed by a chunk is yielded in order. Once the source is
/// exhausted, [`finish`](Self::finish) tells a clean end (no buffered bytes)
/// apart from a truncated header or body.
///
/// A header declaring a length above `max_length` is rejected before any
/// buffer is reserved for the payload, and the decoder stays failed.
pub struct EnvelopeStreamDecoder {
    buffer: BytesMut,
    max_length: usize,
    failed: bool,
}

pub struct EnvelopeDecoderIterator {
    queue: VecDeque<Result<Envelope, Status>>,
}

impl Iterator for EnvelopeDecoderIterator {
    type Item = Result<Envelope, Status>;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop_front()
    }
}

impl Default for EnvelopeStreamDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_READ_MAX_BYTES)
    }
}

impl EnvelopeStreamDecoder {
    pub fn new(max_length: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_length,
            failed: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Number of bytes buffered but not yet emitted as an envelope.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn read_bytes(&mut self, data: &[u8]) -> EnvelopeDecoderIterator {
        let mut queue = VecDeque::new();

        if self.failed {
            return EnvelopeDecoderIterator { queue };
        }

        self.buffer.extend_from_slice(data);

        while let Some((flags, len)) = EnvelopeCodec::decode_header(&self.buffer) {
            if len > self.max_length {
                self.failed = true;
                self.buffer.clear();
                queue.push_back(Err(Status::resource_exhausted(format!(
                    "message size {len} is larger than configured readMaxBytes {}",
                    self.max_length
                ))));
                break;
            }

            let total = ENVELOPE_HEADER_SIZE + len;
            if self.buffer.len() < total {
                // Reserve for the rest of this envelope now that the length is trusted.
                self.buffer.reserve(total - self.buffer.len());
                break;
            }

            self.buffer.advance(ENVELOPE_HEADER_SIZE);
            let payload = self.buffer.split_to(len).freeze();
            tracing::trace!(flags, len, "decoded envelope");
            queue.push_back(Ok(Envelope::new(flags, payload)));
        }

        EnvelopeDecoderIterator { queue }
    }

    /// Signals the end of the source.
    ///
    /// Succeeds if every byte was consumed into envelopes; otherwise returns
    /// a `DataLoss` error describing the partial header or body.
    pub fn finish(&self) -> Result<(), Status> {
        if self.failed || self.buffer.is_empty() {
            return Ok(());
        }

        match EnvelopeCodec::decode_header(&self.buffer) {
            None => Err(Status::data_loss(format!(
                "protocol error: incomplete envelope header, got {} of {} bytes",
                self.buffer.len(),
                ENVELOPE_HEADER_SIZE
            ))),
            Some((_, len)) => Err(Status::data_loss(format!(
                "protocol error: promised {len} bytes in enveloped message, got {} bytes",
                self.buffer.len() - ENVELOPE_HEADER_SIZE
            ))),
        }
    }
}
