use crate::constants::{
    ENVELOPE_FLAG_COMPRESSED, ENVELOPE_FLAG_CONNECT_END_STREAM, ENVELOPE_FLAG_GRPC_WEB_TRAILER,
};
use bytes::Bytes;

/// One length-prefixed unit of an enveloped body.
///
/// Carries either a message or, when a protocol-specific flag bit is set,
/// the terminal metadata record of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    pub flags: u8,
    pub data: Bytes,
}

impl Envelope {
    pub fn new(flags: u8, data: impl Into<Bytes>) -> Self {
        Self {
            flags,
            data: data.into(),
        }
    }

    /// A plain, uncompressed message envelope.
    pub fn message(data: impl Into<Bytes>) -> Self {
        Self::new(0, data)
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & ENVELOPE_FLAG_COMPRESSED != 0
    }

    pub fn is_connect_end_stream(&self) -> bool {
        self.flags & ENVELOPE_FLAG_CONNECT_END_STREAM != 0
    }

    pub fn is_grpc_web_trailer(&self) -> bool {
        self.flags & ENVELOPE_FLAG_GRPC_WEB_TRAILER != 0
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
