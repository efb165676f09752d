use crate::constants::{ENVELOPE_FLAGS_SIZE, ENVELOPE_HEADER_SIZE, ENVELOPE_LENGTH_OFFSET};
use crate::envelope::Envelope;
use crate::status::Status;
use bytes::{BufMut, Bytes, BytesMut};

/// Encodes and decodes the 5-byte envelope header.
///
/// The header is one flag byte followed by the payload length as a
/// big-endian `u32`.
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Frames an envelope: header followed by its data.
    pub fn encode(envelope: &Envelope) -> Result<Bytes, Status> {
        Self::frame(envelope.flags, &envelope.data)
    }

    /// Prepends the envelope header to `data`.
    ///
    /// Fails with `ResourceExhausted` if `data` does not fit a `u32` length.
    pub fn frame(flags: u8, data: &[u8]) -> Result<Bytes, Status> {
        let len = u32::try_from(data.len()).map_err(|_| {
            Status::resource_exhausted(format!(
                "envelope payload of {} bytes exceeds the 32-bit length field",
                data.len()
            ))
        })?;

        let mut buf = BytesMut::with_capacity(ENVELOPE_HEADER_SIZE + data.len());
        buf.put_u8(flags);
        buf.put_u32(len);
        buf.put_slice(data);
        Ok(buf.freeze())
    }

    /// Reads `(flags, length)` from the start of `buf`.
    ///
    /// Returns `None` while fewer than five bytes are available.
    pub fn decode_header(buf: &[u8]) -> Option<(u8, usize)> {
        let header = buf.get(..ENVELOPE_HEADER_SIZE)?;
        let flags = header[0];
        let len_bytes: [u8; 4] = header
            .get(ENVELOPE_LENGTH_OFFSET..ENVELOPE_FLAGS_SIZE + 4)?
            .try_into()
            .ok()?;
        Some((flags, u32::from_be_bytes(len_bytes) as usize))
    }

    /// Decodes exactly one complete envelope from `buf`.
    ///
    /// Trailing bytes after the envelope are an error.
    pub fn decode(buf: &[u8]) -> Result<Envelope, Status> {
        let (flags, len) = Self::decode_header(buf).ok_or_else(|| {
            Status::data_loss(format!(
                "incomplete envelope header: {} of {} bytes",
                buf.len(),
                ENVELOPE_HEADER_SIZE
            ))
        })?;

        let body = &buf[ENVELOPE_HEADER_SIZE..];
        if body.len() < len {
            return Err(Status::data_loss(format!(
                "premature end of envelope: expected {len} bytes, got {}",
                body.len()
            )));
        }
        if body.len() > len {
            return Err(Status::invalid_argument(format!(
                "unexpected {} bytes after envelope",
                body.len() - len
            )));
        }

        Ok(Envelope::new(flags, Bytes::copy_from_slice(body)))
    }
}
