use super::CompressionAlgorithm;
use crate::status::Status;
use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct Gzip;

impl CompressionAlgorithm for Gzip {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> Result<Bytes, Status> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
        encoder
            .write_all(data)
            .map_err(|err| Status::internal(format!("gzip compression failed: {err}")))?;
        let compressed = encoder
            .finish()
            .map_err(|err| Status::internal(format!("gzip compression failed: {err}")))?;
        Ok(Bytes::from(compressed))
    }

    fn decompress(&self, data: &[u8], read_max_bytes: usize) -> Result<Bytes, Status> {
        read_limited(GzDecoder::new(data), read_max_bytes, self.name())
    }
}

/// Drains `reader` into a buffer, stopping one byte past the limit so an
/// oversize payload is detected without inflating all of it.
pub(super) fn read_limited<R: Read>(
    reader: R,
    read_max_bytes: usize,
    algorithm: &str,
) -> Result<Bytes, Status> {
    let mut out = Vec::new();
    let limit = (read_max_bytes as u64).saturating_add(1);
    reader
        .take(limit)
        .read_to_end(&mut out)
        .map_err(|err| Status::invalid_argument(format!("{algorithm} decompression failed: {err}")))?;

    if out.len() > read_max_bytes {
        return Err(Status::resource_exhausted(format!(
            "message is larger than configured readMaxBytes {read_max_bytes} after decompression"
        )));
    }

    Ok(Bytes::from(out))
}
