use super::CompressionAlgorithm;
use super::gzip::read_limited;
use crate::status::Status;
use bytes::Bytes;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::Write;

/// HTTP `deflate`, which is the zlib format rather than raw deflate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deflate;

impl CompressionAlgorithm for Deflate {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, data: &[u8]) -> Result<Bytes, Status> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
        encoder
            .write_all(data)
            .and_then(|_| encoder.finish())
            .map(Bytes::from)
            .map_err(|err| Status::internal(format!("deflate compression failed: {err}")))
    }

    fn decompress(&self, data: &[u8], read_max_bytes: usize) -> Result<Bytes, Status> {
        read_limited(ZlibDecoder::new(data), read_max_bytes, self.name())
    }
}
