mod compression_algorithm;
mod deflate;
mod gzip;
mod negotiate;

pub use compression_algorithm::{CompressionAlgorithm, CompressionRegistry, IDENTITY};
pub use deflate::Deflate;
pub use gzip::Gzip;
pub use negotiate::{NegotiatedCompression, negotiate_compression};
