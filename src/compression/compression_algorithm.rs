use crate::status::Status;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Name of the no-op encoding. It is always acceptable and never registered.
pub const IDENTITY: &str = "identity";

/// A named payload compression algorithm.
///
/// Implementations are shared read-only between every call of an endpoint
/// or client, so they must not carry per-call state.
pub trait CompressionAlgorithm: fmt::Debug + Send + Sync {
    /// The token used in `*-encoding` headers, e.g. `gzip`.
    fn name(&self) -> &'static str;

    fn compress(&self, data: &[u8]) -> Result<Bytes, Status>;

    /// Decompresses `data`, failing with `ResourceExhausted` if the output
    /// would exceed `read_max_bytes`.
    fn decompress(&self, data: &[u8], read_max_bytes: usize) -> Result<Bytes, Status>;
}

/// Ordered set of compression algorithms, in order of preference.
#[derive(Debug, Clone, Default)]
pub struct CompressionRegistry {
    algorithms: Vec<Arc<dyn CompressionAlgorithm>>,
}

impl CompressionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `gzip` and `deflate`, in that order.
    pub fn with_defaults() -> Self {
        Self::new()
            .with(Arc::new(super::Gzip))
            .with(Arc::new(super::Deflate))
    }

    /// Adds an algorithm. A later registration under the same name replaces
    /// the earlier one in place.
    pub fn with(mut self, algorithm: Arc<dyn CompressionAlgorithm>) -> Self {
        match self
            .algorithms
            .iter()
            .position(|existing| existing.name() == algorithm.name())
        {
            Some(index) => self.algorithms[index] = algorithm,
            None => self.algorithms.push(algorithm),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CompressionAlgorithm>> {
        self.algorithms
            .iter()
            .find(|algorithm| algorithm.name() == name)
            .cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.algorithms.iter().map(|algorithm| algorithm.name()).collect()
    }

    /// Value for an `accept-encoding` style header, or `None` when empty.
    pub fn accept_header_value(&self) -> Option<String> {
        if self.algorithms.is_empty() {
            None
        } else {
            Some(self.names().join(","))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}
