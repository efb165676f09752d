use super::{CompressionAlgorithm, CompressionRegistry, IDENTITY};
use crate::status::Status;
use http::{HeaderName, HeaderValue};
use std::sync::Arc;

/// Outcome of compression negotiation for a single call.
///
/// Computed once when the request headers arrive and reused for every
/// envelope of the call.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCompression {
    /// Algorithm to decode incoming data with.
    pub request: Option<Arc<dyn CompressionAlgorithm>>,
    /// Algorithm to encode outgoing data with.
    pub response: Option<Arc<dyn CompressionAlgorithm>>,
    /// Set when the peer asked for an encoding we cannot decode.
    pub error: Option<Status>,
}

/// Picks the request and response compression for a call.
///
/// * `requested` is the peer's `*-encoding` header: the algorithm its
///   payload is compressed with. An unknown name other than `identity`
///   yields an `Unimplemented` error whose metadata carries
///   `accept_header_name` listing what is supported.
/// * `accepted` is the peer's `*-accept-encoding` header. The first name we
///   also support wins. Without the header the response reuses the request
///   algorithm.
pub fn negotiate_compression(
    available: &CompressionRegistry,
    requested: Option<&str>,
    accepted: Option<&str>,
    accept_header_name: &str,
) -> NegotiatedCompression {
    let mut negotiated = NegotiatedCompression::default();

    if let Some(requested) = requested.map(str::trim).filter(|name| !name.is_empty()) {
        if requested != IDENTITY {
            match available.get(requested) {
                Some(algorithm) => negotiated.request = Some(algorithm),
                None => {
                    let acceptable = available.names().join(",");
                    let mut error = Status::unimplemented(format!(
                        "unknown compression \"{requested}\": supported encodings are {acceptable}"
                    ));
                    if let (Ok(name), Ok(value)) = (
                        HeaderName::from_bytes(accept_header_name.as_bytes()),
                        HeaderValue::from_str(&acceptable),
                    ) {
                        error.metadata_mut().insert(name, value);
                    }
                    negotiated.error = Some(error);
                }
            }
        }
    }

    match accepted.map(str::trim).filter(|value| !value.is_empty()) {
        None => negotiated.response = negotiated.request.clone(),
        Some(accepted) => {
            negotiated.response = accepted
                .split(',')
                .map(|entry| entry.split(';').next().unwrap_or_default().trim())
                .find_map(|name| available.get(name));
        }
    }

    negotiated
}
