use crate::constants::HEADER_ACCEPT_POST;
use crate::method::{MethodDescriptor, MethodKind};
use crate::protocol::{ProtocolAdapter, RpcHttpResponse};
use http::header::{ALLOW, CONNECTION};
use http::{HeaderName, HeaderValue, Method, StatusCode, Version};
use std::sync::Arc;

/// Selects the adapter that speaks an inbound request.
///
/// Rejections are returned as ready-made transport responses:
/// * `505` with `Connection: close` for a bidi method over HTTP/1.x,
/// * `405` when no adapter accepts the verb,
/// * `415` (with `Accept-Post`) when none accepts the content type.
///
/// A request without a content type is accepted when exactly one adapter
/// allows its verb.
pub fn negotiate_protocol(
    adapters: &[Arc<dyn ProtocolAdapter>],
    descriptor: &MethodDescriptor,
    method: &Method,
    version: Version,
    content_type: Option<&str>,
) -> Result<Arc<dyn ProtocolAdapter>, RpcHttpResponse> {
    if descriptor.kind == MethodKind::BiDiStreaming
        && matches!(version, Version::HTTP_09 | Version::HTTP_10 | Version::HTTP_11)
    {
        tracing::warn!(method = %descriptor, ?version, "bidi stream over HTTP/1.x rejected");
        return Err(RpcHttpResponse::empty(StatusCode::HTTP_VERSION_NOT_SUPPORTED)
            .with_header(CONNECTION, HeaderValue::from_static("close")));
    }

    let by_verb: Vec<&Arc<dyn ProtocolAdapter>> = adapters
        .iter()
        .filter(|adapter| adapter.allows_method(descriptor, method))
        .collect();

    if by_verb.is_empty() {
        tracing::warn!(method = %descriptor, http_method = %method, "no protocol allows this verb");
        let mut allowed: Vec<&str> = Vec::new();
        for candidate in [Method::POST, Method::GET] {
            if adapters.iter().any(|adapter| adapter.allows_method(descriptor, &candidate)) {
                allowed.push(if candidate == Method::GET { "GET" } else { "POST" });
            }
        }
        let mut response = RpcHttpResponse::empty(StatusCode::METHOD_NOT_ALLOWED);
        if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
            response = response.with_header(ALLOW, value);
        }
        return Err(response);
    }

    if by_verb.len() == 1 && content_type.is_none() {
        return Ok(Arc::clone(by_verb[0]));
    }

    if let Some(adapter) = by_verb
        .iter()
        .find(|adapter| adapter.matches(descriptor, method, content_type))
    {
        tracing::debug!(method = %descriptor, protocol = adapter.name(), "negotiated protocol");
        return Ok(Arc::clone(adapter));
    }

    tracing::warn!(
        method = %descriptor,
        content_type = content_type.unwrap_or_default(),
        "no protocol accepts this content type"
    );
    let accepted: Vec<&str> = by_verb
        .iter()
        .flat_map(|adapter| adapter.supported_content_types(descriptor))
        .collect();
    let mut response = RpcHttpResponse::empty(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    if let Ok(value) = HeaderValue::from_str(&accepted.join(", ")) {
        response = response.with_header(HeaderName::from_static(HEADER_ACCEPT_POST), value);
    }
    Err(response)
}
