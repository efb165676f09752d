use crate::protocol::headers::append_all;
use crate::status::{Code, ErrorDetail, Status};
use crate::utils::{decode_base64_lenient, encode_base64_std};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
struct ErrorJson {
    code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    details: Vec<DetailJson>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DetailJson {
    #[serde(rename = "type")]
    type_name: String,
    value: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EndStreamJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, Vec<String>>,
}

fn error_to_json(status: &Status) -> ErrorJson {
    ErrorJson {
        code: status.code().as_str().to_owned(),
        message: (!status.message().is_empty()).then(|| status.message().to_owned()),
        details: status
            .details()
            .iter()
            .map(|detail| DetailJson {
                type_name: detail.type_name.clone(),
                value: encode_base64_std(&detail.value),
            })
            .collect(),
    }
}

/// An unrecognised code is `Internal`.
fn error_from_json(json: ErrorJson) -> Result<Status, Status> {
    let code = json.code.parse::<Code>().unwrap_or(Code::Internal);
    let mut details = Vec::with_capacity(json.details.len());
    for detail in json.details {
        let value = decode_base64_lenient(&detail.value).map_err(|err| {
            Status::internal(format!("protocol error: invalid error detail value: {err}"))
        })?;
        details.push(ErrorDetail::new(detail.type_name, Bytes::from(value)));
    }
    Ok(Status::new(code, json.message.unwrap_or_default()).with_details(details))
}

/// JSON body of a Connect unary error response.
pub fn encode_connect_error(status: &Status) -> Bytes {
    serde_json::to_vec(&error_to_json(status))
        .map(Bytes::from)
        .unwrap_or_else(|_| Bytes::from_static(br#"{"code":"internal"}"#))
}

/// Parses a Connect unary error body.
///
/// A body that is not a Connect error falls back to `fallback`, the code
/// derived from the HTTP status, with the HTTP status text as message. A
/// Connect error with an unrecognised code is `Internal`.
pub fn decode_connect_error(body: &[u8], fallback: Code, http_reason: &str) -> Status {
    match serde_json::from_slice::<ErrorJson>(body) {
        Ok(json) => error_from_json(json).unwrap_or_else(|err| err),
        Err(_) => Status::new(fallback, format!("HTTP {http_reason}")),
    }
}

/// JSON payload of a Connect end-of-stream envelope.
pub fn encode_end_stream(trailers: &HeaderMap, error: Option<&Status>) -> Bytes {
    let mut metadata: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut push = |headers: &HeaderMap| {
        for (name, value) in headers.iter() {
            if let Ok(value) = value.to_str() {
                metadata
                    .entry(name.as_str().to_owned())
                    .or_default()
                    .push(value.to_owned());
            }
        }
    };
    push(trailers);
    if let Some(error) = error {
        push(error.metadata());
    }

    let end_stream = EndStreamJson {
        error: error.map(error_to_json),
        metadata,
    };
    serde_json::to_vec(&end_stream)
        .map(Bytes::from)
        .unwrap_or_else(|_| Bytes::from_static(b"{}"))
}

/// Parses a Connect end-of-stream payload into trailers and the optional
/// terminal error. Malformed JSON is `InvalidArgument`.
pub fn decode_end_stream(payload: &[u8]) -> Result<(HeaderMap, Option<Status>), Status> {
    let end_stream: EndStreamJson = serde_json::from_slice(payload).map_err(|err| {
        Status::invalid_argument(format!("protocol error: invalid end stream message: {err}"))
    })?;

    let mut trailers = HeaderMap::new();
    for (name, values) in end_stream.metadata {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            Status::invalid_argument(format!("protocol error: invalid trailer name: {name}"))
        })?;
        for value in values {
            let value = HeaderValue::from_str(&value).map_err(|_| {
                Status::invalid_argument("protocol error: invalid trailer value")
            })?;
            trailers.append(name.clone(), value);
        }
    }

    let error = match end_stream.error {
        Some(json) => {
            let mut status = error_from_json(json)?;
            append_all(status.metadata_mut(), &trailers);
            Some(status)
        }
        None => None,
    };

    Ok((trailers, error))
}
