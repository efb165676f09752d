use crate::constants::{HEADER_GRPC_MESSAGE, HEADER_GRPC_STATUS, HEADER_GRPC_STATUS_DETAILS_BIN};
use crate::protocol::headers::{append_all, header_str, set_header};
use crate::status::{Code, ErrorDetail, Status};
use crate::utils::{decode_base64_lenient, encode_base64_std, percent_decode, percent_encode};
use bytes::Bytes;
use http::HeaderMap;
use prost::Message;

/// `google.rpc.Status`, carried in `grpc-status-details-bin`.
#[derive(Clone, PartialEq, Message)]
struct StatusProto {
    #[prost(int32, tag = "1")]
    code: i32,
    #[prost(string, tag = "2")]
    message: String,
    #[prost(message, repeated, tag = "3")]
    details: Vec<AnyProto>,
}

/// `google.protobuf.Any`.
#[derive(Clone, PartialEq, Message)]
struct AnyProto {
    #[prost(string, tag = "1")]
    type_url: String,
    #[prost(bytes = "bytes", tag = "2")]
    value: Bytes,
}

/// Writes the gRPC status trailers for a finished call.
///
/// `None` writes `grpc-status: 0`. An error also writes the percent-encoded
/// message, the binary details record when details exist, and the error's
/// own metadata.
pub fn set_grpc_status(trailers: &mut HeaderMap, status: Option<&Status>) {
    let Some(status) = status else {
        set_header(trailers, HEADER_GRPC_STATUS, "0");
        return;
    };

    append_all(trailers, status.metadata());

    let code: u8 = status.code().into();
    set_header(trailers, HEADER_GRPC_STATUS, &code.to_string());

    if !status.message().is_empty() {
        set_header(trailers, HEADER_GRPC_MESSAGE, &percent_encode(status.message()));
    }

    if !status.details().is_empty() {
        let proto = StatusProto {
            code: i32::from(code),
            message: status.message().to_owned(),
            details: status
                .details()
                .iter()
                .map(|detail| AnyProto {
                    type_url: detail.type_url(),
                    value: detail.value.clone(),
                })
                .collect(),
        };
        set_header(
            trailers,
            HEADER_GRPC_STATUS_DETAILS_BIN,
            &encode_base64_std(&proto.encode_to_vec()),
        );
    }
}

/// Reads a gRPC status from trailers, or from headers of a trailers-only
/// response.
///
/// Returns `None` when there is no `grpc-status`, `Some(Ok(()))` for status
/// `0`, and `Some(Err(..))` otherwise. An unparseable status is `Internal`.
pub fn find_grpc_status(headers: &HeaderMap) -> Option<Result<(), Status>> {
    let raw = headers.get(HEADER_GRPC_STATUS)?;

    let code = match raw.to_str().ok().and_then(|value| value.trim().parse::<u8>().ok()) {
        Some(0) => return Some(Ok(())),
        Some(value) => Code::try_from(value).ok(),
        None => None,
    };
    let Some(code) = code else {
        return Some(Err(Status::internal(format!(
            "protocol error: invalid grpc-status: {}",
            String::from_utf8_lossy(raw.as_bytes())
        ))));
    };

    let message = header_str(headers, HEADER_GRPC_MESSAGE)
        .map(percent_decode)
        .unwrap_or_default();
    let mut status = Status::new(code, message);

    if let Some(encoded) = header_str(headers, HEADER_GRPC_STATUS_DETAILS_BIN) {
        let decoded = decode_base64_lenient(encoded)
            .ok()
            .and_then(|bytes| StatusProto::decode(bytes.as_slice()).ok());
        match decoded {
            Some(proto) => {
                if status.message().is_empty() && !proto.message.is_empty() {
                    status = Status::new(code, proto.message);
                }
                status = status.with_details(proto.details.into_iter().map(|any| {
                    ErrorDetail::new(ErrorDetail::type_name_from_url(&any.type_url), any.value)
                }));
            }
            None => {
                return Some(Err(Status::internal(
                    "protocol error: invalid grpc-status-details-bin",
                )));
            }
        }
    }

    Some(Err(status.with_metadata(strip_status_headers(headers))))
}

fn strip_status_headers(headers: &HeaderMap) -> HeaderMap {
    let mut metadata = headers.clone();
    metadata.remove(HEADER_GRPC_STATUS);
    metadata.remove(HEADER_GRPC_MESSAGE);
    metadata.remove(HEADER_GRPC_STATUS_DETAILS_BIN);
    metadata
}
