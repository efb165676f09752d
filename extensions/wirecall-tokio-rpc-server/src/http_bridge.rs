use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use futures_util::{StreamExt, TryStreamExt};
use http_body::Frame;
use http_body_util::StreamBody;
use wirecall::Status;
use wirecall::body::BodyFrame;
use wirecall::protocol::{RpcHttpRequest, RpcHttpResponse};

/// Converts an incoming Axum request into the transport-neutral form.
///
/// The body is forwarded as it arrives; nothing is buffered here.
pub(crate) fn into_rpc_request(request: Request) -> RpcHttpRequest {
    let (parts, body) = request.into_parts();
    let body = body
        .into_data_stream()
        .map_err(|err| Status::canceled(format!("failed to read request body: {err}")))
        .boxed();

    RpcHttpRequest::new(parts.method, parts.uri, parts.headers, body).with_version(parts.version)
}

/// Converts an endpoint response into an Axum response.
///
/// Trailer frames become HTTP trailers, which only HTTP/2 carries.
pub(crate) fn from_rpc_response(response: RpcHttpResponse) -> Response {
    let frames = response.body.map_ok(|frame| match frame {
        BodyFrame::Data(data) => Frame::data(data),
        BodyFrame::Trailers(trailers) => Frame::trailers(trailers),
    });

    let mut http_response = Response::new(Body::new(StreamBody::new(frames)));
    *http_response.status_mut() = response.status;
    *http_response.headers_mut() = response.headers;
    http_response
}
