use bytes::Bytes;
use futures::future;
use futures::stream::{StreamExt, TryStreamExt};
use http::Version;
use http_body::Frame;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, BodyStream, StreamBody};
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use wirecall::Status;
use wirecall::body::{BodyFrame, FrameStream};
use wirecall::protocol::{RpcHttpRequest, RpcHttpResponse};
use wirecall_rpc_service_caller::error::RpcCallerError;
use wirecall_rpc_service_caller::{CallerConfig, RpcServiceCaller, RpcTransport};

type RequestBody = UnsyncBoxBody<Bytes, Status>;

/// Plain HTTP transport backed by Hyper's pooled client.
///
/// Requests marked HTTP/2 go over cleartext HTTP/2 with prior knowledge;
/// everything else uses HTTP/1.1. Both pools are shared by clones.
#[derive(Clone)]
pub struct RpcClient {
    http1: Client<HttpConnector, RequestBody>,
    http2: Client<HttpConnector, RequestBody>,
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").finish_non_exhaustive()
    }
}

impl RpcClient {
    pub fn new() -> Self {
        let http1 = Client::builder(TokioExecutor::new()).build_http();
        let http2 = Client::builder(TokioExecutor::new())
            .http2_only(true)
            .build_http();
        RpcClient { http1, http2 }
    }

    /// Wraps this transport in a caller using `config`.
    pub fn into_caller(
        self,
        config: CallerConfig,
    ) -> Result<RpcServiceCaller<RpcClient>, RpcCallerError> {
        RpcServiceCaller::new(self, config)
    }
}

#[async_trait::async_trait]
impl RpcTransport for RpcClient {
    async fn send(&self, request: RpcHttpRequest) -> Result<RpcHttpResponse, Status> {
        let RpcHttpRequest {
            method,
            uri,
            version,
            headers,
            body,
        } = request;

        let (client, version) = match version {
            Version::HTTP_2 => (&self.http2, Version::HTTP_2),
            _ => (&self.http1, Version::HTTP_11),
        };
        tracing::debug!(%method, %uri, ?version, "Sending request");

        let body: RequestBody = StreamBody::new(body.map_ok(Frame::data)).boxed_unsync();
        let mut http_request = http::Request::new(body);
        *http_request.method_mut() = method;
        *http_request.uri_mut() = uri;
        *http_request.version_mut() = version;
        *http_request.headers_mut() = headers;

        let response = client.request(http_request).await.map_err(|err| {
            tracing::warn!(error = %err, "Request failed");
            Status::unavailable(format!("request failed: {err}"))
        })?;

        let (parts, body) = response.into_parts();
        Ok(RpcHttpResponse::new(
            parts.status,
            parts.headers,
            into_frame_stream(body),
        ))
    }
}

fn into_frame_stream(body: Incoming) -> FrameStream {
    BodyStream::new(body)
        .filter_map(|frame| {
            let frame = match frame {
                Ok(frame) => frame,
                Err(err) => {
                    return future::ready(Some(Err(Status::unavailable(format!(
                        "failed to read response body: {err}"
                    )))));
                }
            };
            let frame = match frame.into_data() {
                Ok(data) => Some(Ok(BodyFrame::Data(data))),
                // Frames that are neither data nor trailers carry nothing for us.
                Err(frame) => frame.into_trailers().ok().map(|t| Ok(BodyFrame::Trailers(t))),
            };
            future::ready(frame)
        })
        .boxed()
}
