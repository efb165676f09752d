use bytes::Bytes;
use example_wirecall_rpc_service_definition::{
    CountUp, CountUpRequest, CountUpResponse, Echo, EchoRequest, EchoResponse,
};
use futures::stream::{self, StreamExt};
use http::{HeaderMap, HeaderValue, Method};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use wirecall::context::{AbortController, CallContext};
use wirecall::envelope::EnvelopeCodec;
use wirecall::method::{MethodDescriptor, MethodKind};
use wirecall::protocol::{Encoding, MessageStream, Protocol, RpcHttpRequest, find_grpc_status};
use wirecall::{Code, Status};
use wirecall_rpc_service::{RpcMethod, Serializer};
use wirecall_rpc_service_caller::{CallOptions, CallerConfig, RpcCall, RpcServiceCaller};
use wirecall_rpc_service_endpoint::{EndpointOptions, RpcHandler, RpcServiceEndpoint};

/// Unary method whose implementation takes its time.
struct Slow;

impl RpcMethod for Slow {
    const DESCRIPTOR: MethodDescriptor = MethodDescriptor::new(
        "test.v1.PipelineService",
        "Slow",
        MethodKind::Unary,
        "demo.v1.EchoRequest",
        "demo.v1.EchoResponse",
    );

    type Input = EchoRequest;
    type Output = EchoResponse;
}

/// Unary method served by a misbehaving untyped handler.
struct Twice;

impl RpcMethod for Twice {
    const DESCRIPTOR: MethodDescriptor = MethodDescriptor::new(
        "test.v1.PipelineService",
        "Twice",
        MethodKind::Unary,
        "demo.v1.EchoRequest",
        "demo.v1.EchoResponse",
    );

    type Input = EchoRequest;
    type Output = EchoResponse;
}

fn register_slow(endpoint: &RpcServiceEndpoint) {
    endpoint
        .register_unary(Slow, |_ctx, request: EchoRequest| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, Status>(EchoResponse { text: request.text })
        })
        .unwrap();
}

fn caller(
    endpoint: &Arc<RpcServiceEndpoint>,
    protocol: Protocol,
) -> RpcServiceCaller<Arc<RpcServiceEndpoint>> {
    let config =
        CallerConfig::new("http://loopback.test".parse().unwrap()).with_protocol(protocol);
    RpcServiceCaller::new(endpoint.clone(), config).unwrap()
}

fn grpc_request(path: &str, frames: Vec<Bytes>, headers: HeaderMap) -> RpcHttpRequest {
    let mut request = RpcHttpRequest::new(
        Method::POST,
        format!("http://loopback.test{path}").parse().unwrap(),
        headers,
        stream::iter(frames.into_iter().map(Ok::<_, Status>)).boxed(),
    );
    request
        .headers
        .insert("content-type", HeaderValue::from_static("application/grpc+proto"));
    request
}

fn echo_request_frame(text: &str) -> Bytes {
    let message = Serializer::<EchoRequest>::for_encoding(Encoding::Binary)
        .serialize(&EchoRequest { text: text.into() })
        .unwrap();
    EnvelopeCodec::frame(0, &message).unwrap()
}

#[tokio::test]
async fn test_unary_with_two_outputs_is_invalid_argument() {
    let endpoint = RpcServiceEndpoint::new();
    let handler: RpcHandler = Arc::new(|_ctx: CallContext, encoding: Encoding, _inputs: MessageStream| {
        let message = Serializer::<EchoResponse>::for_encoding(encoding)
            .serialize(&EchoResponse { text: "again".into() });
        stream::iter([message.clone(), message]).boxed()
    });
    endpoint.register_handler(Twice::DESCRIPTOR, handler).unwrap();
    let endpoint = Arc::new(endpoint);

    for protocol in Protocol::ALL {
        let err = Twice::call(&caller(&endpoint, protocol), EchoRequest { text: "x".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument, "{protocol}");
    }
}

#[tokio::test]
async fn test_unary_with_two_inputs_is_invalid_argument() {
    let endpoint = RpcServiceEndpoint::new();
    endpoint
        .register_unary(Echo, |_ctx, request: EchoRequest| async move {
            Ok::<_, Status>(EchoResponse { text: request.text })
        })
        .unwrap();

    let request = grpc_request(
        &Echo::DESCRIPTOR.path(),
        vec![echo_request_frame("one"), echo_request_frame("two")],
        HeaderMap::new(),
    );
    let response = endpoint.handle(request).await;

    // Nothing was produced, so the status arrives trailers-only.
    let status = find_grpc_status(&response.headers).unwrap().unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_unary_without_input_is_invalid_argument() {
    let endpoint = RpcServiceEndpoint::new();
    endpoint
        .register_unary(Echo, |_ctx, request: EchoRequest| async move {
            Ok::<_, Status>(EchoResponse { text: request.text })
        })
        .unwrap();

    let request = grpc_request(&Echo::DESCRIPTOR.path(), Vec::new(), HeaderMap::new());
    let response = endpoint.handle(request).await;

    let status = find_grpc_status(&response.headers).unwrap().unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_cancel_after_first_message() {
    let (reason_tx, reason_rx) = oneshot::channel::<Status>();
    let reason_tx = Arc::new(Mutex::new(Some(reason_tx)));

    let endpoint = RpcServiceEndpoint::new();
    endpoint
        .register_server_stream(CountUp, move |ctx, _request: CountUpRequest| {
            let signal = ctx.signal();
            let reason_tx = reason_tx.clone();
            tokio::spawn(async move {
                let reason = signal.aborted().await;
                if let Some(tx) = reason_tx.lock().unwrap().take() {
                    let _ = tx.send(reason);
                }
            });

            stream::unfold(1u32, |number| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Some((Ok::<_, Status>(CountUpResponse { number }), number + 1))
            })
        })
        .unwrap();
    let endpoint = Arc::new(endpoint);

    let controller = AbortController::new();
    let mut responses = caller(&endpoint, Protocol::Connect)
        .server_stream::<CountUp>(
            CountUpRequest { to: 1000, delay_ms: 10 },
            CallOptions::default().with_signal(controller.signal()),
        )
        .await
        .unwrap();

    assert_eq!(responses.message().await.unwrap().unwrap().number, 1);
    controller.cancel();

    let err = responses.message().await.unwrap_err();
    assert_eq!(err.code(), Code::Canceled);
    assert!(responses.next().await.is_none());

    // The implementation is told the call is over.
    let reason = tokio::time::timeout(Duration::from_secs(1), reason_rx)
        .await
        .expect("handler signal should fire")
        .unwrap();
    assert_eq!(reason.code(), Code::Canceled);
}

#[tokio::test]
async fn test_client_timeout_is_deadline_exceeded() {
    let endpoint = RpcServiceEndpoint::new();
    register_slow(&endpoint);
    let endpoint = Arc::new(endpoint);

    for protocol in Protocol::ALL {
        let err = caller(&endpoint, protocol)
            .unary::<Slow>(
                EchoRequest { text: "x".into() },
                CallOptions::default().with_timeout(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::DeadlineExceeded, "{protocol}");
    }
}

#[tokio::test]
async fn test_server_enforces_requested_timeout() {
    let endpoint = RpcServiceEndpoint::new();
    register_slow(&endpoint);

    let mut headers = HeaderMap::new();
    headers.insert("grpc-timeout", HeaderValue::from_static("50m"));
    let request = grpc_request(&Slow::DESCRIPTOR.path(), vec![echo_request_frame("x")], headers);

    let response = tokio::time::timeout(Duration::from_secs(2), endpoint.handle(request))
        .await
        .expect("server should give up at the deadline");
    let status = find_grpc_status(&response.headers).unwrap().unwrap_err();
    assert_eq!(status.code(), Code::DeadlineExceeded);
}

#[tokio::test]
async fn test_malformed_timeout_is_rejected_before_dispatch() {
    let endpoint = RpcServiceEndpoint::new();
    register_slow(&endpoint);

    let mut headers = HeaderMap::new();
    headers.insert("grpc-timeout", HeaderValue::from_static("soon"));
    let request = grpc_request(&Slow::DESCRIPTOR.path(), vec![echo_request_frame("x")], headers);

    let response = endpoint.handle(request).await;
    let status = find_grpc_status(&response.headers).unwrap().unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_shutdown_interrupts_in_flight_calls() {
    let shutdown = AbortController::new();
    let endpoint = RpcServiceEndpoint::with_options(
        EndpointOptions::default().with_shutdown_signal(shutdown.signal()),
    );
    register_slow(&endpoint);
    let endpoint = Arc::new(endpoint);

    let call = tokio::spawn({
        let caller = caller(&endpoint, Protocol::GrpcWeb);
        async move { Slow::call(&caller, EchoRequest { text: "x".into() }).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.abort(Status::unavailable("server is shutting down"));

    let err = call.await.unwrap().unwrap_err();
    assert_eq!(err.code(), Code::Unavailable);
}

#[tokio::test]
async fn test_panicking_handler_is_internal() {
    let endpoint = RpcServiceEndpoint::new();
    endpoint
        .register_unary(Echo, |_ctx, request: EchoRequest| async move {
            if request.text == "boom" {
                panic!("handler exploded");
            }
            Ok::<_, Status>(EchoResponse { text: request.text })
        })
        .unwrap();
    let endpoint = Arc::new(endpoint);

    for protocol in Protocol::ALL {
        let caller = caller(&endpoint, protocol);
        let err = Echo::call(&caller, EchoRequest { text: "boom".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::Internal, "{protocol}");

        // The endpoint keeps serving.
        let output = Echo::call(&caller, EchoRequest { text: "fine".into() })
            .await
            .unwrap();
        assert_eq!(output.text, "fine");
    }
}

/// A response that is only valid once it has text.
struct Draft(String);

impl TryFrom<Draft> for EchoResponse {
    type Error = String;

    fn try_from(draft: Draft) -> Result<Self, Self::Error> {
        if draft.0.is_empty() {
            Err("draft has no text".into())
        } else {
            Ok(EchoResponse { text: draft.0 })
        }
    }
}

#[tokio::test]
async fn test_output_conversion() {
    let endpoint = RpcServiceEndpoint::new();
    endpoint
        .register_unary(Echo, |_ctx, request: EchoRequest| async move {
            Ok::<_, Status>(Draft(request.text))
        })
        .unwrap();
    let endpoint = Arc::new(endpoint);
    let caller = caller(&endpoint, Protocol::Grpc);

    let output = Echo::call(&caller, EchoRequest { text: "ok".into() })
        .await
        .unwrap();
    assert_eq!(output.text, "ok");

    let err = Echo::call(&caller, EchoRequest { text: String::new() })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Internal);
    assert!(err.message().contains("draft has no text"));
}

#[tokio::test]
async fn test_handler_status_passes_through_unchanged() {
    let endpoint = RpcServiceEndpoint::new();
    endpoint
        .register_unary(Echo, |_ctx, _request: EchoRequest| async move {
            Err::<EchoResponse, _>(Status::resource_exhausted("quota"))
        })
        .unwrap();
    let endpoint = Arc::new(endpoint);

    for protocol in Protocol::ALL {
        let err = Echo::call(&caller(&endpoint, protocol), EchoRequest { text: "x".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::ResourceExhausted, "{protocol}");
        assert_eq!(err.message(), "quota", "{protocol}");
    }
}
