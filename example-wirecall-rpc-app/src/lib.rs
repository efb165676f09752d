use example_wirecall_rpc_service_definition::{
    Chat, ChatMessage, CountUp, CountUpRequest, CountUpResponse, DEMO_SERVICE, Echo, EchoRequest,
    EchoResponse, Sum, SumRequest, SumResponse,
};
use futures::StreamExt;
use futures::stream;
use std::time::Duration;
use wirecall::{Code, Status};
use wirecall_rpc_service_endpoint::error::RpcServiceEndpointError;
use wirecall_rpc_service_endpoint::{Requests, RpcServiceEndpoint};

/// Registers the demo service's implementations on `endpoint`.
pub fn register_demo_service(endpoint: &RpcServiceEndpoint) -> Result<(), RpcServiceEndpointError> {
    endpoint.register_service(&DEMO_SERVICE);

    endpoint.register_unary(Echo, |_ctx, request: EchoRequest| async move {
        Ok::<_, Status>(EchoResponse { text: request.text })
    })?;

    endpoint.register_server_stream(CountUp, |ctx, request: CountUpRequest| {
        let to = request.to;
        let delay = Duration::from_millis(request.delay_ms);
        tracing::debug!(to, deadline = ?ctx.time_remaining(), "Counting up");
        stream::unfold(1u32, move |number| async move {
            if number > to {
                return None;
            }
            tokio::time::sleep(delay).await;
            Some((Ok::<_, Status>(CountUpResponse { number }), number + 1))
        })
    })?;

    endpoint.register_client_stream(Sum, |_ctx, mut requests: Requests<SumRequest>| async move {
        let mut total: i64 = 0;
        let mut count = 0;
        while let Some(request) = requests.next().await {
            total = total
                .checked_add(request?.value)
                .ok_or_else(|| Status::new(Code::OutOfRange, "sum overflowed"))?;
            count += 1;
        }
        Ok::<_, Status>(SumResponse { total, count })
    })?;

    endpoint.register_bidi_stream(Chat, |_ctx, requests: Requests<ChatMessage>| {
        requests.map(|message| {
            message.map(|message| ChatMessage {
                text: format!("you said: {}", message.text),
            })
        })
    })?;

    Ok(())
}
