use example_wirecall_rpc_app::register_demo_service;
use example_wirecall_rpc_service_definition::{
    Chat, ChatMessage, CountUp, CountUpRequest, Echo, EchoRequest, Sum, SumRequest,
};
use futures::{StreamExt, stream};
use std::sync::Arc;
use tokio::join;
use tracing_subscriber::EnvFilter;
use wirecall::protocol::Protocol;
use wirecall_tokio_rpc_client::{CallOptions, CallerConfig, RpcCall, RpcClient};
use wirecall_tokio_rpc_server::RpcServer;
use wirecall_tokio_rpc_server::utils::{
    bind_tcp_listener_on_random_port, tcp_listener_to_base_uri,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Bind to a random available port
    let (listener, _address) = bind_tcp_listener_on_random_port().await?;
    let base_uri = tcp_listener_to_base_uri(&listener)?;

    let server = Arc::new(RpcServer::new());
    register_demo_service(&server.endpoint())?;

    let server_task = tokio::spawn({
        let server = Arc::clone(&server);
        async move {
            let _ = server.serve_with_listener(listener).await;
        }
    });

    let client = RpcClient::new();
    for protocol in Protocol::ALL {
        let caller = client
            .clone()
            .into_caller(CallerConfig::new(base_uri.clone()).with_protocol(protocol))?;

        let (echo, sum) = join!(
            Echo::call(&caller, EchoRequest { text: "hello".into() }),
            caller.client_stream::<Sum>(
                stream::iter((1..=4).map(|value| SumRequest { value })),
                CallOptions::default()
            )
        );
        println!("[{protocol}] echo: {:?}", echo?.text);
        println!("[{protocol}] sum: {:?}", sum?.message);

        let mut numbers = caller
            .server_stream::<CountUp>(CountUpRequest { to: 3, delay_ms: 10 }, CallOptions::default())
            .await?;
        while let Some(response) = numbers.next().await {
            println!("[{protocol}] count: {}", response?.number);
        }

        let replies = caller
            .bidi_stream::<Chat>(
                stream::iter(["ping", "pong"].map(|text| ChatMessage { text: text.into() })),
                CallOptions::default(),
            )
            .await?;
        let replies: Vec<_> = replies.collect().await;
        for reply in replies {
            println!("[{protocol}] chat: {}", reply?.text);
        }
    }

    server.shutdown();
    server_task.await?;
    Ok(())
}
