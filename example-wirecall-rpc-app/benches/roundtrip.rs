use criterion::{Criterion, criterion_group, criterion_main};
use example_wirecall_rpc_app::register_demo_service;
use example_wirecall_rpc_service_definition::{Echo, EchoRequest};
use futures::{StreamExt, stream::FuturesUnordered};
use std::{hint::black_box, sync::Arc};
use tokio::runtime::Runtime;
use wirecall::protocol::Protocol;
use wirecall_tokio_rpc_client::{CallerConfig, RpcCall, RpcClient};
use wirecall_tokio_rpc_server::RpcServer;
use wirecall_tokio_rpc_server::utils::{
    bind_tcp_listener_on_random_port, tcp_listener_to_base_uri,
};

fn bench_roundtrip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    // Set up server once
    let (base_uri, _server_task) = rt.block_on(async {
        let (listener, _address) = bind_tcp_listener_on_random_port().await.unwrap();
        let base_uri = tcp_listener_to_base_uri(&listener).unwrap();

        let server = Arc::new(RpcServer::new());
        register_demo_service(&server.endpoint()).unwrap();

        let server_task = tokio::spawn(async move {
            let _ = server.serve_with_listener(listener).await;
        });
        (base_uri, server_task)
    });

    for protocol in Protocol::ALL {
        let caller = RpcClient::new()
            .into_caller(CallerConfig::new(base_uri.clone()).with_protocol(protocol))
            .unwrap();

        c.bench_function(&format!("{protocol}_echo_futures_unordered_batch_10"), |b| {
            b.to_async(&rt).iter(|| async {
                let mut tasks = FuturesUnordered::new();

                for _ in 0..10 {
                    tasks.push(Echo::call(&caller, EchoRequest { text: "bench".into() }));
                }

                let mut results = Vec::with_capacity(10);
                while let Some(res) = tasks.next().await {
                    results.push(res.unwrap());
                }

                black_box(results);
            });
        });

        c.bench_function(&format!("{protocol}_echo_singles"), |b| {
            b.to_async(&rt).iter(|| async {
                let res = Echo::call(&caller, EchoRequest { text: "bench".into() }).await;
                black_box(res.unwrap());
            });
        });
    }
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
