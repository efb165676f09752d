//! Note: This `RpcServer` is a reference implementation and does not include
//! authentication or authorization mechanisms. Any struct that owns an
//! [`RpcServiceEndpoint`] can act as a server; this one shows how to do it
//! over plain HTTP (HTTP/1.1 and cleartext HTTP/2) using the Axum web
//! framework.

use crate::error::RpcServerError;
use crate::http_bridge::{from_rpc_response, into_rpc_request};
use axum::Router;
use axum::extract::{ConnectInfo, Request};
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use wirecall::Status;
use wirecall::context::AbortController;
use wirecall_rpc_service_endpoint::{EndpointOptions, RpcServiceEndpoint};

/// An HTTP server answering gRPC, gRPC-Web and Connect requests.
///
/// Every path is routed to the endpoint, which decides between a method and
/// a 404.
pub struct RpcServer {
    endpoint: Arc<RpcServiceEndpoint>,
    shutdown: AbortController,
}

impl Default for RpcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcServer {
    pub fn new() -> Self {
        Self::with_options(EndpointOptions::default())
    }

    /// Creates a server whose endpoint uses `options`.
    ///
    /// Any shutdown signal in `options` is replaced by the server's own; use
    /// [`RpcServer::shutdown`] instead.
    pub fn with_options(options: EndpointOptions) -> Self {
        let shutdown = AbortController::new();
        let options = options.with_shutdown_signal(shutdown.signal());
        RpcServer {
            endpoint: Arc::new(RpcServiceEndpoint::with_options(options)),
            shutdown,
        }
    }

    /// Returns an `Arc` clone of the underlying RPC service endpoint.
    /// This allows for registering handlers without tying the registration
    /// logic to the server implementation.
    pub fn endpoint(&self) -> Arc<RpcServiceEndpoint> {
        self.endpoint.clone()
    }

    /// Stops accepting connections and ends in-flight calls with
    /// `Unavailable`.
    ///
    /// Returns `false` if the server was already shutting down.
    pub fn shutdown(&self) -> bool {
        tracing::info!("Server shutting down");
        self.shutdown
            .abort(Status::unavailable("server is shutting down"))
    }

    /// An Axum router sending every request to the endpoint.
    ///
    /// Useful for nesting the RPC routes into a larger application.
    pub fn router(&self) -> Router {
        let endpoint = self.endpoint.clone();
        Router::new().fallback(move |request: Request| {
            let endpoint = endpoint.clone();
            async move { Self::handle_request(&endpoint, request, None).await }
        })
    }

    /// Binds to an address and starts the RPC server.
    ///
    /// The address can be any type that implements `ToSocketAddrs`, such as
    /// a string "127.0.0.1:8080" or a `SocketAddr`.
    pub async fn serve<A: ToSocketAddrs>(self, addr: A) -> Result<SocketAddr, RpcServerError> {
        let listener = TcpListener::bind(addr).await.map_err(RpcServerError::Bind)?;
        let server = Arc::new(self);
        server.serve_with_listener(listener).await
    }

    /// Starts the RPC server on a specific host and port.
    pub async fn serve_on(self, host: &str, port: u16) -> Result<SocketAddr, RpcServerError> {
        self.serve(format!("{host}:{port}")).await
    }

    /// Starts the RPC server with a pre-bound `TcpListener`.
    ///
    /// Resolves once [`RpcServer::shutdown`] has been called and open
    /// connections have drained.
    pub async fn serve_with_listener(
        self: Arc<Self>,
        listener: TcpListener,
    ) -> Result<SocketAddr, RpcServerError> {
        let address = listener.local_addr().map_err(RpcServerError::Bind)?;
        let app = Router::new().fallback({
            let endpoint = self.endpoint.clone();
            move |ConnectInfo(peer): ConnectInfo<SocketAddr>, request: Request| {
                let endpoint = endpoint.clone();
                async move { Self::handle_request(&endpoint, request, Some(peer)).await }
            }
        });

        tracing::info!("Server running on {:?}", address);
        let shutdown = self.shutdown.signal();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.aborted().await;
        })
        .await
        .map_err(RpcServerError::Serve)?;
        tracing::info!("Server on {:?} stopped", address);
        Ok(address)
    }

    async fn handle_request(
        endpoint: &RpcServiceEndpoint,
        request: Request,
        peer: Option<SocketAddr>,
    ) -> Response {
        tracing::trace!(
            ?peer,
            method = %request.method(),
            path = request.uri().path(),
            version = ?request.version(),
            "Received request"
        );
        let response = endpoint.handle(into_rpc_request(request)).await;
        from_rpc_response(response)
    }
}
