use std::sync::Arc;
use wirecall::Status;
use wirecall::protocol::{RpcHttpRequest, RpcHttpResponse};

/// Moves one HTTP exchange between a caller and an endpoint.
///
/// Implemented by network clients and by in-process endpoints. The response
/// is returned once its head is available; the body is read lazily.
#[async_trait::async_trait]
pub trait RpcTransport: Send + Sync {
    async fn send(&self, request: RpcHttpRequest) -> Result<RpcHttpResponse, Status>;
}

#[async_trait::async_trait]
impl<T> RpcTransport for Arc<T>
where
    T: RpcTransport + ?Sized,
{
    async fn send(&self, request: RpcHttpRequest) -> Result<RpcHttpResponse, Status> {
        self.as_ref().send(request).await
    }
}
