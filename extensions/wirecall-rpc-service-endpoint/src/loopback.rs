use crate::RpcServiceEndpoint;
use wirecall::Status;
use wirecall::protocol::{RpcHttpRequest, RpcHttpResponse};
use wirecall_rpc_service_caller::RpcTransport;

/// Calls the endpoint in-process, without a network hop.
#[async_trait::async_trait]
impl RpcTransport for RpcServiceEndpoint {
    async fn send(&self, request: RpcHttpRequest) -> Result<RpcHttpResponse, Status> {
        Ok(self.handle(request).await)
    }
}
