use crate::RpcTransport;
use std::sync::Arc;
use wirecall::Status;
use wirecall::protocol::{RpcHttpRequest, RpcHttpResponse};

/// Wraps every HTTP exchange made by a caller.
///
/// An interceptor may edit the request, short-circuit with its own
/// response or error, or inspect the response returned by `next`.
/// Interceptors run in registration order: the first one registered is the
/// outermost and sees the request first and the response last.
#[async_trait::async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(
        &self,
        request: RpcHttpRequest,
        next: Next<'_>,
    ) -> Result<RpcHttpResponse, Status>;
}

/// The remainder of the interceptor chain, ending at the transport.
pub struct Next<'a> {
    transport: &'a dyn RpcTransport,
    rest: &'a [Arc<dyn Interceptor>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(transport: &'a dyn RpcTransport, chain: &'a [Arc<dyn Interceptor>]) -> Self {
        Self {
            transport,
            rest: chain,
        }
    }

    /// Passes the request on to the next interceptor, or to the transport.
    pub async fn run(self, request: RpcHttpRequest) -> Result<RpcHttpResponse, Status> {
        match self.rest.split_first() {
            Some((interceptor, rest)) => {
                interceptor
                    .intercept(
                        request,
                        Next {
                            transport: self.transport,
                            rest,
                        },
                    )
                    .await
            }
            None => self.transport.send(request).await,
        }
    }
}
