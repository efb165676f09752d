use crate::{CallOptions, Response, RpcServiceCaller, RpcTransport};
use wirecall::Status;
use wirecall_rpc_service::RpcMethod;

/// Call sugar for unary methods: `Echo::call(&caller, input)`.
///
/// Implemented for every [`RpcMethod`]; calling a method that is not unary
/// fails with `Internal`.
#[async_trait::async_trait]
pub trait RpcCall: RpcMethod + Sized {
    async fn call<T: RpcTransport>(
        caller: &RpcServiceCaller<T>,
        input: Self::Input,
    ) -> Result<Self::Output, Status>;
}

#[async_trait::async_trait]
impl<M: RpcMethod> RpcCall for M {
    async fn call<T: RpcTransport>(
        caller: &RpcServiceCaller<T>,
        input: Self::Input,
    ) -> Result<Self::Output, Status> {
        caller
            .unary::<M>(input, CallOptions::default())
            .await
            .map(Response::into_message)
    }
}
