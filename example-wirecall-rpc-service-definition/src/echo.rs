use serde::{Deserialize, Serialize};
use wirecall_rpc_service::{Idempotency, MethodDescriptor, MethodKind, RpcMethod};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub text: String,
}

/// Returns its input. Free of side effects, so Connect clients may use GET.
pub struct Echo;

impl RpcMethod for Echo {
    const DESCRIPTOR: MethodDescriptor = MethodDescriptor::new(
        crate::DEMO_SERVICE_NAME,
        "Echo",
        MethodKind::Unary,
        "demo.v1.EchoRequest",
        "demo.v1.EchoResponse",
    )
    .with_idempotency(Idempotency::NoSideEffects);

    type Input = EchoRequest;
    type Output = EchoResponse;
}
