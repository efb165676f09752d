use serde::{Deserialize, Serialize};
use wirecall_rpc_service::{MethodDescriptor, MethodKind, RpcMethod};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumRequest {
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumResponse {
    pub total: i64,
    pub count: u32,
}

/// Adds up every streamed value.
pub struct Sum;

impl RpcMethod for Sum {
    const DESCRIPTOR: MethodDescriptor = MethodDescriptor::new(
        crate::DEMO_SERVICE_NAME,
        "Sum",
        MethodKind::ClientStreaming,
        "demo.v1.SumRequest",
        "demo.v1.SumResponse",
    );

    type Input = SumRequest;
    type Output = SumResponse;
}
