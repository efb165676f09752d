use serde::{Deserialize, Serialize};
use wirecall_rpc_service::{MethodDescriptor, MethodKind, RpcMethod};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountUpRequest {
    /// Last number to send, inclusive.
    pub to: u32,
    /// Pause between numbers, in milliseconds.
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountUpResponse {
    pub number: u32,
}

/// Streams `1..=to`.
pub struct CountUp;

impl RpcMethod for CountUp {
    const DESCRIPTOR: MethodDescriptor = MethodDescriptor::new(
        crate::DEMO_SERVICE_NAME,
        "CountUp",
        MethodKind::ServerStreaming,
        "demo.v1.CountUpRequest",
        "demo.v1.CountUpResponse",
    );

    type Input = CountUpRequest;
    type Output = CountUpResponse;
}
