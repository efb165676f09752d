use serde::{Deserialize, Serialize};
use wirecall_rpc_service::{MethodDescriptor, MethodKind, RpcMethod};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
}

pub struct Chat;

impl RpcMethod for Chat {
    const DESCRIPTOR: MethodDescriptor = MethodDescriptor::new(
        crate::DEMO_SERVICE_NAME,
        "Chat",
        MethodKind::BiDiStreaming,
        "demo.v1.ChatMessage",
        "demo.v1.ChatMessage",
    );

    type Input = ChatMessage;
    type Output = ChatMessage;
}
