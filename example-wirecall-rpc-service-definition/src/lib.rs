mod chat;
mod count_up;
mod echo;
mod sum;

pub use chat::{Chat, ChatMessage};
pub use count_up::{CountUp, CountUpRequest, CountUpResponse};
pub use echo::{Echo, EchoRequest, EchoResponse};
pub use sum::{Sum, SumRequest, SumResponse};

use wirecall_rpc_service::{RpcMethod, ServiceDescriptor};

pub const DEMO_SERVICE_NAME: &str = "demo.v1.DemoService";

/// Every method of the demo service, in declaration order.
pub const DEMO_SERVICE: ServiceDescriptor = ServiceDescriptor::new(
    DEMO_SERVICE_NAME,
    &[
        Echo::DESCRIPTOR,
        CountUp::DESCRIPTOR,
        Sum::DESCRIPTOR,
        Chat::DESCRIPTOR,
    ],
);
