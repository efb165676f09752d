mod codec;
pub use codec::*;
mod rpc_method;
pub use rpc_method::*;
mod serializer;
pub use serializer::*;

pub use wirecall::method::{Idempotency, MethodDescriptor, MethodKind, ServiceDescriptor};
pub use wirecall::protocol::Encoding;
