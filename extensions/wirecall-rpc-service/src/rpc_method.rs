use crate::Serializer;
use serde::Serialize;
use serde::de::DeserializeOwned;
use wirecall::method::MethodDescriptor;
use wirecall::protocol::Encoding;

/// A typed RPC method: its descriptor plus its message types.
///
/// Implementations are usually zero-sized marker types, one per method:
///
/// ```ignore
/// pub struct Echo;
///
/// impl RpcMethod for Echo {
///     const DESCRIPTOR: MethodDescriptor = MethodDescriptor::new(
///         "demo.v1.EchoService", "Echo", MethodKind::Unary, "demo.v1.EchoRequest", "demo.v1.EchoResponse",
///     );
///     type Input = EchoRequest;
///     type Output = EchoResponse;
/// }
/// ```
///
/// The call shape declared by `DESCRIPTOR.kind` decides which caller and
/// endpoint entry points accept the method.
pub trait RpcMethod: Send + Sync + 'static {
    /// Service, method name, call shape and idempotency.
    const DESCRIPTOR: MethodDescriptor;

    /// The request message type.
    type Input: Serialize + DeserializeOwned + Send + 'static;

    /// The response message type.
    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Serializer for request messages in the given wire encoding.
    fn input_serializer(encoding: Encoding) -> Serializer<Self::Input> {
        Serializer::for_encoding(encoding)
    }

    /// Serializer for response messages in the given wire encoding.
    fn output_serializer(encoding: Encoding) -> Serializer<Self::Output> {
        Serializer::for_encoding(encoding)
    }
}
