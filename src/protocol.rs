mod connect;
mod connect_error;
mod content_type_cache;
mod encoding;
mod enveloped;
mod grpc;
mod grpc_status;
mod grpc_web;
mod headers;
mod negotiator;
mod protocol_adapter;
mod protocol_options;
mod rpc_http;
mod timeout;
mod trailer_block;

pub use connect::{ConnectAdapter, ConnectContentType};
pub use connect_error::{decode_connect_error, decode_end_stream, encode_connect_error, encode_end_stream};
pub use content_type_cache::ContentTypeCache;
pub use encoding::Encoding;
pub use grpc::GrpcAdapter;
pub use grpc_status::{find_grpc_status, set_grpc_status};
pub use grpc_web::GrpcWebAdapter;
pub use negotiator::negotiate_protocol;
pub use protocol_adapter::{ClientCall, ClientResponse, MessageStream, ProtocolAdapter, RequestMetadata};
pub use protocol_options::ProtocolOptions;
pub use rpc_http::{RpcHttpRequest, RpcHttpResponse};
pub use timeout::{encode_connect_timeout, encode_grpc_timeout, parse_connect_timeout, parse_grpc_timeout};
pub use trailer_block::{decode_trailer_block, encode_trailer_block};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The wire protocols an endpoint can speak and a client can use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    Grpc,
    GrpcWeb,
    #[default]
    Connect,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Grpc, Protocol::GrpcWeb, Protocol::Connect];

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Grpc => "grpc",
            Protocol::GrpcWeb => "grpc-web",
            Protocol::Connect => "connect",
        }
    }

    /// Creates this protocol's adapter.
    pub fn adapter(self, options: ProtocolOptions) -> Arc<dyn ProtocolAdapter> {
        match self {
            Protocol::Grpc => Arc::new(GrpcAdapter::new(options)),
            Protocol::GrpcWeb => Arc::new(GrpcWebAdapter::new(options)),
            Protocol::Connect => Arc::new(ConnectAdapter::new(options)),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .into_iter()
            .find(|protocol| protocol.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown protocol \"{s}\""))
    }
}
