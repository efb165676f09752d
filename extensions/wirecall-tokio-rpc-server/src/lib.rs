mod error;
mod http_bridge;
mod rpc_server;
pub mod utils;

pub use error::RpcServerError;
pub use rpc_server::RpcServer;
pub use wirecall_rpc_service_endpoint::{EndpointOptions, RpcServiceEndpoint};
