mod rpc_client;

pub use rpc_client::RpcClient;
pub use wirecall_rpc_service_caller::{CallOptions, CallerConfig, RpcCall, RpcServiceCaller};
