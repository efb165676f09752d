use std::fmt;
use std::io;

#[derive(Debug)]
pub enum RpcServerError {
    /// The listening socket could not be bound or inspected.
    Bind(io::Error),
    /// The accept loop failed while serving.
    Serve(io::Error),
}

impl fmt::Display for RpcServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcServerError::Bind(err) => write!(f, "Failed to bind listener: {err}"),
            RpcServerError::Serve(err) => write!(f, "Server failed: {err}"),
        }
    }
}

impl std::error::Error for RpcServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RpcServerError::Bind(err) | RpcServerError::Serve(err) => Some(err),
        }
    }
}
