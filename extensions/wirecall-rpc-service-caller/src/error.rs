use std::fmt;

/// Errors raised while setting up a caller, before any call is made.
///
/// Failures of individual calls are reported as `wirecall::Status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCallerError {
    /// The configured send compression is not in the compression registry.
    UnknownCompression(String),
    /// The base URI lacks a scheme or an authority.
    InvalidBaseUri(String),
}

impl fmt::Display for RpcCallerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcCallerError::UnknownCompression(name) => {
                write!(f, "Unknown send compression: {}", name)
            }
            RpcCallerError::InvalidBaseUri(uri) => write!(f, "Invalid base URI: {}", uri),
        }
    }
}

impl std::error::Error for RpcCallerError {}
