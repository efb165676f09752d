use std::fmt;
use wirecall::method::MethodKind;

/// Errors raised while registering handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcServiceEndpointError {
    /// A handler for this path is already registered.
    DuplicateHandler(String),
    /// The registration entry point does not match the declared call shape.
    KindMismatch {
        path: String,
        declared: MethodKind,
        registered: MethodKind,
    },
}

impl fmt::Display for RpcServiceEndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcServiceEndpointError::DuplicateHandler(path) => {
                write!(f, "a handler for {} is already registered", path)
            }
            RpcServiceEndpointError::KindMismatch {
                path,
                declared,
                registered,
            } => write!(
                f,
                "{} is declared {:?} but was registered as {:?}",
                path, declared, registered
            ),
        }
    }
}

impl std::error::Error for RpcServiceEndpointError {}
