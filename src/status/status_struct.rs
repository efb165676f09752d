use crate::status::{Code, ErrorDetail};
use http::HeaderMap;
use std::fmt;
use std::io;

/// An RPC error: a code, a raw message, metadata and detail records.
///
/// `Status` is the one error type every protocol adapter maps to and from.
/// The metadata holds headers or trailers that travelled with the error.
#[derive(Debug, Clone)]
pub struct Status {
    code: Code,
    message: String,
    metadata: HeaderMap,
    details: Vec<ErrorDetail>,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            metadata: HeaderMap::new(),
            details: Vec::new(),
        }
    }

    /// Creates a status with an empty message.
    pub fn from_code(code: Code) -> Self {
        Self::new(code, String::new())
    }

    pub fn code(&self) -> Code {
        self.code
    }

    /// The raw message, without the code prefix added by `Display`.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn metadata(&self) -> &HeaderMap {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut HeaderMap {
        &mut self.metadata
    }

    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }

    pub fn with_metadata(mut self, metadata: HeaderMap) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.details.push(detail);
        self
    }

    pub fn with_details(mut self, details: impl IntoIterator<Item = ErrorDetail>) -> Self {
        self.details.extend(details);
        self
    }

    /// Merges extra metadata into the status, keeping existing entries.
    pub fn merge_metadata(&mut self, metadata: &HeaderMap) {
        for (name, value) in metadata.iter() {
            self.metadata.append(name.clone(), value.clone());
        }
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(Code::Canceled, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(Code::Unknown, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(Code::DeadlineExceeded, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(Code::ResourceExhausted, message)
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    pub fn data_loss(message: impl Into<String>) -> Self {
        Self::new(Code::DataLoss, message)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "[{}]", self.code)
        } else {
            write!(f, "[{}] {}", self.code, self.message)
        }
    }
}

impl std::error::Error for Status {}

impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message && self.details == other.details
    }
}

impl From<io::Error> for Status {
    fn from(err: io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => Code::InvalidArgument,
            io::ErrorKind::TimedOut => Code::DeadlineExceeded,
            io::ErrorKind::NotFound => Code::NotFound,
            io::ErrorKind::PermissionDenied => Code::PermissionDenied,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Code::Unavailable,
            _ => Code::Unknown,
        };
        Status::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for Status {
    fn from(err: serde_json::Error) -> Self {
        Status::invalid_argument(err.to_string())
    }
}
