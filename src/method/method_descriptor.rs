use std::fmt;

/// Call shape of a method.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BiDiStreaming,
}

impl MethodKind {
    /// Whether the client sends a sequence of messages.
    pub fn streams_requests(self) -> bool {
        matches!(self, MethodKind::ClientStreaming | MethodKind::BiDiStreaming)
    }

    /// Whether the server sends a sequence of messages.
    pub fn streams_responses(self) -> bool {
        matches!(self, MethodKind::ServerStreaming | MethodKind::BiDiStreaming)
    }

    pub fn is_unary(self) -> bool {
        self == MethodKind::Unary
    }
}

/// Declared side effects of a method.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Idempotency {
    #[default]
    Unknown,
    /// Safe to issue as an HTTP GET.
    NoSideEffects,
    Idempotent,
}

/// Immutable description of one RPC method.
///
/// Descriptors are created once, usually as `const` items next to the
/// method's message types, and shared read-only by every call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub service: &'static str,
    pub method: &'static str,
    pub kind: MethodKind,
    pub input_type: &'static str,
    pub output_type: &'static str,
    pub idempotency: Idempotency,
}

impl MethodDescriptor {
    pub const fn new(
        service: &'static str,
        method: &'static str,
        kind: MethodKind,
        input_type: &'static str,
        output_type: &'static str,
    ) -> Self {
        Self {
            service,
            method,
            kind,
            input_type,
            output_type,
            idempotency: Idempotency::Unknown,
        }
    }

    pub const fn with_idempotency(mut self, idempotency: Idempotency) -> Self {
        self.idempotency = idempotency;
        self
    }

    /// The HTTP request path, `/<service>/<method>`.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }

    /// Whether a unary Connect call to this method may use HTTP GET.
    pub fn allows_get(&self) -> bool {
        self.kind.is_unary() && self.idempotency == Idempotency::NoSideEffects
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.method)
    }
}
