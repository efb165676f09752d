use wirecall::context::AbortSignal;
use wirecall::protocol::{Protocol, ProtocolOptions};

/// Endpoint-wide configuration.
#[derive(Debug, Clone)]
pub struct EndpointOptions {
    /// Protocols the endpoint answers, in negotiation order.
    pub protocols: Vec<Protocol>,
    pub protocol_options: ProtocolOptions,
    /// Fired when the process shuts down. Every in-flight call observes it.
    pub shutdown: Option<AbortSignal>,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            protocols: Protocol::ALL.to_vec(),
            protocol_options: ProtocolOptions::default(),
            shutdown: None,
        }
    }
}

impl EndpointOptions {
    pub fn with_protocols(mut self, protocols: impl IntoIterator<Item = Protocol>) -> Self {
        self.protocols = protocols.into_iter().collect();
        self
    }

    pub fn with_protocol_options(mut self, protocol_options: ProtocolOptions) -> Self {
        self.protocol_options = protocol_options;
        self
    }

    pub fn with_shutdown_signal(mut self, shutdown: AbortSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}
