use crate::error::RpcCallerError;
use crate::{CallOptions, CallerConfig, Next, Response, RpcTransport, Streaming};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::sync::Arc;
use wirecall::Status;
use wirecall::compression::CompressionAlgorithm;
use wirecall::context::AbortSignal;
use wirecall::method::MethodKind;
use wirecall::protocol::{ClientCall, ProtocolAdapter};
use wirecall_rpc_service::RpcMethod;

/// Issues typed calls over an [`RpcTransport`].
///
/// One caller speaks one protocol and one encoding. Every call runs
/// through the configured interceptors, observes its cancellation signal
/// and timeout, and decodes its response lazily.
pub struct RpcServiceCaller<T> {
    transport: T,
    config: CallerConfig,
    adapter: Arc<dyn ProtocolAdapter>,
    send_compression: Option<Arc<dyn CompressionAlgorithm>>,
}

impl<T: RpcTransport> RpcServiceCaller<T> {
    pub fn new(transport: T, config: CallerConfig) -> Result<Self, RpcCallerError> {
        if config.base_uri.scheme().is_none() || config.base_uri.authority().is_none() {
            return Err(RpcCallerError::InvalidBaseUri(config.base_uri.to_string()));
        }

        let send_compression = match config.send_compression.as_deref() {
            None | Some("identity") => None,
            Some(name) => Some(
                config
                    .protocol_options
                    .compression
                    .get(name)
                    .ok_or_else(|| RpcCallerError::UnknownCompression(name.to_string()))?,
            ),
        };

        let adapter = config.protocol.adapter(config.protocol_options.clone());

        Ok(Self {
            transport,
            config,
            adapter,
            send_compression,
        })
    }

    pub fn config(&self) -> &CallerConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends one message and receives exactly one.
    pub async fn unary<M: RpcMethod>(
        &self,
        input: M::Input,
        options: CallOptions,
    ) -> Result<Response<M::Output>, Status> {
        expect_kind::<M>(MethodKind::Unary)?;
        let streaming = self
            .execute::<M>(stream::once(async move { input }).boxed(), options)
            .await?;
        single_message(streaming).await
    }

    /// Sends one message and receives a stream.
    pub async fn server_stream<M: RpcMethod>(
        &self,
        input: M::Input,
        options: CallOptions,
    ) -> Result<Streaming<M::Output>, Status> {
        expect_kind::<M>(MethodKind::ServerStreaming)?;
        self.execute::<M>(stream::once(async move { input }).boxed(), options)
            .await
    }

    /// Sends a stream and receives exactly one message.
    pub async fn client_stream<M: RpcMethod>(
        &self,
        inputs: impl Stream<Item = M::Input> + Send + 'static,
        options: CallOptions,
    ) -> Result<Response<M::Output>, Status> {
        expect_kind::<M>(MethodKind::ClientStreaming)?;
        let streaming = self.execute::<M>(inputs.boxed(), options).await?;
        single_message(streaming).await
    }

    /// Sends and receives streams. Needs a full-duplex transport.
    pub async fn bidi_stream<M: RpcMethod>(
        &self,
        inputs: impl Stream<Item = M::Input> + Send + 'static,
        options: CallOptions,
    ) -> Result<Streaming<M::Output>, Status> {
        expect_kind::<M>(MethodKind::BiDiStreaming)?;
        self.execute::<M>(inputs.boxed(), options).await
    }

    async fn execute<M: RpcMethod>(
        &self,
        inputs: BoxStream<'static, M::Input>,
        options: CallOptions,
    ) -> Result<Streaming<M::Output>, Status> {
        let descriptor = M::DESCRIPTOR;
        let timeout = options.timeout.or(self.config.timeout);

        // Caller signal and deadline, composed.
        let controller = AbortSignal::any(options.signal, timeout);
        let signal = controller.signal();
        if let Some(reason) = signal.reason() {
            return Err(reason);
        }

        let call = ClientCall {
            descriptor,
            base_uri: self.config.base_uri.clone(),
            encoding: self.config.encoding,
            send_compression: self.send_compression.clone(),
            timeout,
            headers: options.headers,
            use_get: self.config.use_http_get && descriptor.allows_get(),
        };

        tracing::debug!(
            method = %descriptor,
            protocol = self.adapter.name(),
            encoding = %call.encoding,
            ?timeout,
            "Starting call"
        );

        let input_serializer = M::input_serializer(call.encoding);
        let messages = inputs
            .map(move |input| input_serializer.serialize(&input))
            .boxed();

        let exchange = async {
            let request = self.adapter.build_request(&call, messages).await?;
            let response = Next::new(&self.transport, &self.config.interceptors)
                .run(request)
                .await?;
            self.adapter.read_response(&call, response).await
        };

        let response = tokio::select! {
            reason = signal.aborted() => return Err(reason),
            response = exchange => response?,
        };

        let output_serializer = M::output_serializer(call.encoding);
        let messages = response
            .messages
            .map(move |message| message.and_then(|bytes| output_serializer.parse(&bytes)))
            .boxed();

        Ok(Streaming::new(
            response.headers,
            signal.until_aborted(messages),
            response.trailers,
            controller,
        ))
    }
}

fn expect_kind<M: RpcMethod>(kind: MethodKind) -> Result<(), Status> {
    if M::DESCRIPTOR.kind == kind {
        Ok(())
    } else {
        Err(Status::internal(format!(
            "{} is declared {:?}, not {:?}",
            M::DESCRIPTOR,
            M::DESCRIPTOR.kind,
            kind
        )))
    }
}

async fn single_message<T>(mut streaming: Streaming<T>) -> Result<Response<T>, Status> {
    let message = streaming.message().await?.ok_or_else(|| {
        Status::invalid_argument("protocol error: missing output message for unary method")
    })?;

    if streaming.message().await?.is_some() {
        return Err(Status::invalid_argument(
            "protocol error: received extra output message for unary method",
        ));
    }

    Ok(Response {
        message,
        headers: streaming.headers().clone(),
        trailers: streaming.trailers().clone(),
    })
}
