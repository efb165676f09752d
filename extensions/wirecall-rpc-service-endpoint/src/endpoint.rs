use crate::dispatch::{
    bidi_stream_handler, client_stream_handler, dispatch, error_stream, server_stream_handler,
    unary_handler,
};
use crate::error::RpcServiceEndpointError;
use crate::{EndpointOptions, Requests, RpcHandler};
use futures::stream::{Stream, StreamExt};
use futures::Future;
use http::StatusCode;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use wirecall::Status;
use wirecall::context::{CallContext, CompletionGuard};
use wirecall::method::{MethodDescriptor, MethodKind, ServiceDescriptor};
use wirecall::protocol::{
    MessageStream, ProtocolAdapter, RpcHttpRequest, RpcHttpResponse, negotiate_protocol,
};
use wirecall_rpc_service::RpcMethod;

#[derive(Clone)]
struct Route {
    descriptor: MethodDescriptor,
    // `None` for methods declared through a service but not implemented.
    handler: Option<RpcHandler>,
}

/// Serves registered methods over every enabled protocol.
///
/// Routes by request path, negotiates the protocol, then runs the method
/// through the dispatch pipeline. `handle` never fails: every outcome,
/// including rejection, is an HTTP response.
pub struct RpcServiceEndpoint {
    routes: RwLock<HashMap<String, Route>>,
    adapters: Vec<Arc<dyn ProtocolAdapter>>,
    options: EndpointOptions,
}

impl Default for RpcServiceEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RpcServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcServiceEndpoint")
            .field("adapters", &self.adapters)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RpcServiceEndpoint {
    /// Creates an endpoint answering every protocol with default options.
    pub fn new() -> Self {
        Self::with_options(EndpointOptions::default())
    }

    pub fn with_options(options: EndpointOptions) -> Self {
        let adapters = options
            .protocols
            .iter()
            .map(|protocol| protocol.adapter(options.protocol_options.clone()))
            .collect();
        Self {
            routes: RwLock::new(HashMap::new()),
            adapters,
            options,
        }
    }

    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    /// Registers a unary method: one request, one response.
    ///
    /// The implementation may return any type convertible into the declared
    /// output; a failed conversion ends the call with `Internal`.
    pub fn register_unary<M, F, Fut, O>(
        &self,
        _method: M,
        implementation: F,
    ) -> Result<(), RpcServiceEndpointError>
    where
        M: RpcMethod,
        F: Fn(CallContext, M::Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, Status>> + Send + 'static,
        O: TryInto<M::Output> + Send + 'static,
        O::Error: fmt::Display,
    {
        self.register::<M>(MethodKind::Unary, unary_handler::<M, F, Fut, O>(implementation))
    }

    /// Registers a server-streaming method: one request, a response stream.
    pub fn register_server_stream<M, F, S, O>(
        &self,
        _method: M,
        implementation: F,
    ) -> Result<(), RpcServiceEndpointError>
    where
        M: RpcMethod,
        F: Fn(CallContext, M::Input) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<O, Status>> + Send + 'static,
        O: TryInto<M::Output> + Send + 'static,
        O::Error: fmt::Display,
    {
        self.register::<M>(
            MethodKind::ServerStreaming,
            server_stream_handler::<M, F, S, O>(implementation),
        )
    }

    /// Registers a client-streaming method: a request stream, one response.
    pub fn register_client_stream<M, F, Fut, O>(
        &self,
        _method: M,
        implementation: F,
    ) -> Result<(), RpcServiceEndpointError>
    where
        M: RpcMethod,
        F: Fn(CallContext, Requests<M::Input>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, Status>> + Send + 'static,
        O: TryInto<M::Output> + Send + 'static,
        O::Error: fmt::Display,
    {
        self.register::<M>(
            MethodKind::ClientStreaming,
            client_stream_handler::<M, F, Fut, O>(implementation),
        )
    }

    /// Registers a bidirectional-streaming method.
    pub fn register_bidi_stream<M, F, S, O>(
        &self,
        _method: M,
        implementation: F,
    ) -> Result<(), RpcServiceEndpointError>
    where
        M: RpcMethod,
        F: Fn(CallContext, Requests<M::Input>) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<O, Status>> + Send + 'static,
        O: TryInto<M::Output> + Send + 'static,
        O::Error: fmt::Display,
    {
        self.register::<M>(
            MethodKind::BiDiStreaming,
            bidi_stream_handler::<M, F, S, O>(implementation),
        )
    }

    /// Registers an untyped handler working on serialized messages.
    pub fn register_handler(
        &self,
        descriptor: MethodDescriptor,
        handler: RpcHandler,
    ) -> Result<(), RpcServiceEndpointError> {
        self.insert_route(descriptor, Some(handler))
    }

    /// Declares every method of a service.
    ///
    /// Methods without a registered handler answer `Unimplemented`. Handlers
    /// may be registered before or after the service.
    pub fn register_service(&self, service: &ServiceDescriptor) {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        for descriptor in service.methods {
            routes.entry(descriptor.path()).or_insert(Route {
                descriptor: *descriptor,
                handler: None,
            });
        }
    }

    fn register<M: RpcMethod>(
        &self,
        registered: MethodKind,
        handler: RpcHandler,
    ) -> Result<(), RpcServiceEndpointError> {
        let descriptor = M::DESCRIPTOR;
        if descriptor.kind != registered {
            return Err(RpcServiceEndpointError::KindMismatch {
                path: descriptor.path(),
                declared: descriptor.kind,
                registered,
            });
        }
        self.insert_route(descriptor, Some(handler))
    }

    fn insert_route(
        &self,
        descriptor: MethodDescriptor,
        handler: Option<RpcHandler>,
    ) -> Result<(), RpcServiceEndpointError> {
        let path = descriptor.path();
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        match routes.entry(path) {
            Entry::Occupied(mut entry) if entry.get().handler.is_none() => {
                entry.insert(Route {
                    descriptor,
                    handler,
                });
                Ok(())
            }
            Entry::Occupied(entry) => Err(RpcServiceEndpointError::DuplicateHandler(
                entry.key().clone(),
            )),
            Entry::Vacant(entry) => {
                entry.insert(Route {
                    descriptor,
                    handler,
                });
                Ok(())
            }
        }
    }

    /// Descriptors of every routed method, sorted by path.
    pub fn methods(&self) -> Vec<MethodDescriptor> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        let mut methods: Vec<MethodDescriptor> =
            routes.values().map(|route| route.descriptor).collect();
        methods.sort_by_key(MethodDescriptor::path);
        methods
    }

    /// Serves one request.
    pub async fn handle(&self, request: RpcHttpRequest) -> RpcHttpResponse {
        let route = {
            let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
            routes.get(request.uri.path()).cloned()
        };
        let Some(route) = route else {
            tracing::warn!(path = request.uri.path(), "No route for request");
            return RpcHttpResponse::empty(StatusCode::NOT_FOUND);
        };
        let descriptor = route.descriptor;

        let adapter = match negotiate_protocol(
            &self.adapters,
            &descriptor,
            &request.method,
            request.version,
            request.content_type(),
        ) {
            Ok(adapter) => adapter,
            Err(rejection) => return rejection,
        };

        let metadata = adapter.decode_request_metadata(
            &descriptor,
            &request.method,
            &request.uri,
            &request.headers,
        );

        let context = CallContext::new(
            descriptor,
            adapter.name(),
            request.headers.clone(),
            metadata.timeout,
            self.options.shutdown.clone(),
        );
        let guard = context.completion_guard();

        tracing::debug!(
            method = %descriptor,
            protocol = adapter.name(),
            encoding = %metadata.encoding,
            timeout = ?metadata.timeout,
            request_compression = ?metadata.compression.request.as_ref().map(|a| a.name()),
            response_compression = ?metadata.compression.response.as_ref().map(|a| a.name()),
            "Dispatching call"
        );

        let outputs = match (&metadata.error, &route.handler) {
            (Some(error), _) => {
                tracing::warn!(method = %descriptor, %error, "Rejecting call before dispatch");
                error_stream(error.clone())
            }
            (None, None) => error_stream(Status::unimplemented(format!(
                "{} is not implemented",
                descriptor.path()
            ))),
            (None, Some(handler)) => {
                let inputs = adapter.read_request(&descriptor, request, &metadata);
                dispatch(handler, descriptor.kind, context.clone(), metadata.encoding, inputs)
            }
        };

        let outputs = complete_on_drop(context.signal().until_aborted(outputs), guard);
        adapter.build_response(&context, &metadata, outputs).await
    }
}

/// Ties the call's completion to the lifetime of its output.
fn complete_on_drop(outputs: MessageStream, guard: CompletionGuard) -> MessageStream {
    outputs
        .map(move |item| {
            let _guard = &guard;
            item
        })
        .boxed()
}
