use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use futures::Future;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use wirecall::Status;
use wirecall::context::CallContext;
use wirecall::method::MethodKind;
use wirecall::protocol::{Encoding, MessageStream};
use wirecall_rpc_service::{RpcMethod, Serializer};

/// A type-erased method implementation.
///
/// Receives the call context, the negotiated encoding and the serialized
/// request messages; returns the serialized response messages. An `Err`
/// item ends the call with that status.
pub type RpcHandler = Arc<dyn Fn(CallContext, Encoding, MessageStream) -> MessageStream + Send + Sync>;

/// Typed request messages handed to client- and bidi-streaming methods.
pub type Requests<T> = BoxStream<'static, Result<T, Status>>;

pub(crate) fn unary_handler<M, F, Fut, O>(implementation: F) -> RpcHandler
where
    M: RpcMethod,
    F: Fn(CallContext, M::Input) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, Status>> + Send + 'static,
    O: TryInto<M::Output> + Send + 'static,
    O::Error: fmt::Display,
{
    let implementation = Arc::new(implementation);
    Arc::new(move |context, encoding, inputs| {
        let implementation = implementation.clone();
        let input_serializer = M::input_serializer(encoding);
        let output_serializer = M::output_serializer(encoding);
        stream::once(async move {
            let input = input_serializer.parse(&single_input(inputs).await?)?;
            let output = implementation(context, input).await?;
            encode_output::<M, O>(output, output_serializer)
        })
        .boxed()
    })
}

pub(crate) fn server_stream_handler<M, F, S, O>(implementation: F) -> RpcHandler
where
    M: RpcMethod,
    F: Fn(CallContext, M::Input) -> S + Send + Sync + 'static,
    S: Stream<Item = Result<O, Status>> + Send + 'static,
    O: TryInto<M::Output> + Send + 'static,
    O::Error: fmt::Display,
{
    let implementation = Arc::new(implementation);
    Arc::new(move |context, encoding, inputs| {
        let implementation = implementation.clone();
        let input_serializer = M::input_serializer(encoding);
        let output_serializer = M::output_serializer(encoding);
        stream::once(async move {
            let input = input_serializer.parse(&single_input(inputs).await?)?;
            let outputs = implementation(context, input).map(move |output| {
                output.and_then(|output| encode_output::<M, O>(output, output_serializer))
            });
            Ok::<_, Status>(outputs)
        })
        .try_flatten()
        .boxed()
    })
}

pub(crate) fn client_stream_handler<M, F, Fut, O>(implementation: F) -> RpcHandler
where
    M: RpcMethod,
    F: Fn(CallContext, Requests<M::Input>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, Status>> + Send + 'static,
    O: TryInto<M::Output> + Send + 'static,
    O::Error: fmt::Display,
{
    let implementation = Arc::new(implementation);
    Arc::new(move |context, encoding, inputs| {
        let implementation = implementation.clone();
        let requests = parse_inputs::<M>(inputs, M::input_serializer(encoding));
        let output_serializer = M::output_serializer(encoding);
        stream::once(async move {
            let output = implementation(context, requests).await?;
            encode_output::<M, O>(output, output_serializer)
        })
        .boxed()
    })
}

pub(crate) fn bidi_stream_handler<M, F, S, O>(implementation: F) -> RpcHandler
where
    M: RpcMethod,
    F: Fn(CallContext, Requests<M::Input>) -> S + Send + Sync + 'static,
    S: Stream<Item = Result<O, Status>> + Send + 'static,
    O: TryInto<M::Output> + Send + 'static,
    O::Error: fmt::Display,
{
    Arc::new(move |context, encoding, inputs| {
        let requests = parse_inputs::<M>(inputs, M::input_serializer(encoding));
        let output_serializer = M::output_serializer(encoding);
        implementation(context, requests)
            .map(move |output| {
                output.and_then(|output| encode_output::<M, O>(output, output_serializer))
            })
            .boxed()
    })
}

/// Runs a handler behind the call's error boundary.
///
/// Panics, whether raised while starting the handler or while producing
/// output, become `Internal`. Methods that answer with one message may not
/// produce zero or several.
pub(crate) fn dispatch(
    handler: &RpcHandler,
    kind: MethodKind,
    context: CallContext,
    encoding: Encoding,
    inputs: MessageStream,
) -> MessageStream {
    let method = context.descriptor().to_string();

    let outputs = match panic::catch_unwind(AssertUnwindSafe(|| handler(context, encoding, inputs))) {
        Ok(outputs) => outputs,
        Err(_) => {
            tracing::error!(%method, "Handler panicked");
            return error_stream(Status::internal("handler panicked"));
        }
    };

    let outputs = AssertUnwindSafe(outputs)
        .catch_unwind()
        .map(move |item| match item {
            Ok(item) => item,
            Err(_) => {
                tracing::error!(%method, "Handler panicked");
                Err(Status::internal("handler panicked"))
            }
        })
        .boxed();

    if kind.streams_responses() {
        outputs
    } else {
        exactly_one_output(outputs)
    }
}

pub(crate) fn error_stream(status: Status) -> MessageStream {
    stream::once(async move { Err(status) }).boxed()
}

async fn single_input(mut inputs: MessageStream) -> Result<Bytes, Status> {
    let first = inputs
        .next()
        .await
        .transpose()?
        .ok_or_else(|| Status::invalid_argument("protocol error: missing request message"))?;

    if inputs.next().await.transpose()?.is_some() {
        return Err(Status::invalid_argument(
            "protocol error: received extra request message",
        ));
    }

    Ok(first)
}

fn exactly_one_output(outputs: MessageStream) -> MessageStream {
    stream::unfold(Some((outputs, false)), |state| async move {
        let (mut outputs, sent) = state?;
        match outputs.next().await {
            Some(Ok(message)) if !sent => Some((Ok(message), Some((outputs, true)))),
            Some(Ok(_)) => Some((
                Err(Status::invalid_argument(
                    "protocol error: method produced more than one response message",
                )),
                None,
            )),
            Some(Err(status)) => Some((Err(status), None)),
            None if sent => None,
            None => Some((
                Err(Status::invalid_argument(
                    "protocol error: method produced no response message",
                )),
                None,
            )),
        }
    })
    .fuse()
    .boxed()
}

fn parse_inputs<M: RpcMethod>(
    inputs: MessageStream,
    serializer: Serializer<M::Input>,
) -> Requests<M::Input> {
    inputs
        .map(move |message| message.and_then(|bytes| serializer.parse(&bytes)))
        .boxed()
}

fn encode_output<M, O>(output: O, serializer: Serializer<M::Output>) -> Result<Bytes, Status>
where
    M: RpcMethod,
    O: TryInto<M::Output>,
    O::Error: fmt::Display,
{
    let output = output.try_into().map_err(|err| {
        Status::internal(format!(
            "failed to convert response to {}: {err}",
            M::DESCRIPTOR.output_type
        ))
    })?;
    serializer.serialize(&output)
}
