use crate::body::{BodyFrame, ByteStream, FrameStream};
use crate::envelope::{Envelope, EnvelopeCodec, EnvelopeCompressor, unframe};
use crate::protocol::MessageStream;
use crate::status::Status;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;

/// Unframes and decompresses a body, lazily.
pub(crate) fn read_envelopes(
    body: ByteStream,
    compressor: EnvelopeCompressor,
    read_max_bytes: usize,
) -> BoxStream<'static, Result<Envelope, Status>> {
    unframe(body, read_max_bytes)
        .map(move |envelope| envelope.and_then(|envelope| compressor.decompress(envelope)))
        .boxed()
}

/// Message sequence of an enveloped request body. Requests never carry
/// terminal records, so any flag besides compression is rejected.
pub(crate) fn request_messages(
    body: ByteStream,
    compressor: EnvelopeCompressor,
    read_max_bytes: usize,
) -> MessageStream {
    let envelopes = read_envelopes(body, compressor, read_max_bytes);
    stream::unfold((envelopes, false), |(mut envelopes, done)| async move {
        if done {
            return None;
        }
        match envelopes.next().await? {
            Ok(envelope) if envelope.flags == 0 => Some((Ok(envelope.data), (envelopes, false))),
            Ok(envelope) => Some((
                Err(Status::invalid_argument(format!(
                    "protocol error: invalid envelope flags {:#04x} in request",
                    envelope.flags
                ))),
                (envelopes, true),
            )),
            Err(err) => Some((Err(err), (envelopes, true))),
        }
    })
    .boxed()
}

/// Compresses and frames one outgoing message.
pub(crate) fn encode_message(
    message: Bytes,
    compressor: &EnvelopeCompressor,
    write_max_bytes: usize,
) -> Result<Bytes, Status> {
    if message.len() > write_max_bytes {
        return Err(Status::resource_exhausted(format!(
            "message size {} exceeds writeMaxBytes {write_max_bytes}",
            message.len()
        )));
    }
    let envelope = compressor.compress(Envelope::message(message))?;
    EnvelopeCodec::encode(&envelope)
}

/// Produces the body frames that end a response, given the terminal error.
pub(crate) type Finisher = Box<dyn FnOnce(Option<Status>) -> Vec<BodyFrame> + Send>;

struct ResponseBodyState {
    pending: Option<Bytes>,
    rest: MessageStream,
    compressor: EnvelopeCompressor,
    write_max_bytes: usize,
    finish: Option<Finisher>,
    terminal: VecDeque<BodyFrame>,
}

/// Builds an enveloped response body.
///
/// `first` is the message already pulled to build the response head. Each
/// further message is pulled only when the transport asks for more body.
/// The sequence ends with whatever `finish` produces for the outcome.
pub(crate) fn response_body(
    first: Option<Bytes>,
    rest: MessageStream,
    compressor: EnvelopeCompressor,
    write_max_bytes: usize,
    finish: Finisher,
) -> FrameStream {
    let state = ResponseBodyState {
        pending: first,
        rest,
        compressor,
        write_max_bytes,
        finish: Some(finish),
        terminal: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        if let Some(frame) = state.terminal.pop_front() {
            return Some((Ok(frame), state));
        }
        let finish = state.finish.take()?;

        let next = match state.pending.take() {
            Some(message) => Some(Ok(message)),
            None => state.rest.next().await,
        };

        let outcome = match next {
            Some(Ok(message)) => {
                match encode_message(message, &state.compressor, state.write_max_bytes) {
                    Ok(frame) => {
                        state.finish = Some(finish);
                        return Some((Ok(BodyFrame::Data(frame)), state));
                    }
                    Err(err) => Some(err),
                }
            }
            Some(Err(err)) => Some(err),
            None => None,
        };

        if let Some(err) = &outcome {
            tracing::debug!(code = %err.code(), message = err.message(), "response ended with error");
        }
        state.terminal.extend(finish(outcome));
        let frame = state.terminal.pop_front()?;
        Some((Ok(frame), state))
    })
    .boxed()
}

/// Client-side message sequence of an enveloped response.
///
/// `is_terminal` recognizes the in-band terminal record, which is handed to
/// `on_terminal`; any envelope after it is an error. `on_end` runs once the
/// body is exhausted and is told whether a terminal record was seen.
pub(crate) fn response_messages<T, E>(
    envelopes: BoxStream<'static, Result<Envelope, Status>>,
    is_terminal: fn(&Envelope) -> bool,
    on_terminal: T,
    on_end: E,
) -> MessageStream
where
    T: FnOnce(Envelope) -> Result<(), Status> + Send + 'static,
    E: FnOnce(bool) -> Result<(), Status> + Send + 'static,
{
    struct State<T, E> {
        envelopes: BoxStream<'static, Result<Envelope, Status>>,
        on_terminal: Option<T>,
        on_end: Option<E>,
        terminal_seen: bool,
    }

    let state = State {
        envelopes,
        on_terminal: Some(on_terminal),
        on_end: Some(on_end),
        terminal_seen: false,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            // `on_end` is consumed once the sequence is finished.
            state.on_end.as_ref()?;

            match state.envelopes.next().await {
                Some(Err(err)) => {
                    state.on_end = None;
                    return Some((Err(err), state));
                }
                Some(Ok(_)) if state.terminal_seen => {
                    state.on_end = None;
                    return Some((
                        Err(Status::invalid_argument(
                            "protocol error: received extra data after end of stream",
                        )),
                        state,
                    ));
                }
                Some(Ok(envelope)) if is_terminal(&envelope) => {
                    state.terminal_seen = true;
                    if let Some(on_terminal) = state.on_terminal.take() {
                        if let Err(err) = on_terminal(envelope) {
                            state.on_end = None;
                            return Some((Err(err), state));
                        }
                    }
                }
                Some(Ok(envelope)) if envelope.flags != 0 => {
                    state.on_end = None;
                    return Some((
                        Err(Status::invalid_argument(format!(
                            "protocol error: invalid envelope flags {:#04x}",
                            envelope.flags
                        ))),
                        state,
                    ));
                }
                Some(Ok(envelope)) => return Some((Ok(envelope.data), state)),
                None => {
                    let on_end = state.on_end.take()?;
                    return match on_end(state.terminal_seen) {
                        Ok(()) => None,
                        Err(err) => Some((Err(err), state)),
                    };
                }
            }
        }
    })
    .boxed()
}
