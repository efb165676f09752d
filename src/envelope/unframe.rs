use crate::body::ByteStream;
use crate::envelope::{Envelope, EnvelopeCodec, EnvelopeStreamDecoder};
use crate::status::Status;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;

struct UnframeState {
    body: ByteStream,
    decoder: EnvelopeStreamDecoder,
    pending: VecDeque<Result<Envelope, Status>>,
    done: bool,
}

/// Turns a chunked body into a lazy sequence of envelopes.
///
/// Pulls one chunk at a time from `body`, only when the consumer asks for the
/// next envelope. The sequence ends cleanly when the body ends on an envelope
/// boundary; a truncated tail yields one `DataLoss` error. The first error
/// ends the sequence.
pub fn unframe(body: ByteStream, max_length: usize) -> BoxStream<'static, Result<Envelope, Status>> {
    let state = UnframeState {
        body,
        decoder: EnvelopeStreamDecoder::new(max_length),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.pending.clear();
                    state.done = true;
                }
                return Some((item, state));
            }

            if state.done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let decoded = state.decoder.read_bytes(&chunk);
                    state.pending.extend(decoded);
                }
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.done = true;
                    if let Err(err) = state.decoder.finish() {
                        return Some((Err(err), state));
                    }
                }
            }
        }
    })
    .boxed()
}

/// Encodes each envelope of a sequence into its wire bytes.
pub fn frame_messages(envelopes: BoxStream<'static, Result<Envelope, Status>>) -> ByteStream {
    envelopes
        .map(|envelope| envelope.and_then(|envelope| EnvelopeCodec::encode(&envelope)))
        .boxed()
}
