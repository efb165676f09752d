use futures::Stream;
use futures::stream::{BoxStream, StreamExt};
use http::HeaderMap;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use wirecall::Status;
use wirecall::body::TrailerSlot;
use wirecall::context::AbortController;

/// Result of a call that returns a single message.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub message: T,
    pub headers: HeaderMap,
    pub trailers: HeaderMap,
}

impl<T> Response<T> {
    pub fn into_message(self) -> T {
        self.message
    }
}

/// Typed response messages of a streaming call.
///
/// Yields each message in order. A failed call ends with one `Err` item
/// carrying its status. Trailers become available once the stream ends.
pub struct Streaming<T> {
    headers: HeaderMap,
    messages: BoxStream<'static, Result<T, Status>>,
    trailer_slot: TrailerSlot,
    trailers: Option<HeaderMap>,
    // Keeps the deadline timer and caller signal linked until the response is dropped.
    _controller: AbortController,
}

impl<T> Streaming<T> {
    pub(crate) fn new(
        headers: HeaderMap,
        messages: BoxStream<'static, Result<T, Status>>,
        trailer_slot: TrailerSlot,
        controller: AbortController,
    ) -> Self {
        Self {
            headers,
            messages,
            trailer_slot,
            trailers: None,
            _controller: controller,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Trailers received so far. Empty until the stream has been drained.
    pub fn trailers(&mut self) -> &HeaderMap {
        if let Some(received) = self.trailer_slot.take() {
            self.trailers.get_or_insert_with(HeaderMap::new).extend(received);
        }
        self.trailers.get_or_insert_with(HeaderMap::new)
    }

    /// Next message, `Ok(None)` at a clean end.
    pub async fn message(&mut self) -> Result<Option<T>, Status> {
        self.messages.next().await.transpose()
    }
}

impl<T> Stream for Streaming<T> {
    type Item = Result<T, Status>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.messages.poll_next_unpin(cx)
    }
}

impl<T> fmt::Debug for Streaming<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streaming")
            .field("headers", &self.headers)
            .field("trailers", &self.trailers)
            .finish_non_exhaustive()
    }
}
