use crate::status::Status;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use http::HeaderMap;

/// A lazily produced sequence of body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, Status>>;

/// One element of a response body: data, or the HTTP trailers that end it.
#[derive(Debug, Clone)]
pub enum BodyFrame {
    Data(Bytes),
    Trailers(HeaderMap),
}

impl BodyFrame {
    pub fn into_data(self) -> Option<Bytes> {
        match self {
            BodyFrame::Data(data) => Some(data),
            BodyFrame::Trailers(_) => None,
        }
    }
}

/// A response body with optional trailing headers.
pub type FrameStream = BoxStream<'static, Result<BodyFrame, Status>>;

pub fn empty_bytes() -> ByteStream {
    stream::empty().boxed()
}

pub fn once_bytes(data: Bytes) -> ByteStream {
    stream::once(async move { Ok(data) }).boxed()
}

/// Buffers a whole body, failing with `ResourceExhausted` past `max_bytes`.
pub async fn collect_bytes(mut body: ByteStream, max_bytes: usize) -> Result<Bytes, Status> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(Status::resource_exhausted(format!(
                "message size is larger than configured readMaxBytes {max_bytes}"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Splits a frame stream into its data chunks and a trailer slot filled once
/// the data is drained.
pub fn split_trailers(frames: FrameStream) -> (ByteStream, TrailerSlot) {
    let slot = TrailerSlot::default();
    let writer = slot.clone();
    let data = frames
        .filter_map(move |frame| {
            let writer = writer.clone();
            async move {
                match frame {
                    Ok(BodyFrame::Data(data)) => Some(Ok(data)),
                    Ok(BodyFrame::Trailers(trailers)) => {
                        writer.set(trailers);
                        None
                    }
                    Err(err) => Some(Err(err)),
                }
            }
        })
        .boxed();
    (data, slot)
}

/// Shared holder for trailers that arrive after the body data.
#[derive(Debug, Clone, Default)]
pub struct TrailerSlot {
    inner: std::sync::Arc<std::sync::Mutex<Option<HeaderMap>>>,
}

impl TrailerSlot {
    pub fn set(&self, trailers: HeaderMap) {
        if let Ok(mut guard) = self.inner.lock() {
            match guard.as_mut() {
                Some(existing) => existing.extend(trailers),
                None => *guard = Some(trailers),
            }
        }
    }

    pub fn take(&self) -> Option<HeaderMap> {
        self.inner.lock().ok().and_then(|mut guard| guard.take())
    }
}
