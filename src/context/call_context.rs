use crate::context::{AbortController, AbortSignal};
use crate::method::MethodDescriptor;
use crate::status::Status;
use http::HeaderMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Per-call state shared between the protocol adapter and the method
/// implementation.
///
/// Cloning is cheap; all clones refer to the same call. Response headers
/// and trailers may be edited until the adapter sends them.
#[derive(Debug, Clone)]
pub struct CallContext {
    inner: Arc<CallContextInner>,
}

#[derive(Debug)]
struct CallContextInner {
    descriptor: MethodDescriptor,
    protocol: &'static str,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    controller: AbortController,
    request_headers: HeaderMap,
    response_headers: Mutex<HeaderMap>,
    response_trailers: Mutex<HeaderMap>,
}

impl CallContext {
    /// Creates the context for one call.
    ///
    /// The call signal fires when any of `signals` fires, when `timeout`
    /// elapses (`DeadlineExceeded`), or when the call completes.
    pub fn new(
        descriptor: MethodDescriptor,
        protocol: &'static str,
        request_headers: HeaderMap,
        timeout: Option<Duration>,
        signals: impl IntoIterator<Item = AbortSignal>,
    ) -> Self {
        let controller = AbortSignal::any(signals, timeout);
        Self {
            inner: Arc::new(CallContextInner {
                descriptor,
                protocol,
                timeout,
                deadline: timeout.map(|timeout| Instant::now() + timeout),
                controller,
                request_headers,
                response_headers: Mutex::new(HeaderMap::new()),
                response_trailers: Mutex::new(HeaderMap::new()),
            }),
        }
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.inner.descriptor
    }

    /// Name of the protocol the call arrived over.
    pub fn protocol(&self) -> &'static str {
        self.inner.protocol
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    /// Time left before the deadline, if the call has one.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn signal(&self) -> AbortSignal {
        self.inner.controller.signal()
    }

    /// Aborts the call with `reason`, unless it already finished.
    pub fn abort(&self, reason: Status) -> bool {
        self.inner.controller.abort(reason)
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.inner.request_headers
    }

    pub fn response_headers(&self) -> MutexGuard<'_, HeaderMap> {
        lock(&self.inner.response_headers)
    }

    pub fn response_trailers(&self) -> MutexGuard<'_, HeaderMap> {
        lock(&self.inner.response_trailers)
    }

    /// Takes the response headers, leaving an empty map behind.
    pub fn take_response_headers(&self) -> HeaderMap {
        std::mem::take(&mut *self.response_headers())
    }

    pub fn take_response_trailers(&self) -> HeaderMap {
        std::mem::take(&mut *self.response_trailers())
    }

    /// Marks the call as finished by firing its signal.
    ///
    /// Work still listening on the signal observes `Canceled`.
    pub fn complete(&self) {
        if self.inner.controller.abort(Status::canceled("call completed")) {
            tracing::trace!(path = %self.inner.descriptor.path(), "call context completed");
        }
    }

    /// Guard that completes the context when dropped.
    pub fn completion_guard(&self) -> CompletionGuard {
        CompletionGuard {
            context: self.clone(),
        }
    }
}

fn lock(mutex: &Mutex<HeaderMap>) -> MutexGuard<'_, HeaderMap> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Completes a [`CallContext`] on drop, on every exit path of a call.
#[derive(Debug)]
pub struct CompletionGuard {
    context: CallContext,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.context.complete();
    }
}
