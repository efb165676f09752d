use crate::status::Status;
use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;

/// Owning half of a one-shot cancellation signal.
///
/// The first call to [`abort`](Self::abort) wins; later calls are no-ops.
/// Every [`AbortSignal`] handed out observes the same reason.
#[derive(Debug, Clone)]
pub struct AbortController {
    inner: Arc<watch::Sender<Option<Status>>>,
}

/// Observing half of an [`AbortController`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<Option<Status>>,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { inner: Arc::new(tx) }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.inner.subscribe(),
        }
    }

    /// Fires the signal with `reason`. Returns `false` if it had already fired.
    pub fn abort(&self, reason: Status) -> bool {
        abort_sender(&self.inner, reason)
    }

    /// Fires the signal with a `Canceled` reason.
    pub fn cancel(&self) -> bool {
        self.abort(Status::canceled("operation was aborted"))
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.borrow().is_some()
    }

    fn downgrade(&self) -> Weak<watch::Sender<Option<Status>>> {
        Arc::downgrade(&self.inner)
    }
}

fn abort_sender(tx: &watch::Sender<Option<Status>>, reason: Status) -> bool {
    tx.send_if_modified(|current| {
        if current.is_some() {
            false
        } else {
            *current = Some(reason);
            true
        }
    })
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(None);
        Self { rx }
    }

    pub fn is_aborted(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// The abort reason, once fired.
    pub fn reason(&self) -> Option<Status> {
        self.rx.borrow().clone()
    }

    /// Resolves with the reason when the signal fires.
    ///
    /// Pends forever if the controller is dropped without firing.
    pub async fn aborted(&self) -> Status {
        match self.fired_or_closed().await {
            Some(reason) => reason,
            None => future::pending().await,
        }
    }

    /// Resolves with the reason when the signal fires, or `None` once every
    /// controller for it is gone.
    async fn fired_or_closed(&self) -> Option<Status> {
        let mut rx = self.rx.clone();
        let fired = rx.wait_for(Option::is_some).await.map(|reason| reason.clone());
        match fired {
            Ok(reason) => reason,
            Err(_) => rx.borrow().clone(),
        }
    }

    /// Ends `items` with the abort reason as soon as this signal fires.
    ///
    /// After the reason is yielded nothing more is polled from `items`; it is
    /// dropped instead. A sequence that already ended is not affected by a
    /// later abort.
    pub fn until_aborted<T: Send + 'static>(
        &self,
        items: BoxStream<'static, Result<T, Status>>,
    ) -> BoxStream<'static, Result<T, Status>> {
        stream::unfold(Some((items, self.clone())), |state| async move {
            let (mut items, signal) = state?;
            if let Some(reason) = signal.reason() {
                return Some((Err(reason), None));
            }
            tokio::select! {
                biased;
                reason = signal.aborted() => Some((Err(reason), None)),
                item = items.next() => match item {
                    Some(Ok(item)) => Some((Ok(item), Some((items, signal)))),
                    Some(Err(status)) => Some((Err(status), None)),
                    None => None,
                },
            }
        })
        .fuse()
        .boxed()
    }

    /// Composes several signals and an optional timeout into one controller.
    ///
    /// The composed signal fires with the reason of whichever source fires
    /// first; an elapsed timeout fires it with `DeadlineExceeded`. The
    /// listening task drops its parent subscriptions as soon as anything
    /// fires, including the composed controller itself being aborted or
    /// dropped.
    ///
    /// Must be called from within a tokio runtime when any source can still
    /// fire.
    pub fn any(
        parents: impl IntoIterator<Item = AbortSignal>,
        timeout: Option<Duration>,
    ) -> AbortController {
        let controller = AbortController::new();
        let parents: Vec<AbortSignal> = parents.into_iter().collect();

        if let Some(reason) = parents.iter().find_map(AbortSignal::reason) {
            controller.abort(reason);
            return controller;
        }

        if timeout == Some(Duration::ZERO) {
            controller.abort(deadline_exceeded());
            return controller;
        }

        let mut sources: Vec<BoxFuture<'static, Status>> = parents
            .into_iter()
            .map(|parent| async move { parent.aborted().await }.boxed())
            .collect();

        if let Some(timeout) = timeout {
            sources.push(
                async move {
                    tokio::time::sleep(timeout).await;
                    deadline_exceeded()
                }
                .boxed(),
            );
        }

        if sources.is_empty() {
            return controller;
        }

        let linked = controller.downgrade();
        let own = controller.signal();

        tokio::spawn(async move {
            tokio::select! {
                (reason, _, _) = future::select_all(sources) => {
                    if let Some(tx) = linked.upgrade() {
                        abort_sender(&tx, reason);
                    }
                }
                _ = own.fired_or_closed() => {}
            }
        });

        controller
    }
}

fn deadline_exceeded() -> Status {
    Status::deadline_exceeded("the operation timed out")
}
