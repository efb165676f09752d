use std::time::Duration;
use wirecall::context::{AbortController, AbortSignal, CallContext};
use wirecall::method::{MethodDescriptor, MethodKind};
use wirecall::{Code, Status};

const METHOD: MethodDescriptor =
    MethodDescriptor::new("test.v1.Svc", "Run", MethodKind::Unary, "test.v1.In", "test.v1.Out");

#[test]
fn first_abort_reason_wins() {
    let controller = AbortController::new();
    let signal = controller.signal();

    assert!(!signal.is_aborted());
    assert!(controller.abort(Status::unavailable("shutting down")));
    assert!(!controller.cancel());

    assert_eq!(signal.reason().map(|r| r.code()), Some(Code::Unavailable));
}

#[tokio::test]
async fn composed_signal_follows_parent() {
    let caller = AbortController::new();
    let composed = AbortSignal::any([caller.signal(), AbortSignal::never()], None);
    let signal = composed.signal();

    caller.cancel();
    let reason = tokio::time::timeout(Duration::from_secs(1), signal.aborted())
        .await
        .expect("signal should fire");
    assert_eq!(reason.code(), Code::Canceled);
}

#[tokio::test]
async fn composed_signal_fires_deadline_exceeded() {
    let composed = AbortSignal::any([AbortSignal::never()], Some(Duration::from_millis(20)));
    let reason = tokio::time::timeout(Duration::from_secs(1), composed.signal().aborted())
        .await
        .expect("deadline should fire");
    assert_eq!(reason.code(), Code::DeadlineExceeded);
}

#[tokio::test]
async fn already_aborted_parent_fires_immediately() {
    let caller = AbortController::new();
    caller.cancel();
    let composed = AbortSignal::any([caller.signal()], Some(Duration::from_secs(60)));
    assert_eq!(composed.signal().reason().map(|r| r.code()), Some(Code::Canceled));
}

#[tokio::test]
async fn completing_context_fires_its_signal_once() {
    let shutdown = AbortController::new();
    let context = CallContext::new(
        METHOD,
        "connect",
        Default::default(),
        Some(Duration::from_secs(30)),
        [shutdown.signal()],
    );
    let signal = context.signal();

    {
        let _guard = context.completion_guard();
    }
    assert!(signal.is_aborted());

    // A later shutdown does not overwrite the completion reason.
    shutdown.abort(Status::unavailable("server is shutting down"));
    tokio::task::yield_now().await;
    assert_eq!(signal.reason().map(|r| r.code()), Some(Code::Canceled));
    assert!(context.time_remaining().is_some());
}

#[tokio::test]
async fn until_aborted_ends_with_reason() {
    use futures::StreamExt;
    use futures::stream;

    let controller = AbortController::new();
    let items = stream::iter([Ok::<_, Status>(1u32), Ok(2)])
        .chain(stream::pending())
        .boxed();
    let mut guarded = controller.signal().until_aborted(items);

    assert_eq!(guarded.next().await.unwrap().unwrap(), 1);
    assert_eq!(guarded.next().await.unwrap().unwrap(), 2);

    controller.cancel();
    let err = guarded.next().await.unwrap().unwrap_err();
    assert_eq!(err.code(), Code::Canceled);
    assert!(guarded.next().await.is_none());
}

#[tokio::test]
async fn until_aborted_ignores_abort_after_end() {
    use futures::StreamExt;
    use futures::stream;

    let controller = AbortController::new();
    let items = stream::iter([Ok::<_, Status>("done")]).boxed();
    let mut guarded = controller.signal().until_aborted(items);

    assert_eq!(guarded.next().await.unwrap().unwrap(), "done");
    assert!(guarded.next().await.is_none());
    controller.cancel();
    assert!(guarded.next().await.is_none());
}
