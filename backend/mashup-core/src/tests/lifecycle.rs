use crate::context::MashupContext;
use crate::lifecycle::{LifecycleController, PEER_SHUTDOWN_EXIT_CODE, SHUTDOWN_GRACE_PERIOD};
use crate::tests::support::RecordingHook;

use std::sync::Arc;
use std::time::{Duration, Instant};

fn controller(hook: Arc<RecordingHook>) -> LifecycleController {
    LifecycleController::new(hook, MashupContext::new(), false)
}

/// **VALUE**: Termination happens after the grace period, with the peer-shutdown status.
///
/// **WHY THIS MATTERS**: The acknowledgement must have time to leave the process, and the
/// exit status tells the host the mashup stopped because it was asked to.
///
/// **BUG THIS CATCHES**: Would catch an immediate exit (ack lost), a missing exit, or a
/// clean exit status.
#[tokio::test]
async fn given_shutdown_scheduled_when_grace_elapses_then_hook_fires_with_peer_status() {
    // GIVEN: A controller with a recording hook
    let hook = Arc::new(RecordingHook::default());
    let lifecycle = controller(hook.clone());
    let scheduled_at = Instant::now();

    // WHEN: Scheduling termination
    lifecycle.schedule_termination();

    // THEN: Nothing yet, then exactly one termination after the grace period
    assert!(hook.calls().is_empty(), "Must not terminate synchronously");
    tokio::time::sleep(SHUTDOWN_GRACE_PERIOD + Duration::from_millis(200)).await;

    let calls = hook.calls();
    assert_eq!(calls.len(), 1);
    let (code, at) = calls[0];
    assert_eq!(code, PEER_SHUTDOWN_EXIT_CODE);
    assert!(at.duration_since(scheduled_at) >= SHUTDOWN_GRACE_PERIOD);
}

/// **VALUE**: Repeated shutdown requests terminate once.
///
/// **BUG THIS CATCHES**: Would catch a host retrying Shutdown causing several exits (or,
/// with a test hook, several recorded terminations).
#[tokio::test]
async fn given_shutdown_requested_twice_when_grace_elapses_then_hook_fires_once() {
    // GIVEN: A controller
    let hook = Arc::new(RecordingHook::default());
    let lifecycle = controller(hook.clone());

    // WHEN: Scheduling twice
    lifecycle.schedule_termination();
    lifecycle.schedule_termination();
    tokio::time::sleep(SHUTDOWN_GRACE_PERIOD + Duration::from_millis(200)).await;

    // THEN: One termination
    assert_eq!(hook.calls().len(), 1);
}

/// **VALUE**: The "shutdown requested" notification reaches waiters before termination.
///
/// **WHY THIS MATTERS**: The host environment (e.g. a UI loop) gets a chance to react
/// during the grace period.
#[tokio::test]
async fn given_waiter_when_shutdown_scheduled_then_waiter_resolves() {
    // GIVEN: A waiter on the notification
    let hook = Arc::new(RecordingHook::default());
    let lifecycle = controller(hook.clone());
    assert!(!lifecycle.is_shutdown_requested());
    let waiter = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.shutdown_requested().await })
    };

    // WHEN: Scheduling termination
    lifecycle.schedule_termination();

    // THEN: The waiter resolves promptly
    tokio::time::timeout(Duration::from_millis(50), waiter)
        .await
        .expect("Waiter should resolve within the grace period")
        .expect("Waiter task panicked");
    assert!(lifecycle.is_shutdown_requested());
}
