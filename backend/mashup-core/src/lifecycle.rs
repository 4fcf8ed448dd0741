//! Process termination on peer request or signal.
//!
//! Termination goes through a [`ShutdownHook`] so the protocol logic never
//! calls `process::exit` itself; production uses [`ProcessExitHook`], tests
//! install a recording hook.

use crate::context::MashupContext;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::time::Instant;

/// Delay between acknowledging a shutdown and terminating, so the ack can
/// reach the peer.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Exit status for "shut down by peer". Reported as 255 by the OS.
pub const PEER_SHUTDOWN_EXIT_CODE: i32 = -1;

/// Bound on notifying the peer when a local signal arrives.
pub const PEER_NOTIFY_TIMEOUT: Duration = Duration::from_secs(2);

/// Performs the actual termination.
pub trait ShutdownHook: Send + Sync {
    fn terminate(&self, exit_code: i32);
}

/// Exits the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExitHook;

impl ShutdownHook for ProcessExitHook {
    fn terminate(&self, exit_code: i32) {
        info!("Mashup shutting down with status {exit_code}");
        log::logger().flush();
        std::process::exit(exit_code);
    }
}

#[derive(Clone)]
pub struct LifecycleController {
    hook: Arc<dyn ShutdownHook>,
    context: MashupContext,
    requested: Arc<watch::Sender<bool>>,
    terminating: Arc<AtomicBool>,
    signals_armed: Arc<AtomicBool>,
    signal_handling: bool,
}

impl LifecycleController {
    pub fn new(hook: Arc<dyn ShutdownHook>, context: MashupContext, signal_handling: bool) -> Self {
        let (requested, _) = watch::channel(false);
        Self {
            hook,
            context,
            requested: Arc::new(requested),
            terminating: Arc::new(AtomicBool::new(false)),
            signals_armed: Arc::new(AtomicBool::new(false)),
            signal_handling,
        }
    }

    /// Terminate after [`SHUTDOWN_GRACE_PERIOD`].
    ///
    /// Returns immediately. The timer cannot be cancelled, and only the first
    /// request schedules anything; later ones are acknowledged and ignored.
    /// The reverse channel is closed within the grace period.
    pub fn schedule_termination(&self) {
        self.requested.send_replace(true);

        if self.terminating.swap(true, Ordering::SeqCst) {
            debug!("Termination already scheduled");
            return;
        }

        let hook = Arc::clone(&self.hook);
        let context = self.context.clone();
        let deadline = Instant::now() + SHUTDOWN_GRACE_PERIOD;

        info!("Shutdown initiated; terminating in {SHUTDOWN_GRACE_PERIOD:?}");
        tokio::spawn(async move {
            if tokio::time::timeout_at(deadline, context.close()).await.is_err() {
                warn!("Peer link did not close within the grace period");
            }
            tokio::time::sleep_until(deadline).await;

            info!("Client shutting down");
            hook.terminate(PEER_SHUTDOWN_EXIT_CODE);
        });
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.requested.borrow()
    }

    /// Resolves once a shutdown has been requested by the peer or a signal.
    pub async fn shutdown_requested(&self) {
        let mut rx = self.requested.subscribe();
        // The sender lives as long as `self`.
        let _ = rx.wait_for(|requested| *requested).await;
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.requested.subscribe()
    }

    /// Start listening for Ctrl-C / SIGTERM. Only the first call arms.
    ///
    /// On signal: tell the peer we are going away, close the reverse channel
    /// and terminate through the hook.
    pub fn arm_signal_processor(&self) {
        if !self.signal_handling {
            debug!("Signal handling disabled");
            return;
        }

        if self.signals_armed.swap(true, Ordering::SeqCst) {
            return;
        }

        let controller = self.clone();
        tokio::spawn(async move {
            wait_for_termination_signal().await;
            info!("Termination signal received");
            controller.requested.send_replace(true);

            if let Err(e) = controller
                .context
                .notify_peer_shutdown(PEER_NOTIFY_TIMEOUT)
                .await
            {
                warn!("Could not notify peer of shutdown: {e}");
            }

            controller.context.close().await;
            controller.hook.terminate(PEER_SHUTDOWN_EXIT_CODE);
        });

        info!("Signal handler initialized");
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Ctrl-C handler unavailable: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_termination_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!("SIGTERM handler unavailable: {e}");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination_signal() {
    ctrl_c().await;
}
