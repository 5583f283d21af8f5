//! Signal-driven shutdown coordination.
//!
//! A [`ShutdownLatch`] is a sticky flag raised by SIGINT or SIGTERM (or
//! programmatically). Waiters block until it is raised; once raised it stays
//! raised for the lifetime of the process, so later waits return
//! immediately. The module-level [`wait_for_shutdown`] drives one
//! process-wide latch.

use crate::{PubSubError, Result};
use futures::stream::StreamExt;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{info, warn};

/// Sticky latch raised by OS termination signals.
pub struct ShutdownLatch {
    raised: watch::Sender<bool>,
}

impl ShutdownLatch {
    /// Create an unraised latch
    pub fn new() -> Self {
        let (raised, _) = watch::channel(false);
        Self { raised }
    }

    /// Raise the latch, waking every waiter
    pub fn raise(&self) {
        self.raised.send_replace(true);
    }

    /// Check whether the latch has been raised
    pub fn is_raised(&self) -> bool {
        *self.raised.borrow()
    }

    /// Wait until the latch is raised.
    ///
    /// Returns immediately if it already is.
    pub async fn wait(&self) {
        let mut watcher = self.raised.subscribe();
        // The sender lives in self, so the channel cannot close under us.
        let _ = watcher.wait_for(|raised| *raised).await;
    }

    /// Spawn a task raising this latch on SIGINT or SIGTERM.
    ///
    /// The signal handler installed by `signal-hook` only records the signal;
    /// all real work happens on the spawned task.
    pub fn listen_for_signals(&self) -> Result<()> {
        let mut signals =
            Signals::new([SIGINT, SIGTERM]).map_err(|e| PubSubError::signal(e.to_string()))?;
        let raised = self.raised.clone();

        tokio::spawn(async move {
            while let Some(signal) = signals.next().await {
                match signal {
                    SIGINT | SIGTERM => {
                        info!("Received signal {signal}, raising the shutdown latch");
                        raised.send_replace(true);
                    }
                    _ => {
                        warn!("Received unexpected signal: {signal}");
                    }
                }
            }
        });

        Ok(())
    }
}

impl Default for ShutdownLatch {
    fn default() -> Self {
        Self::new()
    }
}

static PROCESS_LATCH: OnceLock<ShutdownLatch> = OnceLock::new();
static SIGNALS_INSTALLED: AtomicBool = AtomicBool::new(false);

fn process_latch() -> &'static ShutdownLatch {
    PROCESS_LATCH.get_or_init(ShutdownLatch::new)
}

/// Block until the process receives SIGINT or SIGTERM.
///
/// Installs the signal handlers on first use. The underlying latch is
/// sticky: after the first signal every later call returns immediately.
pub async fn wait_for_shutdown() -> Result<()> {
    let latch = process_latch();

    if SIGNALS_INSTALLED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        latch.listen_for_signals()?;
    }

    latch.wait().await;
    Ok(())
}
