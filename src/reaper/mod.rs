//! Background reclamation of expired sessions.
//!
//! One periodic task, started at process startup and stopped at shutdown.
//! Cycles never overlap, per-cycle failures are absorbed, and teardown is
//! bounded-time.

use crate::vault::SessionVault;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

const STOP_GRACE: Duration = Duration::from_secs(5);

/// Periodic task pruning expired sessions from the vault.
pub struct SessionReaper {
    vault: Arc<SessionVault>,
    cycle_interval: Duration,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionReaper {
    /// Create a reaper. Does not start the loop.
    pub fn new(vault: Arc<SessionVault>, cycle_interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            vault,
            cycle_interval,
            shutdown,
            handle: Mutex::new(None),
        }
    }

    /// Start the reap loop. Idempotent; at most one loop runs.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut handle = self.handle.lock().unwrap();
        if handle.is_some() {
            return;
        }

        let vault = Arc::clone(&self.vault);
        let cycle_interval = self.cycle_interval;
        let mut shutdown = self.shutdown.subscribe();

        *handle = Some(tokio::spawn(async move {
            let mut ticker = interval(cycle_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick fires immediately; the initial reap should
            // happen one full interval after startup
            ticker.tick().await;

            let mut consecutive_failures = 0u32;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match run_cycle(&vault) {
                            Ok(reaped) => {
                                consecutive_failures = 0;
                                if reaped > 0 {
                                    info!("reaped {} expired sessions", reaped);
                                } else {
                                    debug!("reap cycle found no expired sessions");
                                }
                            }
                            Err(message) => {
                                consecutive_failures += 1;
                                warn!("reap cycle failed: {}", message);
                                if consecutive_failures >= 3 {
                                    warn!(
                                        "{} consecutive reap cycles failed",
                                        consecutive_failures
                                    );
                                }
                            }
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        }));

        info!("session reaper started (interval: {:?})", self.cycle_interval);
    }

    /// Stop the loop. Idempotent; waits at most a few seconds.
    pub async fn stop(&self) {
        let handle = self.handle.lock().unwrap().take();
        let handle = match handle {
            Some(handle) => handle,
            None => return,
        };

        let _ = self.shutdown.send(true);
        let abort = handle.abort_handle();
        if timeout(STOP_GRACE, handle).await.is_err() {
            abort.abort();
            warn!("session reaper did not stop in time, aborted");
        } else {
            info!("session reaper stopped");
        }
    }

    /// True while the loop is running.
    pub fn is_running(&self) -> bool {
        self.handle.lock().unwrap().is_some()
    }
}

/// One reap pass, with panics (e.g. a poisoned vault lock) absorbed so the
/// loop survives.
fn run_cycle(vault: &SessionVault) -> std::result::Result<usize, String> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| vault.reap_expired()))
        .map_err(|_| "reap cycle panicked".to_string())
}
