//! Task supervision for the long-running loops.
//!
//! A panicking loop is restarted with exponential backoff; a loop that returns
//! normally (it saw shutdown) is not.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Delay before the first restart.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Ceiling for the restart delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// A task that ran this long before panicking restarts at [`INITIAL_BACKOFF`].
pub const STABLE_RUN: Duration = Duration::from_secs(60);

/// Double `current`, capped at [`MAX_BACKOFF`].
pub fn next_backoff(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_BACKOFF)
}

/// Spawn `factory()` and keep it running until it returns or shutdown fires.
///
/// Each restart calls `factory` again, so the task must rebuild its own
/// per-run state (intervals, receivers) from shared handles.
pub fn spawn_supervised<F, Fut>(
    name: &'static str,
    mut shutdown_rx: watch::Receiver<bool>,
    factory: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            let started = Instant::now();
            match tokio::spawn(factory()).await {
                Ok(()) => break,
                Err(e) if e.is_panic() => {
                    if started.elapsed() >= STABLE_RUN {
                        backoff = INITIAL_BACKOFF;
                    }
                    error!(
                        task = name,
                        backoff_secs = backoff.as_secs(),
                        "task panicked, restarting"
                    );
                }
                Err(e) => {
                    error!(task = name, error = %e, "task cancelled");
                    break;
                }
            }

            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                () = tokio::time::sleep(backoff) => {}
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
            backoff = next_backoff(backoff);
        }
        info!(task = name, "supervisor exited");
    })
}
