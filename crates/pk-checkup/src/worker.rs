//! The background thread that drains the checkup queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use pk_core::ParkedVehicleId;

use crate::{CheckupError, CheckupResult, DeferredCheckupQueue};

/// Name of the worker thread.
pub const WORKER_THREAD_NAME: &str = "ParkedVehicleCheckups";

// ── Collaborators ─────────────────────────────────────────────────────────────

/// Refreshes one parked vehicle.
///
/// # Thread safety
///
/// Runs on the worker thread, hence `Send + 'static`.  Implementations must
/// not touch state the simulation tick owns without synchronisation; the
/// usual handler forwards the id to the tick instead.
pub trait CheckupHandler: Send + 'static {
    /// Errors are logged and dropped.  The id is not queued again.
    fn check(&mut self, id: ParkedVehicleId) -> CheckupResult<()>;
}

impl<F> CheckupHandler for F
where
    F: FnMut(ParkedVehicleId) -> CheckupResult<()> + Send + 'static,
{
    fn check(&mut self, id: ParkedVehicleId) -> CheckupResult<()> {
        self(id)
    }
}

/// How the worker waits when the queue is empty.
pub trait Sleeper: Send + 'static {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

// ── CheckupWorker ─────────────────────────────────────────────────────────────

/// Handle to the running worker thread.
///
/// The thread runs until [`shutdown`](Self::shutdown) or drop.  Both signal
/// it and join it; a thread in its idle sleep finishes that sleep first.
pub struct CheckupWorker {
    stop:      Arc<AtomicBool>,
    processed: Arc<AtomicU64>,
    handle:    Option<JoinHandle<()>>,
}

impl CheckupWorker {
    /// Start draining `queue` on a dedicated thread, sleeping `idle_backoff`
    /// whenever it is empty.
    pub fn spawn<H, S>(
        queue:        DeferredCheckupQueue,
        mut handler:  H,
        mut sleeper:  S,
        idle_backoff: Duration,
    ) -> CheckupResult<Self>
    where
        H: CheckupHandler,
        S: Sleeper,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let processed = Arc::new(AtomicU64::new(0));
        let (thread_stop, thread_processed) = (Arc::clone(&stop), Arc::clone(&processed));

        let handle = thread::Builder::new().name(WORKER_THREAD_NAME.to_owned()).spawn(move || {
            info!("parked vehicle checkup worker started");
            while !thread_stop.load(Ordering::Acquire) {
                let Some(id) = queue.pop() else {
                    sleeper.sleep(idle_backoff);
                    continue;
                };
                if let Err(e) = handler.check(id) {
                    debug!(%id, error = %e, "parked vehicle checkup failed");
                }
                thread_processed.fetch_add(1, Ordering::Relaxed);
            }
            info!("parked vehicle checkup worker stopped");
        })?;

        Ok(Self { stop, processed, handle: Some(handle) })
    }

    /// Checkups handed to the handler so far, failed ones included.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and wait for it.  Returns the number of processed
    /// checkups.
    pub fn shutdown(mut self) -> CheckupResult<u64> {
        self.stop_and_join()?;
        Ok(self.processed())
    }

    fn stop_and_join(&mut self) -> CheckupResult<()> {
        self.stop.store(true, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| CheckupError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for CheckupWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop_and_join() {
            debug!(error = %e, "checkup worker ended abnormally");
        }
    }
}
