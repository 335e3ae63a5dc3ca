//! Cancellable periodic task
//!
//! A `PollTask` owns one spawned Tokio loop. The first tick fires one full
//! period after spawning. Dropping or stopping the task aborts the loop.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Handle to a running periodic task
#[derive(Debug)]
pub struct PollTask {
    id: u64,
    handle: Option<JoinHandle<()>>,
}

impl PollTask {
    /// Spawn `tick` every `period` until it returns `ControlFlow::Break`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F, Fut>(id: u64, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if tick().await.is_break() {
                    break;
                }
            }
            debug!("Poll task {} finished", id);
        });

        debug!("Poll task {} started ({:?})", id, period);
        Self {
            id,
            handle: Some(handle),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Abort the loop
    pub fn stop(mut self) {
        self.abort();
    }

    /// Give up the handle without aborting, for a loop that is already exiting
    pub fn detach(mut self) {
        self.handle.take();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Poll task {} stopped", self.id);
        }
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.abort();
    }
}
