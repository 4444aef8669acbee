//! Debounce timer owned by the Save Scheduler
//!
//! Trailing-edge: every `arm` cancels the previous countdown and starts a
//! new one. Each countdown carries a generation number; when it expires it
//! must `claim` that generation before doing any work, so a countdown that
//! was superseded or cancelled can never fire a save.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Single owned countdown
#[derive(Debug)]
pub(crate) struct DebounceTimer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl DebounceTimer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    /// Cancel any countdown and start a new one
    ///
    /// `on_fire` receives the generation to claim. Must be called from
    /// within a tokio runtime.
    pub(crate) fn arm<F, Fut>(&mut self, on_fire: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let delay = self.delay;
        let fire = on_fire(generation);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire.await;
        }));
        tracing::trace!("debounce armed (generation {}, {:?})", generation, delay);
    }

    /// Stop the pending countdown; returns whether one was pending
    pub(crate) fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                tracing::trace!("debounce cancelled");
                true
            }
            None => false,
        }
    }

    /// Called by an expired countdown; `true` if it is still the current one
    ///
    /// A claimed countdown is detached: later `cancel` calls no longer
    /// abort it, so the save it starts always runs to completion.
    pub(crate) fn claim(&mut self, generation: u64) -> bool {
        if self.generation != generation || self.pending.is_none() {
            return false;
        }
        self.pending = None;
        self.generation = self.generation.wrapping_add(1);
        true
    }

    /// Check if a countdown is pending
    pub(crate) fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
