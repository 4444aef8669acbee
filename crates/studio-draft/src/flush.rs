//! Flush Controller
//!
//! Runs on close, on Escape, and on the save shortcut. Order:
//! 1. blur the focused input, committing its uncommitted text
//! 2. flush every child editor that reports pending work
//! 3. cancel the debounce timer
//! 4. create (unsaved entity with a title) or update (dirty), awaited
//!
//! A countdown expiring during step 2 stands down; the save it would have
//! sent is made in step 4. Only then does `close` report the panel closed.

use crate::controller::{PanelController, Shared};
use crate::entity::{ChangeOf, EntityKind};
use crate::error::{EngineError, PersistenceError};
use crate::notify::{FailureKind, SaveStatus};
use crate::types::{FlushReport, PersistOutcome};
use async_trait::async_trait;
use std::sync::Arc;

/// Child editor with its own persistence (custom fields, attachments)
#[async_trait]
pub trait Flushable: Send + Sync {
    /// Name used in logs
    fn label(&self) -> &str {
        "child editor"
    }

    /// Check if the child holds work not yet persisted
    fn has_pending_changes(&self) -> bool;

    /// Persist the child's pending work
    async fn flush_pending_changes(&self) -> Result<(), PersistenceError>;
}

/// Host hook for the currently focused input
pub trait InputFocus<K: EntityKind>: Send + Sync {
    /// Blur the focused control, returning its uncommitted edit if any
    fn blur(&self) -> Option<ChangeOf<K>>;
}

impl<K: EntityKind> PanelController<K> {
    /// Register a child editor consulted on every flush
    pub fn register_child(&self, child: Arc<dyn Flushable>) {
        self.shared.state.lock().children.push(child);
    }

    /// Register the host's focus hook
    pub fn set_input_focus(&self, focus: Arc<dyn InputFocus<K>>) {
        self.shared.state.lock().focus = Some(focus);
    }

    /// Flush pending work and keep the panel open (save shortcut)
    ///
    /// # Errors
    /// `EngineError::Closed` / `EngineError::Retired` once the panel is gone
    pub async fn flush(&self) -> Result<FlushReport, EngineError> {
        self.shared.state.lock().ensure_open()?;
        Ok(self.run_flush().await)
    }

    /// Flush pending work, then mark the panel closed
    ///
    /// Resolves only after every flush step finished, successfully or not.
    /// Closing twice is a no-op; closing a deleted panel skips the flush.
    pub async fn close(&self) -> FlushReport {
        let skip = {
            let st = self.shared.state.lock();
            if st.closed {
                return FlushReport::skipped();
            }
            st.retired
        };

        let report = if skip {
            FlushReport::skipped()
        } else {
            self.run_flush().await
        };

        let mut st = self.shared.state.lock();
        st.timer.cancel();
        st.confirming_delete = false;
        st.closed = true;
        tracing::debug!("[{}] panel closed ({:?})", K::NAME, report.outcome);
        report
    }

    async fn run_flush(&self) -> FlushReport {
        let focus = self.shared.state.lock().focus.clone();
        if let Some(change) = focus.and_then(|focus| focus.blur()) {
            tracing::trace!("[{}] committing blurred input {:?}", K::NAME, change);
            self.shared.state.lock().draft.set_field(change);
        }

        let flushing = FlushingGuard::enter(&self.shared);

        let children = self.shared.state.lock().children.clone();
        let mut children_flushed = 0;
        let mut child_failures = 0;
        for child in children {
            if !child.has_pending_changes() {
                continue;
            }
            children_flushed += 1;
            if let Err(e) = self.flush_child(child.as_ref()).await {
                child_failures += 1;
                tracing::warn!("[{}] {} flush failed: {}", K::NAME, child.label(), e);
                self.shared
                    .notify(SaveStatus::error(FailureKind::ChildFlush, &e));
            }
        }

        let _lane = self.shared.lane.lock().await;
        drop(flushing);
        let earlier = {
            let mut st = self.shared.state.lock();
            if st.timer.cancel() {
                tracing::debug!("[{}] pending save preempted by flush", K::NAME);
            }
            st.flushed_save.take()
        };

        let outcome = match self.shared.persist_pending().await {
            PersistOutcome::Skipped => earlier.unwrap_or(PersistOutcome::Skipped),
            outcome => outcome,
        };
        FlushReport {
            children_flushed,
            child_failures,
            outcome,
        }
    }

    async fn flush_child(&self, child: &dyn Flushable) -> Result<(), PersistenceError> {
        match self.shared.config.child_flush_timeout() {
            Some(limit) => tokio::time::timeout(limit, child.flush_pending_changes())
                .await
                .unwrap_or_else(|_| {
                    Err(PersistenceError::Timeout {
                        after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })
                }),
            None => child.flush_pending_changes().await,
        }
    }
}

/// Marks the child phase of a flush; cleared on drop, even if the flush
/// future is abandoned
struct FlushingGuard<'a, K: EntityKind> {
    shared: &'a Shared<K>,
}

impl<'a, K: EntityKind> FlushingGuard<'a, K> {
    fn enter(shared: &'a Shared<K>) -> Self {
        let mut st = shared.state.lock();
        st.flushing = true;
        st.flushed_save = None;
        Self { shared }
    }
}

impl<K: EntityKind> Drop for FlushingGuard<'_, K> {
    fn drop(&mut self) {
        self.shared.state.lock().flushing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PanelBuilder;
    use crate::fixtures::{note, NoteChange, NoteKind};
    use crate::memory::InMemoryGateway;
    use crate::types::{EntityId, PersistOutcome, SaveState};
    use parking_lot::Mutex;
    use std::time::Duration;

    struct TypedTitle(Mutex<Option<String>>);

    impl InputFocus<NoteKind> for TypedTitle {
        fn blur(&self) -> Option<NoteChange> {
            self.0.lock().take().map(NoteChange::Title)
        }
    }

    struct SlowChild;

    #[async_trait]
    impl Flushable for SlowChild {
        fn has_pending_changes(&self) -> bool {
            true
        }

        async fn flush_pending_changes(&self) -> Result<(), PersistenceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn close_commits_blurred_input() {
        let gateway = Arc::new(InMemoryGateway::<NoteKind>::new());
        let panel = PanelBuilder::new(gateway.clone()).open_create();
        panel.set_input_focus(Arc::new(TypedTitle(Mutex::new(Some("Typed".into())))));

        let report = panel.close().await;
        assert_eq!(report.outcome, PersistOutcome::Created(EntityId(1)));
        assert_eq!(gateway.get(EntityId(1)).unwrap().fields.title, "Typed");
        assert!(panel.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn save_shortcut_keeps_panel_open() {
        let gateway = Arc::new(InMemoryGateway::<NoteKind>::new());
        let entity = gateway.seed(note(3, "Open"));
        let panel = PanelBuilder::new(gateway.clone()).open_edit(&entity);

        panel.set_field(NoteChange::Body("flushed".into())).unwrap();
        let report = panel.flush().await.unwrap();

        assert_eq!(report.outcome, PersistOutcome::Updated(EntityId(3)));
        assert_eq!(panel.save_state(), SaveState::Idle);
        assert!(!panel.is_closed());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(gateway.update_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_child_times_out_and_close_continues() {
        let gateway = Arc::new(InMemoryGateway::<NoteKind>::new());
        let panel = PanelBuilder::new(gateway.clone())
            .config(
                crate::EngineConfig::new().with_child_flush_timeout(Duration::from_millis(500)),
            )
            .open_create();
        panel.register_child(Arc::new(SlowChild));
        panel.set_field(NoteChange::Title("Keep going".into())).unwrap();

        let report = panel.close().await;
        assert_eq!(report.children_flushed, 1);
        assert_eq!(report.child_failures, 1);
        assert_eq!(report.outcome, PersistOutcome::Created(EntityId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_close_leaves_autosave_running() {
        let gateway = Arc::new(InMemoryGateway::<NoteKind>::new());
        let panel = PanelBuilder::new(gateway.clone()).open_create();
        panel.register_child(Arc::new(SlowChild));

        let cut_short = tokio::time::timeout(Duration::from_millis(100), panel.close()).await;
        assert!(cut_short.is_err());
        assert!(!panel.is_closed());

        panel.set_field(NoteChange::Title("Still saving".into())).unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(gateway.get(EntityId(1)).unwrap().fields.title, "Still saving");
    }

    #[tokio::test]
    async fn closing_twice_is_noop() {
        let gateway = Arc::new(InMemoryGateway::<NoteKind>::new());
        let panel = PanelBuilder::new(gateway).open_create();
        panel.close().await;
        assert_eq!(panel.close().await, FlushReport::skipped());
        assert!(matches!(panel.flush().await, Err(EngineError::Closed)));
    }
}
