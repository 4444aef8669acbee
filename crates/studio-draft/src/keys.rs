//! Keyboard surface and delete flow
//!
//! - `Escape` closes the panel through the flush path, unless the delete
//!   confirmation is showing
//! - the delete shortcut only opens the confirmation
//! - the save shortcut flushes and keeps the panel open
//!
//! Delete bypasses the scheduler. Once it succeeds the draft is retired and
//! no further transitions are evaluated.

use crate::controller::{PanelController, PanelState, Shared};
use crate::entity::EntityKind;
use crate::error::EngineError;
use crate::notify::{FailureKind, SaveStatus};
use crate::types::{FlushReport, Identity, SaveState};
use serde::{Deserialize, Serialize};

/// Key command forwarded by the host panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCommand {
    /// Escape
    Escape,
    /// Platform modifier + Backspace
    DeleteShortcut,
    /// Platform modifier + S
    SaveShortcut,
}

/// What a key command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Panel flushed and closed
    Closed(FlushReport),
    /// Panel flushed, still open
    Flushed(FlushReport),
    /// Delete confirmation is now showing
    DeleteConfirmationOpened,
    /// Nothing happened
    Ignored,
}

impl<K: EntityKind> PanelController<K> {
    /// Dispatch a key command
    pub async fn handle_key(&self, key: KeyCommand) -> KeyOutcome {
        match key {
            KeyCommand::Escape => {
                let suppressed = {
                    let st = self.shared.state.lock();
                    st.closed || st.confirming_delete
                };
                if suppressed {
                    tracing::trace!("[{}] escape ignored", K::NAME);
                    return KeyOutcome::Ignored;
                }
                KeyOutcome::Closed(self.close().await)
            }
            KeyCommand::DeleteShortcut => {
                if self.request_delete() {
                    KeyOutcome::DeleteConfirmationOpened
                } else {
                    KeyOutcome::Ignored
                }
            }
            KeyCommand::SaveShortcut => match self.flush().await {
                Ok(report) => KeyOutcome::Flushed(report),
                Err(_) => KeyOutcome::Ignored,
            },
        }
    }

    /// Open the delete confirmation; the draft is not touched
    ///
    /// Returns `false` if the panel is closed, retired, or already confirming.
    pub fn request_delete(&self) -> bool {
        let mut st = self.shared.state.lock();
        if st.ensure_open().is_err() || st.confirming_delete {
            return false;
        }
        st.confirming_delete = true;
        true
    }

    /// Dismiss the delete confirmation
    pub fn cancel_delete(&self) {
        self.shared.state.lock().confirming_delete = false;
    }

    /// Delete the entity after the user confirmed
    ///
    /// An unpersisted draft has nothing on the server; it is simply retired.
    ///
    /// # Errors
    /// - `EngineError::NoPendingConfirmation` without an open confirmation
    /// - `EngineError::Persistence` if the gateway refused; the confirmation
    ///   stays open so the user can retry
    pub async fn confirm_delete(&self) -> Result<(), EngineError> {
        {
            let mut st = self.shared.state.lock();
            st.ensure_open()?;
            if !st.confirming_delete {
                return Err(EngineError::NoPendingConfirmation);
            }
            st.timer.cancel();
        }

        let _lane = self.shared.lane.lock().await;
        let identity = self.shared.state.lock().draft.identity();
        let id = match identity {
            Identity::Unpersisted => {
                self.shared.retire(&mut self.shared.state.lock());
                tracing::debug!("[{}] discarded unsaved draft", K::NAME);
                self.shared.notify(SaveStatus::Deleted);
                return Ok(());
            }
            Identity::Persisted(id) => id,
        };

        match self.shared.gateway.delete(id).await {
            Ok(()) => {
                self.shared.retire(&mut self.shared.state.lock());
                tracing::info!("[{}] deleted {}", K::NAME, id);
                self.shared.notify(SaveStatus::Deleted);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[{}] delete of {} failed: {}", K::NAME, id, e);
                self.shared
                    .notify(SaveStatus::error(FailureKind::Delete, &e));
                {
                    // Edits made while the dialog was open still need a save.
                    let mut st = self.shared.state.lock();
                    self.shared.evaluate(&mut st);
                }
                Err(e.into())
            }
        }
    }
}

impl<K: EntityKind> Shared<K> {
    fn retire(&self, st: &mut PanelState<K>) {
        st.retired = true;
        st.confirming_delete = false;
        st.timer.cancel();
        self.set_state(st, SaveState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PanelBuilder;
    use crate::error::PersistenceError;
    use crate::fixtures::{note, NoteChange, NoteKind};
    use crate::memory::InMemoryGateway;
    use crate::notify::MockNotifier;
    use crate::types::{EntityId, PersistOutcome};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn escape_flushes_pending_edit() {
        let gateway = Arc::new(InMemoryGateway::<NoteKind>::new());
        let entity = gateway.seed(note(8, "Escape"));
        let panel = PanelBuilder::new(gateway.clone()).open_edit(&entity);

        panel.set_field(NoteChange::Body("last words".into())).unwrap();
        let outcome = panel.handle_key(KeyCommand::Escape).await;

        assert!(matches!(
            outcome,
            KeyOutcome::Closed(FlushReport { outcome: PersistOutcome::Updated(_), .. })
        ));
        assert_eq!(gateway.get(EntityId(8)).unwrap().fields.body, "last words");
    }

    #[tokio::test]
    async fn escape_is_ignored_while_confirming_delete() {
        let gateway = Arc::new(InMemoryGateway::<NoteKind>::new());
        let entity = gateway.seed(note(2, "Keep"));
        let panel = PanelBuilder::new(gateway).open_edit(&entity);

        assert_eq!(
            panel.handle_key(KeyCommand::DeleteShortcut).await,
            KeyOutcome::DeleteConfirmationOpened
        );
        assert_eq!(panel.handle_key(KeyCommand::Escape).await, KeyOutcome::Ignored);
        assert!(!panel.is_closed());

        panel.cancel_delete();
        assert!(matches!(
            panel.handle_key(KeyCommand::Escape).await,
            KeyOutcome::Closed(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_delete_retires_draft() {
        let gateway = Arc::new(InMemoryGateway::<NoteKind>::new());
        let entity = gateway.seed(note(6, "Doomed"));
        let panel = PanelBuilder::new(gateway.clone()).open_edit(&entity);

        panel.set_field(NoteChange::Body("never sent".into())).unwrap();
        assert!(panel.request_delete());
        panel.confirm_delete().await.unwrap();

        assert!(panel.is_retired());
        assert!(gateway.get(EntityId(6)).is_none());
        assert!(matches!(
            panel.set_field(NoteChange::Body("more".into())),
            Err(EngineError::Retired)
        ));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(gateway.update_count(), 0);
        assert_eq!(panel.close().await, FlushReport::skipped());
    }

    #[tokio::test]
    async fn confirm_without_request_is_rejected() {
        let gateway = Arc::new(InMemoryGateway::<NoteKind>::new());
        let panel = PanelBuilder::new(gateway).open_create();
        assert!(matches!(
            panel.confirm_delete().await,
            Err(EngineError::NoPendingConfirmation)
        ));
    }

    #[tokio::test]
    async fn failed_delete_keeps_confirmation_open() {
        let gateway = Arc::new(InMemoryGateway::<NoteKind>::new());
        let panel = PanelBuilder::new(gateway.clone())
            .notifier({
                let mut notifier = MockNotifier::new();
                notifier
                    .expect_notify()
                    .withf(|_, status| {
                        matches!(status, SaveStatus::Error { kind: FailureKind::Delete, .. })
                    })
                    .times(1)
                    .return_const(());
                Arc::new(notifier)
            })
            .open_edit(&note(99, "Not on server"));

        assert!(panel.request_delete());
        let err = panel.confirm_delete().await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::Persistence(PersistenceError::NotFound(_))
        ));
        assert!(panel.is_confirming_delete());
        assert!(!panel.is_retired());
    }
}
