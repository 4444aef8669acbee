//! Immediate-Update Channel
//!
//! Selector widgets (priority, assignees, due date, status) persist on
//! selection instead of waiting for the debounce window, but only once the
//! entity exists. Before that the value simply rides along in the draft and
//! reaches the server with the eventual create.
//!
//! The immediate update goes through the same persistence lane as debounced
//! saves and reads the draft value when it is sent, so when both paths touch
//! the same field the latest local value is always the one written last.

use crate::controller::PanelController;
use crate::entity::{ChangeOf, EntityKind, FieldChange, FieldOf, FieldSet};
use crate::error::EngineError;
use crate::types::{EntityId, Identity, PersistOutcome, SaveState};
use std::future::Future;

enum Staged<K: EntityKind> {
    Done(PersistOutcome),
    Send(EntityId, FieldOf<K>),
}

impl<K: EntityKind> PanelController<K> {
    /// Apply a discrete-choice edit and persist it right away if possible
    ///
    /// The draft is updated before this returns; the returned future
    /// performs the update call, if any.
    ///
    /// # Errors
    /// `EngineError::Closed` / `EngineError::Retired` once the panel is gone
    pub fn apply_immediate(
        &self,
        change: ChangeOf<K>,
    ) -> impl Future<Output = Result<PersistOutcome, EngineError>> + Send + '_ {
        let staged = self.stage_immediate(change);
        async move {
            let (id, field) = match staged? {
                Staged::Done(outcome) => return Ok(outcome),
                Staged::Send(id, field) => (id, field),
            };

            let _lane = self.shared.lane.lock().await;
            let patch = {
                let mut st = self.shared.state.lock();
                if st.retired {
                    return Ok(PersistOutcome::Skipped);
                }
                self.shared.set_state(&mut st, SaveState::Saving);
                vec![st.draft.fields().current(field)]
            };
            tracing::debug!("[{}] immediate update of {} on {}", K::NAME, field, id);
            Ok(self.shared.run_update(id, patch).await)
        }
    }

    fn stage_immediate(&self, change: ChangeOf<K>) -> Result<Staged<K>, EngineError> {
        let field = change.field();
        let mut st = self.shared.state.lock();
        st.ensure_open()?;
        st.draft.set_field(change);
        Ok(match st.draft.identity() {
            Identity::Unpersisted => {
                self.shared.evaluate(&mut st);
                Staged::Done(PersistOutcome::Deferred)
            }
            Identity::Persisted(_) if !st.draft.has_title() => Staged::Done(PersistOutcome::Skipped),
            Identity::Persisted(id) => Staged::Send(id, field),
        })
    }
}
