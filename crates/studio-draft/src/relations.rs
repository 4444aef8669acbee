//! Relation Reconciler
//!
//! Links to other aggregates chosen before the entity exists are queued in
//! the draft and replayed, in recording order, right after the first create.
//! Each replayed link succeeds or fails on its own; a failed link never
//! undoes the create.

use crate::controller::{PanelController, Shared};
use crate::entity::EntityKind;
use crate::error::EngineError;
use crate::notify::{FailureKind, SaveStatus};
use crate::types::{EntityId, Identity, PersistOutcome, RelationLink};

impl<K: EntityKind> PanelController<K> {
    /// Link the entity to another aggregate
    ///
    /// Queued while unpersisted (`Deferred`), linked right away otherwise.
    ///
    /// # Errors
    /// `EngineError::Closed` / `EngineError::Retired` once the panel is gone
    pub async fn record_relation(&self, link: RelationLink) -> Result<PersistOutcome, EngineError> {
        let id = {
            let mut st = self.shared.state.lock();
            st.ensure_open()?;
            match st.draft.identity() {
                Identity::Unpersisted => {
                    tracing::debug!(
                        "[{}] queued {} {} until first create",
                        K::NAME,
                        link.domain_type,
                        link.related_id
                    );
                    st.draft.record_relation(link);
                    return Ok(PersistOutcome::Deferred);
                }
                Identity::Persisted(id) => id,
            }
        };

        let _lane = self.shared.lane.lock().await;
        Ok(if self.shared.link_one(id, &link).await {
            PersistOutcome::Updated(id)
        } else {
            PersistOutcome::Failed
        })
    }

    /// Remove the entity's link of `domain_type`
    ///
    /// While unpersisted this drops the queued links of that type instead.
    ///
    /// # Errors
    /// `EngineError::Closed` / `EngineError::Retired` once the panel is gone
    pub async fn remove_relation(&self, domain_type: &str) -> Result<PersistOutcome, EngineError> {
        let id = {
            let mut st = self.shared.state.lock();
            st.ensure_open()?;
            match st.draft.identity() {
                Identity::Unpersisted => {
                    let dropped = st.draft.discard_relations(domain_type);
                    return Ok(if dropped > 0 {
                        PersistOutcome::Deferred
                    } else {
                        PersistOutcome::Skipped
                    });
                }
                Identity::Persisted(id) => id,
            }
        };

        let _lane = self.shared.lane.lock().await;
        match self.shared.gateway.unlink_relation(id, domain_type).await {
            Ok(()) => {
                tracing::debug!("[{}] unlinked {} from {}", K::NAME, domain_type, id);
                Ok(PersistOutcome::Updated(id))
            }
            Err(e) => {
                tracing::warn!("[{}] unlink {} from {} failed: {}", K::NAME, domain_type, id, e);
                self.shared.notify(SaveStatus::error(
                    FailureKind::Relation,
                    format!("{domain_type}: {e}"),
                ));
                Ok(PersistOutcome::Failed)
            }
        }
    }
}

impl<K: EntityKind> Shared<K> {
    /// Replay queued links in order; returns how many failed
    ///
    /// Caller holds the lane.
    pub(crate) async fn replay_relations(&self, id: EntityId, links: Vec<RelationLink>) -> usize {
        let mut failed = 0;
        for link in &links {
            if !self.link_one(id, link).await {
                failed += 1;
            }
        }
        failed
    }

    /// Caller holds the lane
    pub(crate) async fn link_one(&self, id: EntityId, link: &RelationLink) -> bool {
        match self.gateway.link_relation(id, link).await {
            Ok(()) => {
                tracing::debug!(
                    "[{}] linked {} to {} {}",
                    K::NAME,
                    id,
                    link.domain_type,
                    link.related_id
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    "[{}] link {} to {} {} failed: {}",
                    K::NAME,
                    id,
                    link.domain_type,
                    link.related_id,
                    e
                );
                self.notify(SaveStatus::error(
                    FailureKind::Relation,
                    format!("{} {}: {e}", link.domain_type, link.related_id),
                ));
                false
            }
        }
    }
}
