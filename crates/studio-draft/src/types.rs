//! Core types for the draft engine
//!
//! Defines the identity and state vocabulary shared by every panel:
//! - Entity ids and order-insensitive id lists
//! - Draft identity (unpersisted vs persisted)
//! - Save state machine tags
//! - Relation links and persistence outcomes

use serde::{Deserialize, Serialize};

/// Server-assigned entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Raw numeric value
    #[inline]
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for EntityId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// List of entity ids whose order carries no meaning (assignees, members)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdList(Vec<EntityId>);

impl IdList {
    /// Create empty list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.0.contains(&id)
    }

    /// Ids in insertion order
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[EntityId] {
        &self.0
    }

    /// Ids in ascending order
    #[must_use]
    pub fn sorted(&self) -> Vec<EntityId> {
        let mut ids = self.0.clone();
        ids.sort_unstable();
        ids
    }

    /// Number of ids
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if list is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<EntityId> for IdList {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<i64>> for IdList {
    fn from(raw: Vec<i64>) -> Self {
        raw.into_iter().map(EntityId).collect()
    }
}

/// Whether the draft's entity exists on the server yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    /// Create mode, nothing persisted yet
    Unpersisted,
    /// Entity exists with this id
    Persisted(EntityId),
}

impl Identity {
    /// Persisted id, if any
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        match self {
            Self::Unpersisted => None,
            Self::Persisted(id) => Some(*id),
        }
    }

    /// Check if the entity exists on the server
    #[inline]
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted(_))
    }
}

/// Save state machine tag
///
/// `Idle → Dirty → (Creating | Saving) → Idle`. At most one `Creating` or
/// `Saving` operation is in flight per draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SaveState {
    /// Nothing pending
    #[default]
    Idle,
    /// Debounce timer armed
    Dirty,
    /// First `create` call in flight
    Creating,
    /// `update` call in flight
    Saving,
}

impl SaveState {
    /// Check if a gateway call is in flight
    #[inline]
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Creating | Self::Saving)
    }
}

impl std::fmt::Display for SaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Dirty => "dirty",
            Self::Creating => "creating",
            Self::Saving => "saving",
        };
        f.write_str(label)
    }
}

/// Association to another aggregate, persisted through `link_relation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationLink {
    /// Related aggregate type (`"campaign"`, `"project"`)
    pub domain_type: String,
    /// Related aggregate id
    pub related_id: EntityId,
    /// Optional link payload (role, position, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl RelationLink {
    /// Create link without extra payload
    #[inline]
    pub fn new(domain_type: impl Into<String>, related_id: impl Into<EntityId>) -> Self {
        Self {
            domain_type: domain_type.into(),
            related_id: related_id.into(),
            extra: None,
        }
    }

    /// With extra payload
    #[inline]
    #[must_use]
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Result of one persistence attempt driven by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Nothing to persist (clean draft, empty title, retired)
    Skipped,
    /// Held in the draft until the entity exists
    Deferred,
    /// First create succeeded
    Created(EntityId),
    /// Update (or relation call) succeeded
    Updated(EntityId),
    /// Gateway call failed; already reported through the notifier
    Failed,
}

impl PersistOutcome {
    /// Check if the attempt failed
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Summary of one flush run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Child editors that had pending work and were flushed
    pub children_flushed: usize,
    /// Child flushes that failed or timed out
    pub child_failures: usize,
    /// Outcome of the panel's own save
    pub outcome: PersistOutcome,
}

impl FlushReport {
    /// Report for a flush that had nothing to do
    #[inline]
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            children_flushed: 0,
            child_failures: 0,
            outcome: PersistOutcome::Skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_keeps_wire_order() {
        let ids = IdList::from(vec![3, 1]);
        assert_eq!(ids.as_slice(), &[EntityId(3), EntityId(1)]);
        assert_eq!(ids.sorted(), vec![EntityId(1), EntityId(3)]);
        assert!(ids.contains(EntityId(3)));
        assert!(!ids.contains(EntityId(2)));
    }

    #[test]
    fn identity_exposes_id() {
        assert_eq!(Identity::Unpersisted.id(), None);
        assert_eq!(Identity::Persisted(EntityId(42)).id(), Some(EntityId(42)));
        assert!(Identity::Persisted(EntityId(42)).is_persisted());
    }

    #[test]
    fn relation_link_serializes_without_empty_extra() {
        let link = RelationLink::new("campaign", 7);
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json, serde_json::json!({"domain_type": "campaign", "related_id": 7}));
    }
}
