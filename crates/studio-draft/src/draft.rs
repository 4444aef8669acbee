//! Draft Store
//!
//! The local, possibly unpersisted copy of one entity. Holds the editable
//! fields, the snapshot last known to match the server, the identity, and
//! relation links chosen before the entity existed.
//!
//! Invariants:
//! - `initialize` replaces every part at once
//! - user edits touch `fields` only, never `synced`
//! - `synced` is only ever replaced by a server representation

use crate::entity::{ChangeOf, EntityKind, FieldOf, FieldSet, PersistedEntity};
use crate::types::{EntityId, Identity, RelationLink};

/// What the scheduler should send for the draft's current state
#[derive(Debug, Clone, PartialEq)]
pub enum SavePlan<K: EntityKind> {
    /// Nothing to send
    Nothing,
    /// Send the full field set to `create`
    Create(K::Fields),
    /// Send the dirty fields to `update`
    Update(EntityId, Vec<ChangeOf<K>>),
}

/// Working copy of one entity instance
#[derive(Debug, Clone)]
pub struct Draft<K: EntityKind> {
    identity: Identity,
    fields: K::Fields,
    synced: K::Fields,
    relation_drafts: Vec<RelationLink>,
}

impl<K: EntityKind> Draft<K> {
    /// Empty draft for create mode
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::from_entity(None)
    }

    /// Draft for create mode (`None`) or edit mode (`Some(entity)`)
    #[must_use]
    pub fn from_entity(entity: Option<&K::Entity>) -> Self {
        match entity {
            Some(entity) => {
                let fields = entity.fields();
                Self {
                    identity: Identity::Persisted(entity.id()),
                    synced: fields.clone(),
                    fields,
                    relation_drafts: Vec::new(),
                }
            }
            None => Self {
                identity: Identity::Unpersisted,
                fields: K::Fields::default(),
                synced: K::Fields::default(),
                relation_drafts: Vec::new(),
            },
        }
    }

    /// Reset fields, snapshot, identity and pending relations together
    pub fn initialize(&mut self, entity: Option<&K::Entity>) {
        *self = Self::from_entity(entity);
    }

    /// Apply a user edit
    #[inline]
    pub fn set_field(&mut self, change: ChangeOf<K>) {
        self.fields.apply(change);
    }

    /// Replace the snapshot with what the server returned
    ///
    /// Server-computed values therefore never read as local edits.
    #[inline]
    pub fn snapshot_after_save(&mut self, saved: &K::Entity) {
        self.synced = saved.fields();
    }

    /// Flip to persisted after the first successful create
    #[inline]
    pub fn mark_persisted(&mut self, id: EntityId) {
        self.identity = Identity::Persisted(id);
    }

    /// Current identity
    #[inline]
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Current editable fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &K::Fields {
        &self.fields
    }

    /// Last synced snapshot
    #[inline]
    #[must_use]
    pub fn synced(&self) -> &K::Fields {
        &self.synced
    }

    /// Fields that differ from the snapshot
    #[inline]
    #[must_use]
    pub fn dirty_fields(&self) -> Vec<FieldOf<K>> {
        self.fields.diff(&self.synced)
    }

    /// Check if any field differs from the snapshot
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty_fields().is_empty()
    }

    /// Check if the required title is filled in
    #[inline]
    #[must_use]
    pub fn has_title(&self) -> bool {
        self.fields.has_title()
    }

    /// Unpersisted with a non-empty title
    #[inline]
    #[must_use]
    pub fn needs_create(&self) -> bool {
        !self.identity.is_persisted() && self.has_title()
    }

    /// Check if a save would send anything right now
    #[inline]
    #[must_use]
    pub fn has_pending_save(&self) -> bool {
        self.has_title() && (self.needs_create() || (self.identity.is_persisted() && self.is_dirty()))
    }

    /// Dirty fields as the changes that would set them
    #[must_use]
    pub fn dirty_patch(&self) -> Vec<ChangeOf<K>> {
        self.dirty_fields()
            .into_iter()
            .map(|field| self.fields.current(field))
            .collect()
    }

    /// Decide what a save should send
    #[must_use]
    pub fn plan(&self) -> SavePlan<K> {
        if !self.has_title() {
            return SavePlan::Nothing;
        }
        match self.identity {
            Identity::Unpersisted => SavePlan::Create(self.fields.clone()),
            Identity::Persisted(id) => {
                let patch = self.dirty_patch();
                if patch.is_empty() {
                    SavePlan::Nothing
                } else {
                    SavePlan::Update(id, patch)
                }
            }
        }
    }

    /// Queue a relation until the entity exists
    #[inline]
    pub fn record_relation(&mut self, link: RelationLink) {
        self.relation_drafts.push(link);
    }

    /// Drop queued relations of one domain type, returning how many
    pub fn discard_relations(&mut self, domain_type: &str) -> usize {
        let before = self.relation_drafts.len();
        self.relation_drafts
            .retain(|link| link.domain_type != domain_type);
        before - self.relation_drafts.len()
    }

    /// Take queued relations in recording order
    #[inline]
    pub fn take_relations(&mut self) -> Vec<RelationLink> {
        std::mem::take(&mut self.relation_drafts)
    }

    /// Queued relations in recording order
    #[inline]
    #[must_use]
    pub fn pending_relations(&self) -> &[RelationLink] {
        &self.relation_drafts
    }
}

impl<K: EntityKind> Default for Draft<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{note, NoteChange, NoteKind};
    use crate::types::IdList;

    #[test]
    fn create_mode_starts_unpersisted_and_clean() {
        let draft = Draft::<NoteKind>::new();
        assert_eq!(draft.identity(), Identity::Unpersisted);
        assert!(!draft.is_dirty());
        assert!(!draft.needs_create());
        assert_eq!(draft.plan(), SavePlan::Nothing);
    }

    #[test]
    fn edit_mode_snapshot_matches_fields() {
        let entity = note(42, "Mix notes");
        let draft = Draft::<NoteKind>::from_entity(Some(&entity));
        assert_eq!(draft.identity(), Identity::Persisted(EntityId(42)));
        assert_eq!(draft.fields(), draft.synced());
        assert!(!draft.is_dirty());
    }

    #[test]
    fn set_field_never_touches_snapshot() {
        let entity = note(1, "Before");
        let mut draft = Draft::<NoteKind>::from_entity(Some(&entity));
        draft.set_field(NoteChange::Title("After".into()));

        assert_eq!(draft.synced().title, "Before");
        assert_eq!(draft.fields().title, "After");
        assert_eq!(
            draft.plan(),
            SavePlan::Update(EntityId(1), vec![NoteChange::Title("After".into())])
        );
    }

    #[test]
    fn setting_current_value_is_not_dirty() {
        let entity = note(1, "Same");
        let mut draft = Draft::<NoteKind>::from_entity(Some(&entity));
        draft.set_field(NoteChange::Title("Same".into()));
        assert!(!draft.is_dirty());

        draft.set_field(NoteChange::Body("x".into()));
        draft.set_field(NoteChange::Body(String::new()));
        assert!(!draft.is_dirty());
    }

    #[test]
    fn reordered_tags_are_not_dirty() {
        let mut entity = note(1, "Tags");
        entity.fields.tags = IdList::from(vec![1, 2, 3]);
        let mut draft = Draft::<NoteKind>::from_entity(Some(&entity));
        draft.set_field(NoteChange::Tags(IdList::from(vec![3, 2, 1])));
        assert!(!draft.is_dirty());
    }

    #[test]
    fn needs_create_requires_title() {
        let mut draft = Draft::<NoteKind>::new();
        draft.set_field(NoteChange::Body("no title yet".into()));
        assert!(!draft.needs_create());
        assert_eq!(draft.plan(), SavePlan::Nothing);

        draft.set_field(NoteChange::Title("   ".into()));
        assert!(!draft.needs_create());

        draft.set_field(NoteChange::Title("Fix mix".into()));
        assert!(draft.needs_create());
        assert!(matches!(draft.plan(), SavePlan::Create(f) if f.title == "Fix mix"));
    }

    #[test]
    fn snapshot_after_save_uses_server_representation() {
        let mut draft = Draft::<NoteKind>::new();
        draft.set_field(NoteChange::Title("draft title".into()));
        draft.mark_persisted(EntityId(5));

        let mut saved = note(5, "draft title");
        saved.fields.body = "server filled".into();
        draft.snapshot_after_save(&saved);

        assert_eq!(draft.synced().body, "server filled");
        assert!(draft.is_dirty());
    }

    #[test]
    fn relations_replay_in_recording_order() {
        let mut draft = Draft::<NoteKind>::new();
        draft.record_relation(RelationLink::new("campaign", 7));
        draft.record_relation(RelationLink::new("project", 3));
        draft.record_relation(RelationLink::new("campaign", 8));

        assert_eq!(draft.discard_relations("campaign"), 2);
        let taken = draft.take_relations();
        assert_eq!(taken, vec![RelationLink::new("project", 3)]);
        assert!(draft.pending_relations().is_empty());
    }

    #[test]
    fn initialize_resets_everything() {
        let mut draft = Draft::<NoteKind>::new();
        draft.set_field(NoteChange::Title("x".into()));
        draft.record_relation(RelationLink::new("campaign", 7));

        let entity = note(9, "loaded");
        draft.initialize(Some(&entity));
        assert_eq!(draft.identity(), Identity::Persisted(EntityId(9)));
        assert_eq!(draft.fields().title, "loaded");
        assert!(draft.pending_relations().is_empty());
        assert!(!draft.is_dirty());
    }
}
