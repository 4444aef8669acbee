//! Minimal entity kind for engine unit tests

use crate::dirty::DirtyEq;
use crate::entity::{EntityKind, FieldChange, FieldSet, PersistedEntity};
use crate::types::{EntityId, IdList};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NoteKind;

impl EntityKind for NoteKind {
    const NAME: &'static str = "note";
    const COLLECTION: &'static str = "notes";
    type Fields = NoteFields;
    type Entity = Note;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct NoteFields {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) pinned: bool,
    pub(crate) tags: IdList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum NoteField {
    Title,
    Body,
    Pinned,
    Tags,
}

impl std::fmt::Display for NoteField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum NoteChange {
    Title(String),
    Body(String),
    Pinned(bool),
    Tags(IdList),
}

impl FieldChange for NoteChange {
    type Field = NoteField;

    fn field(&self) -> NoteField {
        match self {
            Self::Title(_) => NoteField::Title,
            Self::Body(_) => NoteField::Body,
            Self::Pinned(_) => NoteField::Pinned,
            Self::Tags(_) => NoteField::Tags,
        }
    }
}

impl FieldSet for NoteFields {
    type Field = NoteField;
    type Change = NoteChange;

    fn title(&self) -> &str {
        &self.title
    }

    fn apply(&mut self, change: NoteChange) {
        match change {
            NoteChange::Title(v) => self.title = v,
            NoteChange::Body(v) => self.body = v,
            NoteChange::Pinned(v) => self.pinned = v,
            NoteChange::Tags(v) => self.tags = v,
        }
    }

    fn current(&self, field: NoteField) -> NoteChange {
        match field {
            NoteField::Title => NoteChange::Title(self.title.clone()),
            NoteField::Body => NoteChange::Body(self.body.clone()),
            NoteField::Pinned => NoteChange::Pinned(self.pinned),
            NoteField::Tags => NoteChange::Tags(self.tags.clone()),
        }
    }

    fn diff(&self, synced: &Self) -> Vec<NoteField> {
        let mut changed = Vec::new();
        if !self.title.dirty_eq(&synced.title) {
            changed.push(NoteField::Title);
        }
        if !self.body.dirty_eq(&synced.body) {
            changed.push(NoteField::Body);
        }
        if !self.pinned.dirty_eq(&synced.pinned) {
            changed.push(NoteField::Pinned);
        }
        if !self.tags.dirty_eq(&synced.tags) {
            changed.push(NoteField::Tags);
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Note {
    pub(crate) id: EntityId,
    #[serde(flatten)]
    pub(crate) fields: NoteFields,
    pub(crate) updated_at: DateTime<Utc>,
}

impl PersistedEntity for Note {
    type Fields = NoteFields;

    fn id(&self) -> EntityId {
        self.id
    }

    fn fields(&self) -> NoteFields {
        self.fields.clone()
    }

    fn materialize(id: EntityId, fields: NoteFields, at: DateTime<Utc>) -> Self {
        Self {
            id,
            fields,
            updated_at: at,
        }
    }

    fn with_fields(&self, fields: NoteFields, at: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            fields,
            updated_at: at,
        }
    }
}

pub(crate) fn note(id: i64, title: &str) -> Note {
    Note {
        id: EntityId(id),
        fields: NoteFields {
            title: title.to_string(),
            ..NoteFields::default()
        },
        updated_at: Utc.timestamp_opt(0, 0).unwrap(),
    }
}
