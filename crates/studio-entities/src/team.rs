//! Team panel entity
//!
//! The team name plays the role of the title: nothing is created until it is
//! filled in. Department, lead, and members are selector fields.
//!
//! Relations: `project`.

use crate::wire::empty_if_null;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use studio_draft::{DirtyEq, EntityId, EntityKind, FieldChange, FieldSet, IdList, PersistedEntity};

/// Team entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamKind;

impl EntityKind for TeamKind {
    const NAME: &'static str = "team";
    const COLLECTION: &'static str = "teams";
    type Fields = TeamFields;
    type Entity = Team;
}

/// Editable team fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamFields {
    /// Required; creation waits for it
    pub name: String,
    /// Free text
    #[serde(deserialize_with = "empty_if_null")]
    pub description: String,
    /// Owning department
    pub department_id: Option<EntityId>,
    /// Team lead
    pub lead_id: Option<EntityId>,
    /// Members, order irrelevant
    pub member_ids: IdList,
}

/// Team field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamField {
    /// `name`
    Name,
    /// `description`
    Description,
    /// `department_id`
    DepartmentId,
    /// `lead_id`
    LeadId,
    /// `member_ids`
    MemberIds,
}

impl TeamField {
    /// Wire name of the field
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::DepartmentId => "department_id",
            Self::LeadId => "lead_id",
            Self::MemberIds => "member_ids",
        }
    }
}

impl fmt::Display for TeamField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edit to a team field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamChange {
    /// Set name
    Name(String),
    /// Set description
    Description(String),
    /// Set or clear department
    DepartmentId(Option<EntityId>),
    /// Set or clear lead
    LeadId(Option<EntityId>),
    /// Replace members
    MemberIds(IdList),
}

impl FieldChange for TeamChange {
    type Field = TeamField;

    fn field(&self) -> TeamField {
        match self {
            Self::Name(_) => TeamField::Name,
            Self::Description(_) => TeamField::Description,
            Self::DepartmentId(_) => TeamField::DepartmentId,
            Self::LeadId(_) => TeamField::LeadId,
            Self::MemberIds(_) => TeamField::MemberIds,
        }
    }
}

impl FieldSet for TeamFields {
    type Field = TeamField;
    type Change = TeamChange;

    fn title(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, change: TeamChange) {
        match change {
            TeamChange::Name(v) => self.name = v,
            TeamChange::Description(v) => self.description = v,
            TeamChange::DepartmentId(v) => self.department_id = v,
            TeamChange::LeadId(v) => self.lead_id = v,
            TeamChange::MemberIds(v) => self.member_ids = v,
        }
    }

    fn current(&self, field: TeamField) -> TeamChange {
        match field {
            TeamField::Name => TeamChange::Name(self.name.clone()),
            TeamField::Description => TeamChange::Description(self.description.clone()),
            TeamField::DepartmentId => TeamChange::DepartmentId(self.department_id),
            TeamField::LeadId => TeamChange::LeadId(self.lead_id),
            TeamField::MemberIds => TeamChange::MemberIds(self.member_ids.clone()),
        }
    }

    fn diff(&self, synced: &Self) -> Vec<TeamField> {
        let mut changed = Vec::new();
        if !self.name.dirty_eq(&synced.name) {
            changed.push(TeamField::Name);
        }
        if !self.description.dirty_eq(&synced.description) {
            changed.push(TeamField::Description);
        }
        if !self.department_id.dirty_eq(&synced.department_id) {
            changed.push(TeamField::DepartmentId);
        }
        if !self.lead_id.dirty_eq(&synced.lead_id) {
            changed.push(TeamField::LeadId);
        }
        if !self.member_ids.dirty_eq(&synced.member_ids) {
            changed.push(TeamField::MemberIds);
        }
        changed
    }
}

/// Team as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Server id
    pub id: EntityId,
    /// Editable fields
    #[serde(flatten)]
    pub fields: TeamFields,
    /// Creation stamp
    pub created_at: DateTime<Utc>,
    /// Last modification stamp
    pub updated_at: DateTime<Utc>,
}

impl PersistedEntity for Team {
    type Fields = TeamFields;

    fn id(&self) -> EntityId {
        self.id
    }

    fn fields(&self) -> TeamFields {
        self.fields.clone()
    }

    fn materialize(id: EntityId, fields: TeamFields, at: DateTime<Utc>) -> Self {
        Self {
            id,
            fields,
            created_at: at,
            updated_at: at,
        }
    }

    fn with_fields(&self, fields: TeamFields, at: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            fields,
            created_at: self.created_at,
            updated_at: at,
        }
    }
}
