//! Task panel entity
//!
//! Title gates creation. Status, priority, due date, and assignees are edited
//! through selector widgets and go through the immediate channel; title and
//! description are typed and debounced.
//!
//! Relations: `campaign`, `project`.

use crate::wire::empty_if_null;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use studio_draft::{DirtyEq, EntityId, EntityKind, FieldChange, FieldSet, IdList, PersistedEntity};

/// Relation domain for campaigns
pub const CAMPAIGN_RELATION: &str = "campaign";
/// Relation domain for projects
pub const PROJECT_RELATION: &str = "project";

/// Task entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskKind;

impl EntityKind for TaskKind {
    const NAME: &'static str = "task";
    const COLLECTION: &'static str = "tasks";
    type Fields = TaskFields;
    type Entity = Task;
}

/// Workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Todo,
    /// Being worked on
    InProgress,
    /// Waiting for review
    InReview,
    /// Finished
    Done,
}

/// Priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// No priority set
    #[default]
    None,
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Urgent
    Urgent,
}

impl DirtyEq for TaskStatus {
    fn dirty_eq(&self, synced: &Self) -> bool {
        self == synced
    }
}

impl DirtyEq for TaskPriority {
    fn dirty_eq(&self, synced: &Self) -> bool {
        self == synced
    }
}

/// Editable task fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFields {
    /// Required; creation waits for it
    pub title: String,
    /// Free text
    #[serde(deserialize_with = "empty_if_null")]
    pub description: String,
    /// Workflow status
    pub status: TaskStatus,
    /// Priority
    pub priority: TaskPriority,
    /// Due date
    pub due_date: Option<NaiveDate>,
    /// Assigned users, order irrelevant
    pub assignee_ids: IdList,
    /// Owning project
    pub project_id: Option<EntityId>,
}

/// Task field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    /// `title`
    Title,
    /// `description`
    Description,
    /// `status`
    Status,
    /// `priority`
    Priority,
    /// `due_date`
    DueDate,
    /// `assignee_ids`
    AssigneeIds,
    /// `project_id`
    ProjectId,
}

impl TaskField {
    /// Wire name of the field
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::DueDate => "due_date",
            Self::AssigneeIds => "assignee_ids",
            Self::ProjectId => "project_id",
        }
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edit to a task field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskChange {
    /// Set title
    Title(String),
    /// Set description
    Description(String),
    /// Set status
    Status(TaskStatus),
    /// Set priority
    Priority(TaskPriority),
    /// Set or clear due date
    DueDate(Option<NaiveDate>),
    /// Replace assignees
    AssigneeIds(IdList),
    /// Set or clear project
    ProjectId(Option<EntityId>),
}

impl FieldChange for TaskChange {
    type Field = TaskField;

    fn field(&self) -> TaskField {
        match self {
            Self::Title(_) => TaskField::Title,
            Self::Description(_) => TaskField::Description,
            Self::Status(_) => TaskField::Status,
            Self::Priority(_) => TaskField::Priority,
            Self::DueDate(_) => TaskField::DueDate,
            Self::AssigneeIds(_) => TaskField::AssigneeIds,
            Self::ProjectId(_) => TaskField::ProjectId,
        }
    }
}

impl FieldSet for TaskFields {
    type Field = TaskField;
    type Change = TaskChange;

    fn title(&self) -> &str {
        &self.title
    }

    fn apply(&mut self, change: TaskChange) {
        match change {
            TaskChange::Title(v) => self.title = v,
            TaskChange::Description(v) => self.description = v,
            TaskChange::Status(v) => self.status = v,
            TaskChange::Priority(v) => self.priority = v,
            TaskChange::DueDate(v) => self.due_date = v,
            TaskChange::AssigneeIds(v) => self.assignee_ids = v,
            TaskChange::ProjectId(v) => self.project_id = v,
        }
    }

    fn current(&self, field: TaskField) -> TaskChange {
        match field {
            TaskField::Title => TaskChange::Title(self.title.clone()),
            TaskField::Description => TaskChange::Description(self.description.clone()),
            TaskField::Status => TaskChange::Status(self.status),
            TaskField::Priority => TaskChange::Priority(self.priority),
            TaskField::DueDate => TaskChange::DueDate(self.due_date),
            TaskField::AssigneeIds => TaskChange::AssigneeIds(self.assignee_ids.clone()),
            TaskField::ProjectId => TaskChange::ProjectId(self.project_id),
        }
    }

    fn diff(&self, synced: &Self) -> Vec<TaskField> {
        let checks = [
            (TaskField::Title, self.title.dirty_eq(&synced.title)),
            (TaskField::Description, self.description.dirty_eq(&synced.description)),
            (TaskField::Status, self.status.dirty_eq(&synced.status)),
            (TaskField::Priority, self.priority.dirty_eq(&synced.priority)),
            (TaskField::DueDate, self.due_date.dirty_eq(&synced.due_date)),
            (TaskField::AssigneeIds, self.assignee_ids.dirty_eq(&synced.assignee_ids)),
            (TaskField::ProjectId, self.project_id.dirty_eq(&synced.project_id)),
        ];
        checks
            .into_iter()
            .filter_map(|(field, same)| (!same).then_some(field))
            .collect()
    }
}

/// Task as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Server id
    pub id: EntityId,
    /// Editable fields
    #[serde(flatten)]
    pub fields: TaskFields,
    /// Creation stamp
    pub created_at: DateTime<Utc>,
    /// Last modification stamp
    pub updated_at: DateTime<Utc>,
}

impl PersistedEntity for Task {
    type Fields = TaskFields;

    fn id(&self) -> EntityId {
        self.id
    }

    fn fields(&self) -> TaskFields {
        self.fields.clone()
    }

    fn materialize(id: EntityId, fields: TaskFields, at: DateTime<Utc>) -> Self {
        Self {
            id,
            fields,
            created_at: at,
            updated_at: at,
        }
    }

    fn with_fields(&self, fields: TaskFields, at: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            fields,
            created_at: self.created_at,
            updated_at: at,
        }
    }
}
