//! Studio Entities - task and team panels
//!
//! Concrete entity kinds for the draft engine, plus the backends they talk
//! to:
//! - [`task`] and [`team`] field sets, changes, and server representations
//! - [`RestGateway`], the HTTP/JSON Persistence Gateway
//! - [`CustomFieldsEditor`], a child editor flushed before the panel saves

#![warn(unreachable_pub)]

pub mod custom_fields;
pub mod rest;
pub mod task;
pub mod team;

mod wire;

pub use custom_fields::{CustomFieldGateway, CustomFieldsEditor};
pub use rest::{RestConfig, RestGateway};
pub use task::{Task, TaskChange, TaskField, TaskFields, TaskKind, TaskPriority, TaskStatus};
pub use team::{Team, TeamChange, TeamField, TeamFields, TeamKind};

/// Panel controller for tasks
pub type TaskPanel = studio_draft::PanelController<TaskKind>;
/// Panel controller for teams
pub type TeamPanel = studio_draft::PanelController<TeamKind>;
