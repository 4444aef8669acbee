//! Studio Draft - autosave engine for entity side panels
//!
//! Keeps a local draft of one entity and reconciles it with the server:
//! - Debounced create/update, gated on a non-empty title
//! - Immediate updates for discrete-choice fields once the entity exists
//! - Relations chosen before the first create, replayed right after it
//! - A flush path for close, Escape, and the save shortcut that awaits
//!   child editors and the final save
//! - Delete behind a confirmation step, retiring the draft
//!
//! The engine is generic over an [`EntityKind`]; concrete kinds (tasks,
//! teams) and the HTTP gateway live in `studio-entities`.
//!
//! # Example
//!
//! ```rust,ignore
//! use studio_draft::prelude::*;
//! use studio_entities::{TaskChange, TaskKind};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(InMemoryGateway::<TaskKind>::new());
//! let panel = PanelBuilder::new(gateway).open_create();
//!
//! panel.set_field(TaskChange::Title("Fix mix".into()))?;
//! let report = panel.close().await;
//! println!("closed: {:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod controller;
pub mod dirty;
pub mod draft;
pub mod entity;
pub mod error;
pub mod flush;
pub mod gateway;
pub mod immediate;
pub mod keys;
pub mod memory;
pub mod notify;
pub mod relations;
pub mod types;

mod timer;

#[cfg(test)]
mod fixtures;

// Re-exports for convenience
pub use config::{EngineConfig, DEBOUNCE_ENV, DEFAULT_DEBOUNCE_MS};
pub use controller::{PanelBuilder, PanelController};
pub use dirty::{id_list_eq, text_eq, DirtyEq};
pub use draft::{Draft, SavePlan};
pub use entity::{
    patch_object, patched_fields, ChangeOf, EntityKind, FieldChange, FieldOf, FieldSet,
    PersistedEntity,
};
pub use error::{EngineError, PersistenceError};
pub use flush::{Flushable, InputFocus};
pub use gateway::PersistenceGateway;
pub use keys::{KeyCommand, KeyOutcome};
pub use memory::InMemoryGateway;
pub use notify::{FailureKind, Notifier, SaveStatus, SuccessCallback, TracingNotifier};
pub use types::{
    EntityId, FlushReport, IdList, Identity, PersistOutcome, RelationLink, SaveState,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building and driving panels
    pub use crate::{
        ChangeOf, DirtyEq, EngineConfig, EngineError, EntityId, EntityKind, FieldChange, FieldSet,
        Flushable, IdList, Identity, InMemoryGateway, KeyCommand, KeyOutcome, PanelBuilder,
        PanelController, PersistOutcome, PersistedEntity, PersistenceError, PersistenceGateway,
        RelationLink, SaveState, SaveStatus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
