//! Persistence Gateway contract
//!
//! The engine never talks to a backend directly. Every create, update,
//! relation and delete call goes through this trait, so the same panel logic
//! runs against the REST backend, the in-memory store, or a test double.

use crate::entity::{ChangeOf, EntityKind};
use crate::error::PersistenceError;
use crate::types::{EntityId, RelationLink};
use async_trait::async_trait;

/// Backend calls consumed by the panel controller
#[async_trait]
pub trait PersistenceGateway<K: EntityKind>: Send + Sync {
    /// Persist a new entity from the full field set
    async fn create(&self, fields: &K::Fields) -> Result<K::Entity, PersistenceError>;

    /// Apply a partial update; returns the server's representation
    async fn update(&self, id: EntityId, patch: &[ChangeOf<K>])
        -> Result<K::Entity, PersistenceError>;

    /// Associate the entity with another aggregate
    async fn link_relation(
        &self,
        entity_id: EntityId,
        link: &RelationLink,
    ) -> Result<(), PersistenceError>;

    /// Remove the entity's association of `domain_type`
    async fn unlink_relation(
        &self,
        entity_id: EntityId,
        domain_type: &str,
    ) -> Result<(), PersistenceError>;

    /// Delete the entity
    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError>;
}
