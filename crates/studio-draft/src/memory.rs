//! In-memory Persistence Gateway
//!
//! Stores entities in a `DashMap` and assigns ids from 1. Used for demos,
//! the replay CLI, and engine tests. An optional latency delays every call
//! so in-flight behaviour can be observed.

use crate::entity::{patched_fields, ChangeOf, EntityKind, PersistedEntity};
use crate::error::PersistenceError;
use crate::gateway::PersistenceGateway;
use crate::types::{EntityId, RelationLink};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

/// Gateway backed by process memory
#[derive(Debug)]
pub struct InMemoryGateway<K: EntityKind> {
    entities: DashMap<EntityId, K::Entity>,
    /// One link per (entity, domain type)
    relations: DashMap<EntityId, Vec<RelationLink>>,
    next_id: AtomicI64,
    updates: AtomicUsize,
    latency: Option<Duration>,
}

impl<K: EntityKind> InMemoryGateway<K> {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
            relations: DashMap::new(),
            next_id: AtomicI64::new(1),
            updates: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// With a delay applied to every call
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Insert an existing entity, as if loaded from the server
    pub fn seed(&self, entity: K::Entity) -> K::Entity {
        let id = entity.id();
        self.next_id.fetch_max(id.get() + 1, Ordering::SeqCst);
        self.entities.insert(id, entity.clone());
        entity
    }

    /// Stored entity
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<K::Entity> {
        self.entities.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of stored entities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Successful `update` calls so far
    #[inline]
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Links of an entity, in insertion order
    #[must_use]
    pub fn relations_of(&self, id: EntityId) -> Vec<RelationLink> {
        self.relations
            .get(&id)
            .map(|links| links.value().clone())
            .unwrap_or_default()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn missing(id: EntityId) -> PersistenceError {
        PersistenceError::NotFound(format!("{} {}", K::NAME, id))
    }
}

impl<K: EntityKind> Default for InMemoryGateway<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: EntityKind> PersistenceGateway<K> for InMemoryGateway<K> {
    async fn create(&self, fields: &K::Fields) -> Result<K::Entity, PersistenceError> {
        self.delay().await;
        let id = EntityId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let entity = K::Entity::materialize(id, fields.clone(), Utc::now());
        self.entities.insert(id, entity.clone());
        tracing::debug!("[memory] created {} {}", K::NAME, id);
        Ok(entity)
    }

    async fn update(
        &self,
        id: EntityId,
        patch: &[ChangeOf<K>],
    ) -> Result<K::Entity, PersistenceError> {
        self.delay().await;
        let mut entry = self.entities.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        let updated = entry.with_fields(patched_fields(entry.value(), patch), Utc::now());
        *entry = updated.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("[memory] updated {} {} ({} field(s))", K::NAME, id, patch.len());
        Ok(updated)
    }

    async fn link_relation(
        &self,
        entity_id: EntityId,
        link: &RelationLink,
    ) -> Result<(), PersistenceError> {
        self.delay().await;
        if !self.entities.contains_key(&entity_id) {
            return Err(Self::missing(entity_id));
        }
        let mut links = self.relations.entry(entity_id).or_default();
        links.retain(|existing| existing.domain_type != link.domain_type);
        links.push(link.clone());
        Ok(())
    }

    async fn unlink_relation(
        &self,
        entity_id: EntityId,
        domain_type: &str,
    ) -> Result<(), PersistenceError> {
        self.delay().await;
        if !self.entities.contains_key(&entity_id) {
            return Err(Self::missing(entity_id));
        }
        if let Some(mut links) = self.relations.get_mut(&entity_id) {
            links.retain(|existing| existing.domain_type != domain_type);
        }
        Ok(())
    }

    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError> {
        self.delay().await;
        self.entities.remove(&id).ok_or_else(|| Self::missing(id))?;
        self.relations.remove(&id);
        tracing::debug!("[memory] deleted {} {}", K::NAME, id);
        Ok(())
    }
}
