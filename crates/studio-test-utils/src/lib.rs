//! Testing utilities for the studio panels workspace
//!
//! Shared test doubles:
//! - [`RecordingGateway`] journals every call and can inject failures
//! - [`RecordingNotifier`] collects emitted statuses
//! - [`ScriptedChild`] is a child editor that writes into the same journal,
//!   so tests can assert the order of child flushes and panel saves

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use studio_draft::{
    patch_object, ChangeOf, EntityId, EntityKind, Flushable, InMemoryGateway, Notifier,
    PersistenceError, PersistenceGateway, RelationLink, SaveStatus,
};

/// One observed call, in the order it started
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(Value),
    Update { id: EntityId, patch: Value },
    Link { id: EntityId, link: RelationLink },
    Unlink { id: EntityId, domain_type: String },
    Delete(EntityId),
    ChildFlush(String),
}

impl Call {
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }

    #[must_use]
    pub fn is_update(&self) -> bool {
        matches!(self, Self::Update { .. })
    }
}

/// Call log shared between a gateway and child editors
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    #[must_use]
    pub fn creates(&self) -> usize {
        self.0.lock().iter().filter(|c| c.is_create()).count()
    }

    #[must_use]
    pub fn updates(&self) -> Vec<Value> {
        self.0
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Update { patch, .. } => Some(patch.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

#[derive(Debug, Default)]
struct Failures {
    create: VecDeque<PersistenceError>,
    update: VecDeque<PersistenceError>,
    delete: VecDeque<PersistenceError>,
    link_domains: Vec<String>,
}

/// In-memory gateway that journals calls and fails on request
pub struct RecordingGateway<K: EntityKind> {
    inner: InMemoryGateway<K>,
    journal: Journal,
    failures: Mutex<Failures>,
    latency: Option<Duration>,
}

impl<K: EntityKind> RecordingGateway<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_journal(Journal::new())
    }

    #[must_use]
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            inner: InMemoryGateway::new(),
            journal,
            failures: Mutex::new(Failures::default()),
            latency: None,
        }
    }

    /// Every call sleeps this long after being journaled
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    #[must_use]
    pub fn store(&self) -> &InMemoryGateway<K> {
        &self.inner
    }

    pub fn seed(&self, entity: K::Entity) -> K::Entity {
        self.inner.seed(entity)
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<K::Entity> {
        self.inner.get(id)
    }

    pub fn fail_next_create(&self, err: PersistenceError) {
        self.failures.lock().create.push_back(err);
    }

    pub fn fail_next_update(&self, err: PersistenceError) {
        self.failures.lock().update.push_back(err);
    }

    pub fn fail_next_delete(&self, err: PersistenceError) {
        self.failures.lock().delete.push_back(err);
    }

    /// Every link of `domain_type` fails until the test ends
    pub fn fail_links(&self, domain_type: &str) {
        self.failures.lock().link_domains.push(domain_type.to_string());
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl<K: EntityKind> Default for RecordingGateway<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: EntityKind> PersistenceGateway<K> for RecordingGateway<K> {
    async fn create(&self, fields: &K::Fields) -> Result<K::Entity, PersistenceError> {
        self.journal
            .push(Call::Create(serde_json::to_value(fields)?));
        self.delay().await;
        let failure = self.failures.lock().create.pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        self.inner.create(fields).await
    }

    async fn update(
        &self,
        id: EntityId,
        patch: &[ChangeOf<K>],
    ) -> Result<K::Entity, PersistenceError> {
        self.journal.push(Call::Update {
            id,
            patch: Value::Object(patch_object(patch)?),
        });
        self.delay().await;
        let failure = self.failures.lock().update.pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        self.inner.update(id, patch).await
    }

    async fn link_relation(
        &self,
        entity_id: EntityId,
        link: &RelationLink,
    ) -> Result<(), PersistenceError> {
        self.journal.push(Call::Link {
            id: entity_id,
            link: link.clone(),
        });
        self.delay().await;
        let refused = self
            .failures
            .lock()
            .link_domains
            .contains(&link.domain_type);
        if refused {
            return Err(PersistenceError::rejected(
                422,
                format!("cannot link {}", link.domain_type),
            ));
        }
        self.inner.link_relation(entity_id, link).await
    }

    async fn unlink_relation(
        &self,
        entity_id: EntityId,
        domain_type: &str,
    ) -> Result<(), PersistenceError> {
        self.journal.push(Call::Unlink {
            id: entity_id,
            domain_type: domain_type.to_string(),
        });
        self.delay().await;
        self.inner.unlink_relation(entity_id, domain_type).await
    }

    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError> {
        self.journal.push(Call::Delete(id));
        self.delay().await;
        let failure = self.failures.lock().delete.pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        self.inner.delete(id).await
    }
}

/// Notifier that keeps every status it receives
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<(&'static str, SaveStatus)>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<SaveStatus> {
        self.seen.lock().iter().map(|(_, s)| s.clone()).collect()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<SaveStatus> {
        self.statuses()
            .into_iter()
            .filter(|s| matches!(s, SaveStatus::Error { .. }))
            .collect()
    }

    #[must_use]
    pub fn count(&self, status: &SaveStatus) -> usize {
        self.seen.lock().iter().filter(|(_, s)| s == status).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, entity: &'static str, status: &SaveStatus) {
        self.seen.lock().push((entity, status.clone()));
    }
}

/// Child editor with scripted pending work
#[derive(Debug)]
pub struct ScriptedChild {
    label: String,
    journal: Journal,
    pending: Mutex<bool>,
    latency: Duration,
    failure: Mutex<Option<PersistenceError>>,
}

impl ScriptedChild {
    #[must_use]
    pub fn new(label: &str, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            journal,
            pending: Mutex::new(false),
            latency: Duration::ZERO,
            failure: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn with_latency(label: &str, journal: Journal, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            journal,
            pending: Mutex::new(false),
            latency,
            failure: Mutex::new(None),
        })
    }

    pub fn mark_pending(&self) {
        *self.pending.lock() = true;
    }

    pub fn fail_next(&self, err: PersistenceError) {
        *self.failure.lock() = Some(err);
    }
}

#[async_trait]
impl Flushable for ScriptedChild {
    fn label(&self) -> &str {
        &self.label
    }

    fn has_pending_changes(&self) -> bool {
        *self.pending.lock()
    }

    async fn flush_pending_changes(&self) -> Result<(), PersistenceError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.journal.push(Call::ChildFlush(self.label.clone()));
        let failure = self.failure.lock().take();
        match failure {
            Some(err) => Err(err),
            None => {
                *self.pending.lock() = false;
                tracing::trace!("{} flushed", self.label);
                Ok(())
            }
        }
    }
}
