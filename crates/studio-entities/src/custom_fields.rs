//! Custom-fields child editor
//!
//! Custom field values have their own endpoint. The editor stages values as
//! they are edited and sends them in one call when the panel flushes.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use studio_draft::{EntityId, Flushable, PersistenceError};

/// Backend call for custom field values
#[async_trait]
pub trait CustomFieldGateway: Send + Sync {
    /// Store values for `entity_id`, keyed by field key
    async fn save_values(
        &self,
        entity_id: EntityId,
        values: &BTreeMap<String, Value>,
    ) -> Result<(), PersistenceError>;
}

/// Child editor for one entity's custom fields
pub struct CustomFieldsEditor {
    entity_id: EntityId,
    gateway: Arc<dyn CustomFieldGateway>,
    staged: Mutex<BTreeMap<String, Value>>,
}

impl CustomFieldsEditor {
    /// Create editor for a persisted entity
    #[must_use]
    pub fn new(entity_id: EntityId, gateway: Arc<dyn CustomFieldGateway>) -> Self {
        Self {
            entity_id,
            gateway,
            staged: Mutex::new(BTreeMap::new()),
        }
    }

    /// Stage a value; replaces any value staged for the same key
    pub fn set_value(&self, key: impl Into<String>, value: Value) {
        self.staged.lock().insert(key.into(), value);
    }

    /// Values waiting for the next flush
    #[must_use]
    pub fn staged(&self) -> BTreeMap<String, Value> {
        self.staged.lock().clone()
    }
}

impl std::fmt::Debug for CustomFieldsEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomFieldsEditor")
            .field("entity_id", &self.entity_id)
            .field("staged", &self.staged.lock().len())
            .finish()
    }
}

#[async_trait]
impl Flushable for CustomFieldsEditor {
    fn label(&self) -> &str {
        "custom fields"
    }

    fn has_pending_changes(&self) -> bool {
        !self.staged.lock().is_empty()
    }

    async fn flush_pending_changes(&self) -> Result<(), PersistenceError> {
        let values = std::mem::take(&mut *self.staged.lock());
        if values.is_empty() {
            return Ok(());
        }

        match self.gateway.save_values(self.entity_id, &values).await {
            Ok(()) => {
                tracing::debug!(
                    "[custom fields] saved {} value(s) for {}",
                    values.len(),
                    self.entity_id
                );
                Ok(())
            }
            Err(e) => {
                // Values staged while the call was out are newer; keep them.
                let mut staged = self.staged.lock();
                for (key, value) in values {
                    staged.entry(key).or_insert(value);
                }
                Err(e)
            }
        }
    }
}
