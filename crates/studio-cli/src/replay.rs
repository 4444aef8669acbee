//! Replay a script against an in-memory backend

use crate::script::{Script, Step};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use studio_draft::{
    EngineConfig, EntityId, EntityKind, InMemoryGateway, KeyOutcome, Notifier, PanelBuilder,
    PanelController, PersistedEntity, RelationLink, SaveStatus,
};

/// Final state of a replayed session
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Entity type
    pub entity: &'static str,
    /// Server id, once created
    pub id: Option<EntityId>,
    /// Stored entity at the end of the session
    pub stored: Option<serde_json::Value>,
    /// Links stored for the entity
    pub relations: Vec<RelationLink>,
    /// Successful update calls
    pub updates: usize,
    /// Statuses emitted, in order
    pub statuses: Vec<String>,
    /// Entity was deleted
    pub deleted: bool,
}

#[derive(Default)]
struct CollectingNotifier {
    seen: Mutex<Vec<String>>,
}

impl Notifier for CollectingNotifier {
    fn notify(&self, entity: &'static str, status: &SaveStatus) {
        tracing::info!("[{}] {}", entity, status);
        self.seen.lock().push(status.to_string());
    }
}

/// Run every step, then close the panel if the script did not
///
/// # Errors
/// Returns an error if a step is rejected by the panel (e.g. an edit after
/// close)
pub async fn replay<K: EntityKind>(
    script: Script<K>,
    config: EngineConfig,
    latency: Option<Duration>,
) -> anyhow::Result<ReplayReport> {
    let mut store = InMemoryGateway::<K>::new();
    if let Some(latency) = latency {
        store = store.with_latency(latency);
    }
    let gateway = Arc::new(store);
    let notifier = Arc::new(CollectingNotifier::default());

    let builder = PanelBuilder::new(gateway.clone())
        .config(config)
        .notifier(notifier.clone())
        .on_success(|entity: &K::Entity| {
            tracing::info!("[{}] first save as {}", K::NAME, entity.id());
        });
    let panel = match script.seed {
        Some(fields) => {
            let entity = gateway.seed(K::Entity::materialize(EntityId(1), fields, Utc::now()));
            builder.open_edit(&entity)
        }
        None => builder.open_create(),
    };

    for (index, step) in script.steps.into_iter().enumerate() {
        tracing::debug!("step {}: {:?}", index, step);
        run_step(&panel, step).await?;
    }
    if !panel.is_closed() {
        panel.close().await;
    }

    let id = panel.identity().id();
    let stored = id
        .and_then(|id| gateway.get(id))
        .map(|entity| serde_json::to_value(&entity))
        .transpose()?;
    let statuses = notifier.seen.lock().clone();
    Ok(ReplayReport {
        entity: K::NAME,
        id,
        stored,
        relations: id.map(|id| gateway.relations_of(id)).unwrap_or_default(),
        updates: gateway.update_count(),
        statuses,
        deleted: panel.is_retired(),
    })
}

async fn run_step<K: EntityKind>(panel: &PanelController<K>, step: Step<K>) -> anyhow::Result<()> {
    match step {
        Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
        Step::Edit { change } => panel.set_field(change)?,
        Step::Immediate { change } => {
            panel.apply_immediate(change).await?;
        }
        Step::Relate { link } => {
            panel.record_relation(link).await?;
        }
        Step::Unrelate { domain_type } => {
            panel.remove_relation(&domain_type).await?;
        }
        Step::Key { key } => {
            if panel.handle_key(key).await == KeyOutcome::Ignored {
                tracing::info!("key {:?} ignored", key);
            }
        }
        Step::Delete => {
            if panel.request_delete() {
                panel.confirm_delete().await?;
            }
        }
        Step::Close => {
            panel.close().await;
        }
    }
    Ok(())
}
