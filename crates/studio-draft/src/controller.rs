//! Panel controller and Save Scheduler
//!
//! One [`PanelController`] owns the draft of one open panel. Every edit goes
//! through it; it decides when to arm the debounce timer, what the pending
//! save is (create vs update), and serializes every gateway call of the
//! draft through a single persistence lane.
//!
//! # State machine
//!
//! ```text
//! Idle ──edit──▶ Dirty ──timer──▶ Creating | Saving ──done──▶ Idle
//!   ▲              │                                          (Dirty if re-armed
//!   └──not dirty───┘                                           while in flight)
//! ```
//!
//! Panel state sits behind a synchronous mutex that is never held across an
//! await. Edits therefore apply immediately even while a save is in flight;
//! they only re-arm the timer for the next cycle.

use crate::config::EngineConfig;
use crate::draft::{Draft, SavePlan};
use crate::entity::{ChangeOf, EntityKind, PersistedEntity};
use crate::error::{EngineError, PersistenceError};
use crate::flush::{Flushable, InputFocus};
use crate::gateway::PersistenceGateway;
use crate::notify::{FailureKind, Notifier, SaveStatus, SuccessCallback, TracingNotifier};
use crate::timer::DebounceTimer;
use crate::types::{EntityId, Identity, PersistOutcome, RelationLink, SaveState};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

/// Builder for a panel controller
pub struct PanelBuilder<K: EntityKind> {
    gateway: Arc<dyn PersistenceGateway<K>>,
    config: EngineConfig,
    notifier: Arc<dyn Notifier>,
    on_success: Option<SuccessCallback<K::Entity>>,
}

impl<K: EntityKind> PanelBuilder<K> {
    /// Start a builder over a gateway
    #[must_use]
    pub fn new(gateway: Arc<dyn PersistenceGateway<K>>) -> Self {
        Self {
            gateway,
            config: EngineConfig::default(),
            notifier: Arc::new(TracingNotifier),
            on_success: None,
        }
    }

    /// With engine configuration
    #[inline]
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// With status notifier
    #[inline]
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// With hook called once after the first successful create
    #[inline]
    #[must_use]
    pub fn on_success(mut self, callback: impl Fn(&K::Entity) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Open a panel in create mode
    #[must_use]
    pub fn open_create(self) -> PanelController<K> {
        self.open(Draft::new())
    }

    /// Open a panel in edit mode for a loaded entity
    #[must_use]
    pub fn open_edit(self, entity: &K::Entity) -> PanelController<K> {
        self.open(Draft::from_entity(Some(entity)))
    }

    fn open(self, draft: Draft<K>) -> PanelController<K> {
        tracing::debug!(
            "[{}] panel opened ({:?})",
            K::NAME,
            draft.identity()
        );
        let (state_tx, _) = watch::channel(SaveState::Idle);
        let timer = DebounceTimer::new(self.config.debounce());
        PanelController {
            shared: Arc::new(Shared {
                config: self.config,
                gateway: self.gateway,
                notifier: self.notifier,
                lane: tokio::sync::Mutex::new(()),
                state_tx,
                state: Mutex::new(PanelState {
                    draft,
                    save_state: SaveState::Idle,
                    timer,
                    children: Vec::new(),
                    focus: None,
                    on_success: self.on_success,
                    confirming_delete: false,
                    flushing: false,
                    flushed_save: None,
                    retired: false,
                    closed: false,
                }),
            }),
        }
    }
}

/// Controller for one open entity panel
///
/// Cloning yields another handle to the same panel.
pub struct PanelController<K: EntityKind> {
    pub(crate) shared: Arc<Shared<K>>,
}

impl<K: EntityKind> Clone for PanelController<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: EntityKind> std::fmt::Debug for PanelController<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.shared.state.lock();
        f.debug_struct("PanelController")
            .field("entity", &K::NAME)
            .field("identity", &st.draft.identity())
            .field("save_state", &st.save_state)
            .field("retired", &st.retired)
            .field("closed", &st.closed)
            .finish()
    }
}

pub(crate) struct Shared<K: EntityKind> {
    pub(crate) config: EngineConfig,
    pub(crate) gateway: Arc<dyn PersistenceGateway<K>>,
    notifier: Arc<dyn Notifier>,
    /// Serializes gateway calls of this draft
    pub(crate) lane: tokio::sync::Mutex<()>,
    state_tx: watch::Sender<SaveState>,
    pub(crate) state: Mutex<PanelState<K>>,
}

pub(crate) struct PanelState<K: EntityKind> {
    pub(crate) draft: Draft<K>,
    pub(crate) save_state: SaveState,
    pub(crate) timer: DebounceTimer,
    pub(crate) children: Vec<Arc<dyn Flushable>>,
    pub(crate) focus: Option<Arc<dyn InputFocus<K>>>,
    on_success: Option<SuccessCallback<K::Entity>>,
    pub(crate) confirming_delete: bool,
    /// Child editors are being flushed; expired countdowns stand down
    pub(crate) flushing: bool,
    /// Debounced save that completed while a flush was running
    pub(crate) flushed_save: Option<PersistOutcome>,
    pub(crate) retired: bool,
    pub(crate) closed: bool,
}

impl<K: EntityKind> PanelState<K> {
    pub(crate) fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed {
            Err(EngineError::Closed)
        } else if self.retired {
            Err(EngineError::Retired)
        } else {
            Ok(())
        }
    }
}

impl<K: EntityKind> PanelController<K> {
    /// Apply an edit and let the scheduler decide whether to (re)arm
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// `EngineError::Closed` / `EngineError::Retired` once the panel is gone
    pub fn set_field(&self, change: ChangeOf<K>) -> Result<(), EngineError> {
        let mut st = self.shared.state.lock();
        st.ensure_open()?;
        st.draft.set_field(change);
        self.shared.evaluate(&mut st);
        Ok(())
    }

    /// Current save state
    #[inline]
    #[must_use]
    pub fn save_state(&self) -> SaveState {
        self.shared.state.lock().save_state
    }

    /// Watch save state changes
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.shared.state_tx.subscribe()
    }

    /// Current identity
    #[inline]
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.shared.state.lock().draft.identity()
    }

    /// Copy of the current draft fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> K::Fields {
        self.shared.state.lock().draft.fields().clone()
    }

    /// Check if the draft differs from the last synced snapshot
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.shared.state.lock().draft.is_dirty()
    }

    /// Check if the draft is an unpersisted entity with a title
    #[inline]
    #[must_use]
    pub fn needs_create(&self) -> bool {
        self.shared.state.lock().draft.needs_create()
    }

    /// Relations waiting for the first create
    #[must_use]
    pub fn pending_relations(&self) -> Vec<RelationLink> {
        self.shared.state.lock().draft.pending_relations().to_vec()
    }

    /// Check if the delete confirmation is open
    #[inline]
    #[must_use]
    pub fn is_confirming_delete(&self) -> bool {
        self.shared.state.lock().confirming_delete
    }

    /// Check if the entity was deleted
    #[inline]
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.shared.state.lock().retired
    }

    /// Check if the panel has been closed
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }
}

impl<K: EntityKind> Shared<K> {
    /// Scheduler transition rule, run after every draft edit
    pub(crate) fn evaluate(self: &Arc<Self>, st: &mut PanelState<K>) {
        if st.draft.has_pending_save() {
            let shared = Arc::clone(self);
            st.timer
                .arm(move |generation| async move { shared.on_timer(generation).await });
            if !st.save_state.is_in_flight() {
                self.set_state(st, SaveState::Dirty);
            }
        } else {
            if st.timer.cancel() {
                tracing::debug!("[{}] edit reverted, pending save dropped", K::NAME);
            }
            if st.save_state == SaveState::Dirty {
                self.set_state(st, SaveState::Idle);
            }
        }
    }

    async fn on_timer(self: Arc<Self>, generation: u64) {
        {
            let mut st = self.state.lock();
            if !st.timer.claim(generation) {
                return;
            }
        }
        tracing::debug!("[{}] debounce window elapsed", K::NAME);
        let _lane = self.lane.lock().await;
        if self.state.lock().flushing {
            tracing::debug!("[{}] flush in progress, leaving the save to it", K::NAME);
            return;
        }
        let outcome = self.persist_pending().await;
        let mut st = self.state.lock();
        if st.flushing && outcome != PersistOutcome::Skipped {
            st.flushed_save = Some(outcome);
        }
    }

    /// Run the save the draft currently calls for, if any
    ///
    /// Caller holds the lane.
    pub(crate) async fn persist_pending(&self) -> PersistOutcome {
        let plan = {
            let mut st = self.state.lock();
            if st.retired {
                return PersistOutcome::Skipped;
            }
            let plan = st.draft.plan();
            match &plan {
                SavePlan::Nothing => self.settle(&mut st),
                SavePlan::Create(_) => self.set_state(&mut st, SaveState::Creating),
                SavePlan::Update(..) => self.set_state(&mut st, SaveState::Saving),
            }
            plan
        };

        match plan {
            SavePlan::Nothing => PersistOutcome::Skipped,
            SavePlan::Create(fields) => self.run_create(fields).await,
            SavePlan::Update(id, patch) => self.run_update(id, patch).await,
        }
    }

    /// Caller holds the lane and has set `Creating`
    async fn run_create(&self, fields: K::Fields) -> PersistOutcome {
        self.notify(SaveStatus::Creating);
        match self.gateway.create(&fields).await {
            Ok(entity) => {
                let id = entity.id();
                let (relations, callback) = {
                    let mut st = self.state.lock();
                    st.draft.mark_persisted(id);
                    st.draft.snapshot_after_save(&entity);
                    (st.draft.take_relations(), st.on_success.take())
                };
                tracing::info!("[{}] created {}", K::NAME, id);

                let failed = self.replay_relations(id, relations).await;
                if failed > 0 {
                    tracing::warn!("[{}] {} relation(s) not linked to {}", K::NAME, failed, id);
                }

                self.settle(&mut self.state.lock());
                self.notify(SaveStatus::Saved);
                if let Some(callback) = callback {
                    callback(&entity);
                }
                PersistOutcome::Created(id)
            }
            Err(e) => {
                tracing::warn!(
                    "[{}] create failed ({}): {}",
                    K::NAME,
                    retry_hint(&e),
                    e
                );
                self.settle(&mut self.state.lock());
                self.notify(SaveStatus::error(FailureKind::Create, &e));
                PersistOutcome::Failed
            }
        }
    }

    /// Caller holds the lane and has set `Saving`
    pub(crate) async fn run_update(&self, id: EntityId, patch: Vec<ChangeOf<K>>) -> PersistOutcome {
        self.notify(SaveStatus::Saving);
        tracing::debug!("[{}] updating {} ({} field(s))", K::NAME, id, patch.len());
        match self.gateway.update(id, &patch).await {
            Ok(entity) => {
                {
                    let mut st = self.state.lock();
                    st.draft.snapshot_after_save(&entity);
                    self.settle(&mut st);
                }
                tracing::info!("[{}] saved {}", K::NAME, id);
                self.notify(SaveStatus::Saved);
                PersistOutcome::Updated(id)
            }
            Err(e) => {
                // Local edits stay; the draft remains dirty for the next attempt.
                tracing::warn!(
                    "[{}] update of {} failed ({}): {}",
                    K::NAME,
                    id,
                    retry_hint(&e),
                    e
                );
                self.settle(&mut self.state.lock());
                self.notify(SaveStatus::error(FailureKind::Update, &e));
                PersistOutcome::Failed
            }
        }
    }

    /// Leave an in-flight state: `Dirty` if re-armed meanwhile, else `Idle`
    pub(crate) fn settle(&self, st: &mut PanelState<K>) {
        let next = if st.timer.is_armed() {
            SaveState::Dirty
        } else {
            SaveState::Idle
        };
        self.set_state(st, next);
    }

    pub(crate) fn set_state(&self, st: &mut PanelState<K>, next: SaveState) {
        if st.save_state != next {
            tracing::debug!("[{}] {} -> {}", K::NAME, st.save_state, next);
            st.save_state = next;
            self.state_tx.send_replace(next);
        }
    }

    pub(crate) fn notify(&self, status: SaveStatus) {
        self.notifier.notify(K::NAME, &status);
    }
}

/// Log label telling whether resending the same save may succeed
pub(crate) fn retry_hint(err: &PersistenceError) -> &'static str {
    if err.is_retryable() {
        "transient"
    } else {
        "rejected"
    }
}
