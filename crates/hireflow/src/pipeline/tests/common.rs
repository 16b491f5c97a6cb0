use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::pipeline::domain::{Action, CandidateId, Stage};
use crate::pipeline::machine::TransitionTable;
use crate::pipeline::memory::{InMemoryAuditLog, InMemoryCandidateStore};
use crate::pipeline::repository::{
    AuditError, AuditLog, CandidateState, CandidateStore, StoreError, TransitionRecord,
};
use crate::pipeline::service::{ActionOutcome, ActionRequest, PipelineError, PipelineService};

pub(super) type MemoryService = PipelineService<InMemoryCandidateStore, InMemoryAuditLog>;

pub(super) fn build_service() -> (
    Arc<MemoryService>,
    Arc<InMemoryCandidateStore>,
    Arc<InMemoryAuditLog>,
) {
    let table = Arc::new(TransitionTable::standard());
    let store = Arc::new(InMemoryCandidateStore::default());
    let audit = Arc::new(InMemoryAuditLog::default());
    let service = Arc::new(PipelineService::new(table, store.clone(), audit.clone()));
    (service, store, audit)
}

pub(super) fn candidate(id: &str) -> CandidateId {
    CandidateId(id.to_string())
}

pub(super) fn act<S, L>(
    service: &PipelineService<S, L>,
    id: &CandidateId,
    action: Action,
    performed_by: &str,
) -> Result<ActionOutcome, PipelineError>
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    service.perform_action(ActionRequest::new(id.clone(), action, performed_by))
}

/// Walk a registered candidate through a sequence of actions, panicking on
/// the first illegal step so test setup mistakes fail loudly.
pub(super) fn advance<S, L>(service: &PipelineService<S, L>, id: &CandidateId, actions: &[Action])
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    for action in actions {
        act(service, id, *action, "test-runner")
            .unwrap_or_else(|err| panic!("action {action:?} should be legal: {err}"));
    }
}

/// Candidate store that reports the backend as offline for every call.
pub(super) struct UnavailableStore;

impl CandidateStore for UnavailableStore {
    fn insert(&self, _state: CandidateState) -> Result<CandidateState, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &CandidateId) -> Result<Option<CandidateState>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn compare_and_swap(
        &self,
        _expected_stage: Stage,
        _state: CandidateState,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn list(&self) -> Result<Vec<CandidateState>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

/// Candidate store that loses the compare-and-swap race a fixed number of
/// times before letting writes through.
pub(super) struct ContendedStore {
    inner: InMemoryCandidateStore,
    conflicts_left: AtomicU32,
    cas_attempts: AtomicU32,
}

impl ContendedStore {
    pub(super) fn losing(races: u32) -> Self {
        Self {
            inner: InMemoryCandidateStore::default(),
            conflicts_left: AtomicU32::new(races),
            cas_attempts: AtomicU32::new(0),
        }
    }

    pub(super) fn cas_attempts(&self) -> u32 {
        self.cas_attempts.load(Ordering::SeqCst)
    }
}

impl CandidateStore for ContendedStore {
    fn insert(&self, state: CandidateState) -> Result<CandidateState, StoreError> {
        self.inner.insert(state)
    }

    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateState>, StoreError> {
        self.inner.fetch(id)
    }

    fn compare_and_swap(
        &self,
        expected_stage: Stage,
        state: CandidateState,
    ) -> Result<(), StoreError> {
        self.cas_attempts.fetch_add(1, Ordering::SeqCst);
        let lost = self
            .conflicts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Err(StoreError::Conflict);
        }
        self.inner.compare_and_swap(expected_stage, state)
    }

    fn list(&self) -> Result<Vec<CandidateState>, StoreError> {
        self.inner.list()
    }
}

/// Candidate store whose first write loses to a rival rejection, so the
/// retry sees the stage the rival left behind.
#[derive(Default)]
pub(super) struct RacingStore {
    inner: InMemoryCandidateStore,
    raced: AtomicBool,
}

impl CandidateStore for RacingStore {
    fn insert(&self, state: CandidateState) -> Result<CandidateState, StoreError> {
        self.inner.insert(state)
    }

    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateState>, StoreError> {
        self.inner.fetch(id)
    }

    fn compare_and_swap(
        &self,
        expected_stage: Stage,
        state: CandidateState,
    ) -> Result<(), StoreError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let rival = CandidateState {
                current_stage: Stage::Rejected,
                stage_before_hold: None,
                ..state
            };
            self.inner.compare_and_swap(expected_stage, rival)?;
            return Err(StoreError::Conflict);
        }
        self.inner.compare_and_swap(expected_stage, state)
    }

    fn list(&self) -> Result<Vec<CandidateState>, StoreError> {
        self.inner.list()
    }
}

/// Audit log that rejects every append, for divergence scenarios.
#[derive(Default)]
pub(super) struct FailingAuditLog;

impl AuditLog for FailingAuditLog {
    fn append(&self, _record: TransitionRecord) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit offline".to_string()))
    }

    fn for_candidate(&self, _id: &CandidateId) -> Result<Vec<TransitionRecord>, AuditError> {
        Ok(Vec::new())
    }

    fn recent(&self, _limit: usize) -> Result<Vec<TransitionRecord>, AuditError> {
        Ok(Vec::new())
    }
}
