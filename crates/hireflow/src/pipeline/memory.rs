use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::domain::{CandidateId, Stage};
use super::repository::{
    AuditError, AuditLog, CandidateState, CandidateStore, StoreError, TransitionRecord,
};

/// Mutex-guarded candidate store for the API default wiring, the demo, and
/// tests.
#[derive(Default, Clone)]
pub struct InMemoryCandidateStore {
    records: Arc<Mutex<HashMap<CandidateId, CandidateState>>>,
}

impl CandidateStore for InMemoryCandidateStore {
    fn insert(&self, state: CandidateState) -> Result<CandidateState, StoreError> {
        let mut guard = self.records.lock().expect("candidate store mutex poisoned");
        if guard.contains_key(&state.id) {
            return Err(StoreError::AlreadyExists);
        }
        guard.insert(state.id.clone(), state.clone());
        Ok(state)
    }

    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateState>, StoreError> {
        let guard = self.records.lock().expect("candidate store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn compare_and_swap(
        &self,
        expected_stage: Stage,
        state: CandidateState,
    ) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("candidate store mutex poisoned");
        let current = guard.get(&state.id).ok_or(StoreError::NotFound)?;
        if current.current_stage != expected_stage {
            return Err(StoreError::Conflict);
        }
        guard.insert(state.id.clone(), state);
        Ok(())
    }

    fn list(&self) -> Result<Vec<CandidateState>, StoreError> {
        let guard = self.records.lock().expect("candidate store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

/// Append-only in-memory audit log with idempotency-key deduplication.
#[derive(Default, Clone)]
pub struct InMemoryAuditLog {
    inner: Arc<Mutex<AuditInner>>,
}

#[derive(Default)]
struct AuditInner {
    records: Vec<TransitionRecord>,
    seen_keys: HashSet<String>,
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, record: TransitionRecord) -> Result<(), AuditError> {
        let mut guard = self.inner.lock().expect("audit log mutex poisoned");
        if let Some(key) = &record.idempotency_key {
            if !guard.seen_keys.insert(key.clone()) {
                return Ok(());
            }
        }
        guard.records.push(record);
        Ok(())
    }

    fn for_candidate(&self, id: &CandidateId) -> Result<Vec<TransitionRecord>, AuditError> {
        let guard = self.inner.lock().expect("audit log mutex poisoned");
        let mut records: Vec<TransitionRecord> = guard
            .records
            .iter()
            .filter(|record| &record.candidate_id == id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(records)
    }

    fn recent(&self, limit: usize) -> Result<Vec<TransitionRecord>, AuditError> {
        let guard = self.inner.lock().expect("audit log mutex poisoned");
        let mut records: Vec<TransitionRecord> = guard.records.clone();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }
}
