use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Action, CandidateId, Stage};

/// Per-candidate pipeline state. `current_stage` is owned exclusively by the
/// transition executor; nothing else writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateState {
    pub id: CandidateId,
    pub current_stage: Stage,
    /// Stage the candidate occupied immediately before entering `OnHold`.
    /// Populated on hold, cleared on any transition out of it.
    pub stage_before_hold: Option<Stage>,
    pub last_action_at: DateTime<Utc>,
}

impl CandidateState {
    /// Newly registered candidates always start at `Applied`.
    pub fn new(id: CandidateId, registered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            current_stage: Stage::Applied,
            stage_before_hold: None,
            last_action_at: registered_at,
        }
    }
}

/// Immutable audit entry describing one executed transition. Appended
/// exactly once per successful `perform_action`, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub candidate_id: CandidateId,
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub action: Action,
    pub performed_by: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Storage abstraction for candidate pipeline state, so the executor and
/// analytics can be exercised against any backend.
pub trait CandidateStore: Send + Sync {
    fn insert(&self, state: CandidateState) -> Result<CandidateState, StoreError>;
    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateState>, StoreError>;
    /// Write `state` only if the candidate's stored stage still equals
    /// `expected_stage`; `Conflict` otherwise. This is what serializes
    /// concurrent transitions on the same candidate.
    fn compare_and_swap(
        &self,
        expected_stage: Stage,
        state: CandidateState,
    ) -> Result<(), StoreError>;
    fn list(&self) -> Result<Vec<CandidateState>, StoreError>;
}

/// Error enumeration for candidate store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("candidate record already exists")]
    AlreadyExists,
    #[error("candidate record not found")]
    NotFound,
    #[error("stage changed concurrently")]
    Conflict,
    #[error("candidate store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only transition history. Plain appends are not deduplicated;
/// callers that need idempotence supply an idempotency key on the record.
pub trait AuditLog: Send + Sync {
    fn append(&self, record: TransitionRecord) -> Result<(), AuditError>;
    /// All records for one candidate, oldest first.
    fn for_candidate(&self, id: &CandidateId) -> Result<Vec<TransitionRecord>, AuditError>;
    /// The most recent records across all candidates, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<TransitionRecord>, AuditError>;
}

/// Audit backend failure.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log unavailable: {0}")]
    Unavailable(String),
}
