use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Action, CandidateId, Stage};
use super::machine::{TransitionOutcome, TransitionTable};
use super::repository::{
    AuditError, AuditLog, CandidateState, CandidateStore, StoreError, TransitionRecord,
};

/// Bounded retry for compare-and-swap conflicts; a conflict surviving these
/// attempts surfaces as a storage error for the caller to retry with backoff.
const CAS_RETRY_LIMIT: u32 = 3;

/// One requested transition, as received from the transport boundary.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub candidate_id: CandidateId,
    pub action: Action,
    pub performed_by: String,
    pub notes: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub idempotency_key: Option<String>,
}

impl ActionRequest {
    pub fn new(candidate_id: CandidateId, action: Action, performed_by: impl Into<String>) -> Self {
        Self {
            candidate_id,
            action,
            performed_by: performed_by.into(),
            notes: None,
            metadata: BTreeMap::new(),
            idempotency_key: None,
        }
    }
}

/// Result of a successful `perform_action`.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub candidate_id: CandidateId,
    pub from_stage: Stage,
    pub stage: Stage,
    pub stage_changed: bool,
    pub available_actions: Vec<Action>,
}

/// Error raised by the pipeline service.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("candidate {0} not found")]
    NotFound(CandidateId),
    #[error("candidate {0} is already registered")]
    AlreadyRegistered(CandidateId),
    #[error("action {action:?} is not legal from stage {stage:?}")]
    InvalidTransition {
        stage: Stage,
        action: Action,
        available: Vec<Action>,
    },
    /// The stage write and the audit append diverged; the two pieces of
    /// state need reconciliation, so this is kept distinct from ordinary
    /// validation and availability failures.
    #[error(
        "stage updated but audit append failed for candidate {candidate_id} \
         ({from_stage:?} -> {to_stage:?} via {action:?}): {detail}"
    )]
    PartialFailure {
        candidate_id: CandidateId,
        from_stage: Stage,
        to_stage: Stage,
        action: Action,
        timestamp: DateTime<Utc>,
        detail: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Audit(AuditError),
}

/// The transition executor: the only component that mutates candidate state.
///
/// Generic over the storage collaborators so one engine serves any backend.
pub struct PipelineService<S, L> {
    table: Arc<TransitionTable>,
    store: Arc<S>,
    audit: Arc<L>,
}

impl<S, L> PipelineService<S, L>
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    pub fn new(table: Arc<TransitionTable>, store: Arc<S>, audit: Arc<L>) -> Self {
        Self {
            table,
            store,
            audit,
        }
    }

    /// Register a candidate at the default `Applied` stage.
    pub fn register(&self, candidate_id: CandidateId) -> Result<CandidateState, PipelineError> {
        let state = CandidateState::new(candidate_id.clone(), Utc::now());
        match self.store.insert(state) {
            Ok(stored) => Ok(stored),
            Err(StoreError::AlreadyExists) => Err(PipelineError::AlreadyRegistered(candidate_id)),
            Err(other) => Err(PipelineError::Store(other)),
        }
    }

    /// Current stage plus the actions legal from it.
    pub fn available_actions(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<(Stage, Vec<Action>), PipelineError> {
        let state = self.load(candidate_id)?;
        let actions = self.table.available_actions(state.current_stage);
        Ok((state.current_stage, actions))
    }

    /// Full transition history for a candidate, oldest first.
    pub fn history(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<Vec<TransitionRecord>, PipelineError> {
        self.load(candidate_id)?;
        self.audit
            .for_candidate(candidate_id)
            .map_err(PipelineError::Audit)
    }

    /// Execute one transition end-to-end: validate the action against the
    /// current stage, resolve the destination, write the new stage under a
    /// compare-and-swap keyed on the stage that was validated, and append
    /// the audit record. Self-loop actions skip the write but still append,
    /// so notes and metadata are preserved.
    pub fn perform_action(&self, request: ActionRequest) -> Result<ActionOutcome, PipelineError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_perform(&request) {
                Err(PipelineError::Store(StoreError::Conflict)) if attempt < CAS_RETRY_LIMIT => {
                    // Another transition for this candidate won the race;
                    // re-validate against the fresh stage.
                    continue;
                }
                other => return other,
            }
        }
    }

    fn try_perform(&self, request: &ActionRequest) -> Result<ActionOutcome, PipelineError> {
        let state = self.load(&request.candidate_id)?;
        let from_stage = state.current_stage;

        let outcome = self.table.outcome(from_stage, request.action).ok_or_else(|| {
            PipelineError::InvalidTransition {
                stage: from_stage,
                action: request.action,
                available: self.table.available_actions(from_stage),
            }
        })?;

        let to_stage = match outcome {
            TransitionOutcome::Move(next) => next,
            TransitionOutcome::Stay => from_stage,
            TransitionOutcome::ReturnToPriorStage => self.resolve_prior_stage(&state)?,
        };

        let timestamp = Utc::now();
        if to_stage != from_stage {
            let new_state = CandidateState {
                id: state.id.clone(),
                current_stage: to_stage,
                stage_before_hold: (to_stage == Stage::OnHold).then_some(from_stage),
                last_action_at: timestamp,
            };
            self.store.compare_and_swap(from_stage, new_state)?;
        }

        let record = TransitionRecord {
            candidate_id: request.candidate_id.clone(),
            from_stage,
            to_stage,
            action: request.action,
            performed_by: request.performed_by.clone(),
            timestamp,
            notes: request.notes.clone(),
            metadata: request.metadata.clone(),
            idempotency_key: request.idempotency_key.clone(),
        };

        if let Err(source) = self.audit.append(record) {
            if to_stage != from_stage {
                warn!(
                    candidate = %request.candidate_id,
                    from = from_stage.wire_name(),
                    to = to_stage.wire_name(),
                    "audit append failed after stage write"
                );
                return Err(PipelineError::PartialFailure {
                    candidate_id: request.candidate_id.clone(),
                    from_stage,
                    to_stage,
                    action: request.action,
                    timestamp,
                    detail: source.to_string(),
                });
            }
            return Err(PipelineError::Audit(source));
        }

        info!(
            candidate = %request.candidate_id,
            action = request.action.wire_name(),
            from = from_stage.wire_name(),
            to = to_stage.wire_name(),
            performed_by = %request.performed_by,
            "pipeline transition recorded"
        );

        Ok(ActionOutcome {
            candidate_id: request.candidate_id.clone(),
            from_stage,
            stage: to_stage,
            stage_changed: to_stage != from_stage,
            available_actions: self.table.available_actions(to_stage),
        })
    }

    /// Destination of the `Reactivate` edge. The stage held before the hold
    /// is stored on the candidate; records written before that field existed
    /// fall back to the newest audit entry that entered `OnHold`.
    fn resolve_prior_stage(&self, state: &CandidateState) -> Result<Stage, PipelineError> {
        if let Some(prior) = state.stage_before_hold {
            return Ok(prior);
        }

        let history = self
            .audit
            .for_candidate(&state.id)
            .map_err(PipelineError::Audit)?;
        history
            .iter()
            .rev()
            .find(|record| record.to_stage == Stage::OnHold)
            .map(|record| record.from_stage)
            .ok_or_else(|| PipelineError::InvalidTransition {
                stage: state.current_stage,
                action: Action::Reactivate,
                available: self.table.available_actions(state.current_stage),
            })
    }

    fn load(&self, candidate_id: &CandidateId) -> Result<CandidateState, PipelineError> {
        self.store
            .fetch(candidate_id)?
            .ok_or_else(|| PipelineError::NotFound(candidate_id.clone()))
    }
}
