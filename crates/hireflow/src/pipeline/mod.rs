//! Hiring pipeline core: stage/action vocabulary, the canonical transition
//! table, the transition executor, the append-only audit trail, and the
//! read-only analytics derived from both.
//!
//! Legality of a transition is decided in exactly one place (the transition
//! table); the executor is the only component that writes candidate state,
//! and the audit log is write-once. Everything else reads.

pub mod analytics;
pub mod domain;
pub mod machine;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use analytics::{Bottleneck, PipelineAnalytics, DEFAULT_BOTTLENECK_THRESHOLD};
pub use domain::{Action, CandidateId, Stage};
pub use machine::{TableDefect, TransitionOutcome, TransitionTable, TransitionTarget};
pub use memory::{InMemoryAuditLog, InMemoryCandidateStore};
pub use repository::{
    AuditError, AuditLog, CandidateState, CandidateStore, StoreError, TransitionRecord,
};
pub use router::pipeline_router;
pub use service::{ActionOutcome, ActionRequest, PipelineError, PipelineService};
