use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::domain::{Action, Stage};

/// Where an edge in the transition table leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTarget {
    /// Move the candidate to a statically known stage.
    To(Stage),
    /// Legal action that leaves the stage untouched (annotation actions).
    Unchanged,
    /// Return to whatever stage preceded `OnHold`; resolved by the executor
    /// from candidate state or the audit trail.
    PriorStage,
}

/// The outcome of evaluating one (stage, action) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Move(Stage),
    Stay,
    ReturnToPriorStage,
}

/// Structural defect detected by [`TransitionTable::validate`].
#[derive(Debug, thiserror::Error)]
pub enum TableDefect {
    #[error("non-terminal stage {0:?} has no outgoing transitions")]
    MissingOutgoing(Stage),
    #[error("stage {0:?} is not reachable from Applied")]
    Unreachable(Stage),
}

/// The declarative map from (current stage, action) to a resulting stage.
///
/// Built once at startup, immutable afterwards, and shared by reference; the
/// map is a function, so a (stage, action) pair can never resolve to more
/// than one target. This is the single source of truth for legality — no
/// other component re-derives which transitions are allowed.
#[derive(Debug)]
pub struct TransitionTable {
    edges: BTreeMap<(Stage, Action), TransitionTarget>,
}

impl TransitionTable {
    /// The standard hiring pipeline table.
    pub fn standard() -> Self {
        use Action::*;
        use Stage::*;

        let mut table = Self {
            edges: BTreeMap::new(),
        };

        table.edge(Applied, Shortlist, TransitionTarget::To(Screening));
        table.edge(Applied, Reject, TransitionTarget::To(Rejected));
        table.edge(Applied, PutOnHold, TransitionTarget::To(OnHold));

        table.edge(
            Screening,
            ScheduleInterview,
            TransitionTarget::To(InterviewScheduled),
        );
        table.edge(Screening, RejectAfterScreening, TransitionTarget::To(Rejected));
        table.edge(Screening, PutOnHold, TransitionTarget::To(OnHold));

        table.edge(
            InterviewScheduled,
            StartInterview,
            TransitionTarget::To(Interviewing),
        );
        table.edge(
            InterviewScheduled,
            CancelInterview,
            TransitionTarget::To(Screening),
        );
        table.edge(InterviewScheduled, Reject, TransitionTarget::To(Rejected));
        table.edge(InterviewScheduled, PutOnHold, TransitionTarget::To(OnHold));

        table.edge(
            Interviewing,
            CompleteInterview,
            TransitionTarget::To(InterviewCompleted),
        );

        table.edge(
            InterviewCompleted,
            RequestAdditionalInterview,
            TransitionTarget::To(AdditionalInterview),
        );
        table.edge(
            InterviewCompleted,
            MoveToFinalReview,
            TransitionTarget::To(FinalReview),
        );
        table.edge(
            InterviewCompleted,
            RejectAfterInterview,
            TransitionTarget::To(Rejected),
        );

        table.edge(
            AdditionalInterview,
            ScheduleInterview,
            TransitionTarget::To(InterviewScheduled),
        );
        table.edge(
            AdditionalInterview,
            MoveToFinalReview,
            TransitionTarget::To(FinalReview),
        );
        table.edge(
            AdditionalInterview,
            RejectAfterInterview,
            TransitionTarget::To(Rejected),
        );

        table.edge(FinalReview, ExtendOffer, TransitionTarget::To(OfferExtended));
        table.edge(FinalReview, Reject, TransitionTarget::To(Rejected));
        table.edge(FinalReview, PutOnHold, TransitionTarget::To(OnHold));

        table.edge(OfferExtended, OfferAccepted, TransitionTarget::To(Hired));
        table.edge(OfferExtended, OfferDeclined, TransitionTarget::To(Rejected));
        table.edge(
            OfferExtended,
            StartNegotiation,
            TransitionTarget::To(Negotiating),
        );

        table.edge(Negotiating, OfferAccepted, TransitionTarget::To(Hired));
        table.edge(Negotiating, OfferDeclined, TransitionTarget::To(Rejected));

        table.edge(OnHold, Reactivate, TransitionTarget::PriorStage);
        table.edge(OnHold, Reject, TransitionTarget::To(Rejected));

        // Annotation self-loop from every non-terminal stage.
        for stage in Stage::ordered() {
            if !matches!(stage, Hired | Rejected) {
                table.edge(stage, UpdateNotes, TransitionTarget::Unchanged);
            }
        }

        table
    }

    fn edge(&mut self, from: Stage, action: Action, target: TransitionTarget) {
        self.edges.insert((from, action), target);
    }

    /// All actions with an outgoing edge from `stage`, in stable order.
    /// Empty for terminal stages.
    pub fn available_actions(&self, stage: Stage) -> Vec<Action> {
        self.edges
            .range((stage, Action::Shortlist)..=(stage, Action::UpdateNotes))
            .map(|((_, action), _)| *action)
            .collect()
    }

    /// The sole legality check in the system: `None` means the transition is
    /// not defined and must be rejected.
    pub fn outcome(&self, stage: Stage, action: Action) -> Option<TransitionOutcome> {
        self.edges.get(&(stage, action)).map(|target| match target {
            TransitionTarget::To(next) => TransitionOutcome::Move(*next),
            TransitionTarget::Unchanged => TransitionOutcome::Stay,
            TransitionTarget::PriorStage => TransitionOutcome::ReturnToPriorStage,
        })
    }

    /// A stage is terminal when it has no outgoing edges.
    pub fn is_terminal(&self, stage: Stage) -> bool {
        self.available_actions(stage).is_empty()
    }

    /// Check the structural invariants: every non-terminal stage has at
    /// least one outgoing edge, and every stage is reachable from `Applied`.
    pub fn validate(&self) -> Result<(), TableDefect> {
        for stage in Stage::ordered() {
            if !matches!(stage, Stage::Hired | Stage::Rejected)
                && self.available_actions(stage).is_empty()
            {
                return Err(TableDefect::MissingOutgoing(stage));
            }
        }

        let mut reachable = BTreeSet::new();
        let mut frontier = VecDeque::from([Stage::Applied]);
        reachable.insert(Stage::Applied);
        while let Some(stage) = frontier.pop_front() {
            for action in self.available_actions(stage) {
                let next = match self.outcome(stage, action) {
                    Some(TransitionOutcome::Move(next)) => next,
                    // Prior-stage edges only lead back to already visited
                    // stages; self-loops add nothing.
                    Some(TransitionOutcome::Stay | TransitionOutcome::ReturnToPriorStage)
                    | None => continue,
                };
                if reachable.insert(next) {
                    frontier.push_back(next);
                }
            }
        }

        for stage in Stage::ordered() {
            if !reachable.contains(&stage) {
                return Err(TableDefect::Unreachable(stage));
            }
        }

        Ok(())
    }
}
