use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for tracked candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a candidate currently sits in the hiring pipeline.
///
/// `Hired` and `Rejected` are terminal; every other stage has at least one
/// outgoing edge in the standard transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Applied,
    Screening,
    InterviewScheduled,
    Interviewing,
    InterviewCompleted,
    AdditionalInterview,
    FinalReview,
    OfferExtended,
    Negotiating,
    OnHold,
    Hired,
    Rejected,
}

impl Stage {
    pub const fn ordered() -> [Self; 12] {
        [
            Self::Applied,
            Self::Screening,
            Self::InterviewScheduled,
            Self::Interviewing,
            Self::InterviewCompleted,
            Self::AdditionalInterview,
            Self::FinalReview,
            Self::OfferExtended,
            Self::Negotiating,
            Self::OnHold,
            Self::Hired,
            Self::Rejected,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Screening => "Screening",
            Self::InterviewScheduled => "Interview Scheduled",
            Self::Interviewing => "Interviewing",
            Self::InterviewCompleted => "Interview Completed",
            Self::AdditionalInterview => "Additional Interview",
            Self::FinalReview => "Final Review",
            Self::OfferExtended => "Offer Extended",
            Self::Negotiating => "Negotiating",
            Self::OnHold => "On Hold",
            Self::Hired => "Hired",
            Self::Rejected => "Rejected",
        }
    }

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Screening => "screening",
            Self::InterviewScheduled => "interview_scheduled",
            Self::Interviewing => "interviewing",
            Self::InterviewCompleted => "interview_completed",
            Self::AdditionalInterview => "additional_interview",
            Self::FinalReview => "final_review",
            Self::OfferExtended => "offer_extended",
            Self::Negotiating => "negotiating",
            Self::OnHold => "on_hold",
            Self::Hired => "hired",
            Self::Rejected => "rejected",
        }
    }

    /// Position along the forward progression path used by conversion-rate
    /// analytics. `OnHold` and `Rejected` sit off-path and have no rank.
    pub const fn progression_rank(self) -> Option<u8> {
        match self {
            Self::Applied => Some(0),
            Self::Screening => Some(1),
            Self::InterviewScheduled => Some(2),
            Self::Interviewing => Some(3),
            Self::InterviewCompleted => Some(4),
            Self::AdditionalInterview => Some(5),
            Self::FinalReview => Some(6),
            Self::OfferExtended => Some(7),
            Self::Negotiating => Some(8),
            Self::Hired => Some(9),
            Self::OnHold | Self::Rejected => None,
        }
    }

    /// The main progression path reported by conversion analytics, in order.
    pub const fn progression() -> [Self; 8] {
        [
            Self::Applied,
            Self::Screening,
            Self::InterviewScheduled,
            Self::Interviewing,
            Self::InterviewCompleted,
            Self::FinalReview,
            Self::OfferExtended,
            Self::Hired,
        ]
    }
}

/// An operator- or system-initiated request to move a candidate.
///
/// `UpdateNotes` is a self-loop action: legal from every non-terminal stage,
/// never changes the stage, exists so annotations land in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Shortlist,
    Reject,
    RejectAfterScreening,
    RejectAfterInterview,
    ScheduleInterview,
    CancelInterview,
    StartInterview,
    CompleteInterview,
    RequestAdditionalInterview,
    MoveToFinalReview,
    ExtendOffer,
    StartNegotiation,
    OfferAccepted,
    OfferDeclined,
    PutOnHold,
    Reactivate,
    UpdateNotes,
}

impl Action {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shortlist => "Shortlist",
            Self::Reject => "Reject",
            Self::RejectAfterScreening => "Reject After Screening",
            Self::RejectAfterInterview => "Reject After Interview",
            Self::ScheduleInterview => "Schedule Interview",
            Self::CancelInterview => "Cancel Interview",
            Self::StartInterview => "Start Interview",
            Self::CompleteInterview => "Complete Interview",
            Self::RequestAdditionalInterview => "Request Additional Interview",
            Self::MoveToFinalReview => "Move to Final Review",
            Self::ExtendOffer => "Extend Offer",
            Self::StartNegotiation => "Start Negotiation",
            Self::OfferAccepted => "Offer Accepted",
            Self::OfferDeclined => "Offer Declined",
            Self::PutOnHold => "Put On Hold",
            Self::Reactivate => "Reactivate",
            Self::UpdateNotes => "Update Notes",
        }
    }

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Shortlist => "shortlist",
            Self::Reject => "reject",
            Self::RejectAfterScreening => "reject_after_screening",
            Self::RejectAfterInterview => "reject_after_interview",
            Self::ScheduleInterview => "schedule_interview",
            Self::CancelInterview => "cancel_interview",
            Self::StartInterview => "start_interview",
            Self::CompleteInterview => "complete_interview",
            Self::RequestAdditionalInterview => "request_additional_interview",
            Self::MoveToFinalReview => "move_to_final_review",
            Self::ExtendOffer => "extend_offer",
            Self::StartNegotiation => "start_negotiation",
            Self::OfferAccepted => "offer_accepted",
            Self::OfferDeclined => "offer_declined",
            Self::PutOnHold => "put_on_hold",
            Self::Reactivate => "reactivate",
            Self::UpdateNotes => "update_notes",
        }
    }

    /// Parse an action from its wire name, accepting the legacy aliases the
    /// previous tracker emitted. This is the only place alias spellings are
    /// recognized; the core works exclusively with the enum.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        let canonical = match normalized.as_str() {
            // legacy aliases
            "shortlist_candidate" => Self::Shortlist,
            "hold" => Self::PutOnHold,
            "resume" | "unhold" => Self::Reactivate,
            "accept_offer" => Self::OfferAccepted,
            "decline_offer" => Self::OfferDeclined,
            "add_note" => Self::UpdateNotes,
            _ => {
                return Self::all()
                    .into_iter()
                    .find(|action| action.wire_name() == normalized)
            }
        };
        Some(canonical)
    }

    pub const fn all() -> [Self; 17] {
        [
            Self::Shortlist,
            Self::Reject,
            Self::RejectAfterScreening,
            Self::RejectAfterInterview,
            Self::ScheduleInterview,
            Self::CancelInterview,
            Self::StartInterview,
            Self::CompleteInterview,
            Self::RequestAdditionalInterview,
            Self::MoveToFinalReview,
            Self::ExtendOffer,
            Self::StartNegotiation,
            Self::OfferAccepted,
            Self::OfferDeclined,
            Self::PutOnHold,
            Self::Reactivate,
            Self::UpdateNotes,
        ]
    }
}
