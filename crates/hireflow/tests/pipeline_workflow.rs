//! End-to-end specifications for the hiring pipeline: a candidate walked
//! from registration to a terminal stage through the public service facade,
//! with the audit trail and analytics checked along the way.

use std::sync::Arc;

use hireflow::pipeline::{
    Action, ActionRequest, CandidateId, InMemoryAuditLog, InMemoryCandidateStore,
    PipelineAnalytics, PipelineError, PipelineService, Stage, TransitionTable,
};

type MemoryService = PipelineService<InMemoryCandidateStore, InMemoryAuditLog>;

fn build() -> (
    Arc<MemoryService>,
    PipelineAnalytics<InMemoryCandidateStore, InMemoryAuditLog>,
) {
    let table = Arc::new(TransitionTable::standard());
    let store = Arc::new(InMemoryCandidateStore::default());
    let audit = Arc::new(InMemoryAuditLog::default());
    let service = Arc::new(PipelineService::new(
        table.clone(),
        store.clone(),
        audit.clone(),
    ));
    let analytics = PipelineAnalytics::new(table, store, audit);
    (service, analytics)
}

fn perform(service: &MemoryService, id: &CandidateId, action: Action, by: &str) -> Stage {
    service
        .perform_action(ActionRequest::new(id.clone(), action, by))
        .unwrap_or_else(|err| panic!("{action:?} should succeed: {err}"))
        .stage
}

#[test]
fn candidate_walks_the_full_pipeline_to_hired() {
    let (service, analytics) = build();
    let id = CandidateId("cand-e2e-001".to_string());
    service.register(id.clone()).expect("registration");

    assert_eq!(perform(&service, &id, Action::Shortlist, "alice"), Stage::Screening);
    assert_eq!(
        perform(&service, &id, Action::ScheduleInterview, "alice"),
        Stage::InterviewScheduled
    );
    assert_eq!(
        perform(&service, &id, Action::StartInterview, "bob"),
        Stage::Interviewing
    );
    assert_eq!(
        perform(&service, &id, Action::CompleteInterview, "bob"),
        Stage::InterviewCompleted
    );
    assert_eq!(
        perform(&service, &id, Action::MoveToFinalReview, "carol"),
        Stage::FinalReview
    );
    assert_eq!(
        perform(&service, &id, Action::ExtendOffer, "carol"),
        Stage::OfferExtended
    );
    assert_eq!(
        perform(&service, &id, Action::OfferAccepted, "carol"),
        Stage::Hired
    );

    let (stage, actions) = service.available_actions(&id).expect("actions readable");
    assert_eq!(stage, Stage::Hired);
    assert!(actions.is_empty());

    let history = service.history(&id).expect("history readable");
    assert_eq!(history.len(), 7);
    assert_eq!(history.first().expect("first").from_stage, Stage::Applied);
    assert_eq!(history.last().expect("last").to_stage, Stage::Hired);
    for pair in history.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
        assert_eq!(pair[0].to_stage, pair[1].from_stage);
    }

    let summary = analytics.stage_summary().expect("summary computes");
    assert_eq!(summary[&Stage::Hired], 1);

    let rates = analytics.conversion_rates().expect("rates compute");
    assert_eq!(rates["offer_extended_to_hired"], 100.0);
}

#[test]
fn hold_detour_and_negotiation_branch() {
    let (service, _) = build();
    let id = CandidateId("cand-e2e-002".to_string());
    service.register(id.clone()).expect("registration");

    assert_eq!(perform(&service, &id, Action::Shortlist, "alice"), Stage::Screening);
    assert_eq!(perform(&service, &id, Action::PutOnHold, "alice"), Stage::OnHold);
    assert_eq!(perform(&service, &id, Action::Reactivate, "alice"), Stage::Screening);
    assert_eq!(
        perform(&service, &id, Action::ScheduleInterview, "alice"),
        Stage::InterviewScheduled
    );
    assert_eq!(
        perform(&service, &id, Action::StartInterview, "bob"),
        Stage::Interviewing
    );
    assert_eq!(
        perform(&service, &id, Action::CompleteInterview, "bob"),
        Stage::InterviewCompleted
    );
    assert_eq!(
        perform(&service, &id, Action::MoveToFinalReview, "carol"),
        Stage::FinalReview
    );
    assert_eq!(
        perform(&service, &id, Action::ExtendOffer, "carol"),
        Stage::OfferExtended
    );
    assert_eq!(
        perform(&service, &id, Action::StartNegotiation, "dave"),
        Stage::Negotiating
    );
    assert_eq!(
        perform(&service, &id, Action::OfferDeclined, "dave"),
        Stage::Rejected
    );

    match service.perform_action(ActionRequest::new(id, Action::Reactivate, "dave")) {
        Err(PipelineError::InvalidTransition { available, .. }) => assert!(available.is_empty()),
        other => panic!("terminal candidate accepted an action: {other:?}"),
    }
}

#[test]
fn metadata_and_notes_survive_the_audit_round_trip() {
    let (service, _) = build();
    let id = CandidateId("cand-e2e-003".to_string());
    service.register(id.clone()).expect("registration");

    let mut request = ActionRequest::new(id.clone(), Action::Shortlist, "alice");
    request.notes = Some("strong portfolio".to_string());
    request
        .metadata
        .insert("resume_score".to_string(), "87".to_string());
    service.perform_action(request).expect("shortlist succeeds");

    let history = service.history(&id).expect("history readable");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].notes.as_deref(), Some("strong portfolio"));
    assert_eq!(
        history[0].metadata.get("resume_score").map(String::as_str),
        Some("87")
    );
}
