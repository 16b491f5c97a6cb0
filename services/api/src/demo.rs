use std::sync::Arc;

use clap::Args;

use hireflow::error::AppError;
use hireflow::pipeline::{
    Action, ActionRequest, CandidateId, InMemoryAuditLog, InMemoryCandidateStore,
    PipelineAnalytics, PipelineService, TransitionTable, DEFAULT_BOTTLENECK_THRESHOLD,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Recruiter name recorded as the performer of every demo transition
    #[arg(long, default_value = "demo-recruiter")]
    pub(crate) performed_by: String,
    /// Bottleneck threshold (percent of active candidates) for the summary
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
}

type MemoryService = PipelineService<InMemoryCandidateStore, InMemoryAuditLog>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let table = Arc::new(TransitionTable::standard());
    let store = Arc::new(InMemoryCandidateStore::default());
    let audit = Arc::new(InMemoryAuditLog::default());
    let service = PipelineService::new(table.clone(), store.clone(), audit.clone());
    let analytics = PipelineAnalytics::new(table, store, audit);

    println!("== Hiring pipeline demo ==");

    // A full journey to Hired, a stalled screen, and an early rejection so
    // the analytics section has something to report.
    walk(
        &service,
        "cand-1001",
        &args.performed_by,
        &[
            Action::Shortlist,
            Action::ScheduleInterview,
            Action::StartInterview,
            Action::CompleteInterview,
            Action::MoveToFinalReview,
            Action::ExtendOffer,
            Action::OfferAccepted,
        ],
    )?;
    walk(&service, "cand-1002", &args.performed_by, &[Action::Shortlist])?;
    walk(&service, "cand-1003", &args.performed_by, &[Action::Shortlist])?;
    walk(&service, "cand-1004", &args.performed_by, &[Action::Reject])?;

    println!("\n-- Transition history: cand-1001 --");
    for record in service.history(&CandidateId("cand-1001".to_string()))? {
        println!(
            "  {}  {} -> {}  via {} ({})",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.from_stage.label(),
            record.to_stage.label(),
            record.action.label(),
            record.performed_by,
        );
    }

    println!("\n-- Stage summary --");
    for (stage, count) in analytics.stage_summary()? {
        if count > 0 {
            println!("  {:<22} {}", stage.label(), count);
        }
    }

    println!("\n-- Conversion rates --");
    for (edge, rate) in analytics.conversion_rates()? {
        println!("  {:<42} {:>6.1}%", edge, rate);
    }

    let threshold = args.threshold.unwrap_or(DEFAULT_BOTTLENECK_THRESHOLD);
    println!("\n-- Bottlenecks (> {threshold:.0}% of active candidates) --");
    let flagged = analytics.bottlenecks(threshold)?;
    if flagged.is_empty() {
        println!("  none");
    } else {
        for bottleneck in flagged {
            println!(
                "  {:<22} {} candidates ({:.1}%)",
                bottleneck.stage.label(),
                bottleneck.count,
                bottleneck.percentage,
            );
        }
    }

    Ok(())
}

fn walk(
    service: &MemoryService,
    candidate: &str,
    performed_by: &str,
    actions: &[Action],
) -> Result<(), AppError> {
    let id = CandidateId(candidate.to_string());
    service.register(id.clone())?;
    println!("\nregistered {candidate} at Applied");
    for action in actions {
        let outcome = service.perform_action(ActionRequest::new(id.clone(), *action, performed_by))?;
        println!(
            "  {:<28} -> {}",
            action.label(),
            outcome.stage.label()
        );
    }
    Ok(())
}
