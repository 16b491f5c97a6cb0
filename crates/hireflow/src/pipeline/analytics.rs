use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use super::domain::{CandidateId, Stage};
use super::machine::TransitionTable;
use super::repository::{AuditLog, CandidateStore, TransitionRecord};
use super::service::PipelineError;

/// Share of active candidates above which a stage is flagged as a
/// bottleneck, in percent.
pub const DEFAULT_BOTTLENECK_THRESHOLD: f64 = 40.0;

/// A stage holding a disproportionate share of currently active candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bottleneck {
    pub stage: Stage,
    pub count: usize,
    pub percentage: f64,
}

/// Read-only aggregation over candidate states and the audit log. Never
/// writes, and never consults the transition executor.
pub struct PipelineAnalytics<S, L> {
    table: Arc<TransitionTable>,
    store: Arc<S>,
    audit: Arc<L>,
}

impl<S, L> PipelineAnalytics<S, L>
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

    /// Count of candidates currently in each stage; every stage is present
    /// so dashboards render zeros rather than missing rows.
    pub fn stage_summary(&self) -> Result<BTreeMap<Stage, usize>, PipelineError> {
        let mut summary: BTreeMap<Stage, usize> =
            Stage::ordered().into_iter().map(|stage| (stage, 0)).collect();
        for state in self.store.list()? {
            *summary.entry(state.current_stage).or_default() += 1;
        }
        Ok(summary)
    }

    /// Conversion percentage for each adjacent pair on the progression path,
    /// keyed `"{from}_to_{to}"`. The numerator counts candidates currently
    /// at or past the destination stage; the denominator counts candidates
    /// that ever reached the source stage. Zero denominator yields 0.
    pub fn conversion_rates(&self) -> Result<BTreeMap<String, f64>, PipelineError> {
        let states = self.store.list()?;
        let reached = self.reached_stages()?;

        let mut rates = BTreeMap::new();
        let path = Stage::progression();
        for pair in path.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let denominator = if from == Stage::Applied {
                // Registration itself places every candidate at Applied.
                states.len()
            } else {
                states
                    .iter()
                    .filter(|state| {
                        reached
                            .get(&state.id)
                            .is_some_and(|stages| stages.contains(&from))
                    })
                    .count()
            };

            let to_rank = to
                .progression_rank()
                .unwrap_or(u8::MAX);
            let numerator = states
                .iter()
                .filter(|state| {
                    state
                        .current_stage
                        .progression_rank()
                        .is_some_and(|rank| rank >= to_rank)
                })
                .count();

            let percentage = if denominator == 0 {
                0.0
            } else {
                (numerator.min(denominator) as f64 / denominator as f64) * 100.0
            };
            rates.insert(
                format!("{}_to_{}", from.wire_name(), to.wire_name()),
                percentage,
            );
        }
        Ok(rates)
    }

    /// Stages holding more than `threshold` percent of the currently active
    /// (non-terminal) candidates. Terminal stages are never flagged.
    pub fn bottlenecks(&self, threshold: f64) -> Result<Vec<Bottleneck>, PipelineError> {
        let summary = self.stage_summary()?;
        let active_total: usize = summary
            .iter()
            .filter(|(stage, _)| !self.table.is_terminal(**stage))
            .map(|(_, count)| *count)
            .sum();
        if active_total == 0 {
            return Ok(Vec::new());
        }

        let mut flagged = Vec::new();
        for (stage, count) in summary {
            if self.table.is_terminal(stage) || count == 0 {
                continue;
            }
            let percentage = (count as f64 / active_total as f64) * 100.0;
            if percentage > threshold {
                flagged.push(Bottleneck {
                    stage,
                    count,
                    percentage,
                });
            }
        }
        flagged.sort_by(|a, b| {
            b.percentage
                .partial_cmp(&a.percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(flagged)
    }

    /// The most recent transitions across all candidates, newest first.
    /// Display-only view over the audit log.
    pub fn recent_transitions(&self, limit: usize) -> Result<Vec<TransitionRecord>, PipelineError> {
        self.audit.recent(limit).map_err(PipelineError::Audit)
    }

    /// Stages each candidate has ever reached, derived from audit history.
    fn reached_stages(&self) -> Result<BTreeMap<CandidateId, BTreeSet<Stage>>, PipelineError> {
        let mut reached: BTreeMap<CandidateId, BTreeSet<Stage>> = BTreeMap::new();
        for record in self
            .audit
            .recent(usize::MAX)
            .map_err(PipelineError::Audit)?
        {
            reached
                .entry(record.candidate_id.clone())
                .or_default()
                .insert(record.to_stage);
        }
        Ok(reached)
    }
}
