//! Batch Orchestrator — scores every not-yet-decided candidate in a job's pool.
//!
//! Subjects run through a bounded worker pool. A failure for one subject is recorded as its
//! outcome and never aborts the batch. Outcomes are collected as `(subject, outcome)` pairs
//! and reduced into counts at the end.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assessment::pipeline::{
    load_job, load_ranked_corpus, run_subject, JobInputs, PipelineDeps,
};
use crate::errors::AppError;
use crate::models::decision::DecisionType;

const MAX_CONCURRENCY: usize = 5;

/// Stops new subjects from starting once the deadline passes. In-flight subjects finish.
#[derive(Debug, Clone, Copy)]
pub struct CancellationToken {
    deadline: Instant,
}

impl CancellationToken {
    pub fn with_deadline_from_now(budget: std::time::Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubjectOutcome {
    Processed { decision_id: Uuid, fallback: bool },
    Skipped { reason: String },
    Failed { error: String },
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub cancelled: usize,
    pub outcomes: Vec<(Uuid, SubjectOutcome)>,
}

impl BatchSummary {
    /// `already_decided` pool members count as skipped without an outcome of their own.
    pub fn from_outcomes(already_decided: usize, outcomes: Vec<(Uuid, SubjectOutcome)>) -> Self {
        let mut summary = BatchSummary {
            skipped: already_decided,
            ..Default::default()
        };
        for (_, outcome) in &outcomes {
            match outcome {
                SubjectOutcome::Processed { .. } => summary.processed += 1,
                SubjectOutcome::Skipped { .. } => summary.skipped += 1,
                SubjectOutcome::Failed { .. } => summary.errors += 1,
                SubjectOutcome::Cancelled => summary.cancelled += 1,
            }
        }
        summary.outcomes = outcomes;
        summary
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchReport {
    /// The job has no candidates with prior signals.
    NoSubjects,
    Completed(BatchSummary),
}

/// Order-preserving dedup of the candidate pool.
fn dedup_pool(pool: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    pool.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Runs one decision type across the job's pool. Only job-level problems (unknown job, empty
/// corpus, unreadable pool) fail the whole call.
pub async fn run_batch(
    deps: PipelineDeps<'_>,
    job_id: Uuid,
    decision_type: DecisionType,
    actor_id: Uuid,
) -> Result<BatchReport, AppError> {
    let job = load_job(deps.store, job_id).await?;

    let pool = dedup_pool(deps.store.candidate_pool(job_id).await?);
    if pool.is_empty() {
        info!(job_id = %job_id, decision_type = %decision_type, "No subjects in pool");
        return Ok(BatchReport::NoSubjects);
    }

    let already = deps.store.decided_candidates(job_id, decision_type).await?;
    let (done, to_process): (Vec<Uuid>, Vec<Uuid>) =
        pool.into_iter().partition(|id| already.contains(id));

    if to_process.is_empty() {
        info!(job_id = %job_id, skipped = done.len(), "Every subject already decided");
        return Ok(BatchReport::Completed(BatchSummary::from_outcomes(
            done.len(),
            Vec::new(),
        )));
    }

    let ranked_corpus = load_ranked_corpus(deps.store, &job, decision_type).await?;
    let inputs = JobInputs { job, ranked_corpus };
    let token = CancellationToken::with_deadline_from_now(deps.settings.batch_deadline);
    let concurrency = deps.settings.batch_concurrency.clamp(1, MAX_CONCURRENCY);

    info!(
        job_id = %job_id,
        decision_type = %decision_type,
        to_process = to_process.len(),
        already_decided = done.len(),
        concurrency,
        "Starting batch"
    );

    let inputs = &inputs;
    let outcomes: Vec<(Uuid, SubjectOutcome)> = stream::iter(to_process)
        .map(move |candidate_id| async move {
            if token.is_cancelled() {
                return (candidate_id, SubjectOutcome::Cancelled);
            }
            // New candidates always start at revision 1; losing that insert to a concurrent
            // run is a skip, not a failure.
            let outcome =
                match run_subject(deps, inputs, decision_type, candidate_id, actor_id, 1).await {
                    Ok(run) => SubjectOutcome::Processed {
                        decision_id: run.decision.id(),
                        fallback: run.fallback,
                    },
                    Err(AppError::Conflict(reason)) => SubjectOutcome::Skipped { reason },
                    Err(e) => {
                        warn!(candidate_id = %candidate_id, "Subject failed: {e}");
                        SubjectOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
            (candidate_id, outcome)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let summary = BatchSummary::from_outcomes(done.len(), outcomes);
    info!(
        job_id = %job_id,
        processed = summary.processed,
        skipped = summary.skipped,
        errors = summary.errors,
        cancelled = summary.cancelled,
        "Batch finished"
    );
    Ok(BatchReport::Completed(summary))
}
