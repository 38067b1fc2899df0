//! Per-subject assessment chain: collect → prompt → infer → validate → persist + audit.

use std::time::Duration;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::assessment::audit::{build_audit_entry, persist_with_audit};
use crate::assessment::contract::kit::validate_kit;
use crate::assessment::contract::likelihood::validate_likelihood;
use crate::assessment::contract::{Repair, Validated};
use crate::assessment::prompt_builder::{build_kit_prompt, build_likelihood_prompt};
use crate::assessment::ranking::{prompt_slice, rank_corpus, RankedItem};
use crate::assessment::signals::collect_signals;
use crate::errors::AppError;
use crate::llm_client::InferenceClient;
use crate::models::corpus::CorpusItem;
use crate::models::decision::{Decision, DecisionType, KitRecord, LikelihoodRecord};
use crate::models::signals::JobContext;
use crate::store::AssessmentStore;

/// Pipeline knobs taken from `Config`.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Ranked corpus items shown to the model.
    pub corpus_prompt_limit: usize,
    /// Subjects processed at once in a batch, 1..=5.
    pub batch_concurrency: usize,
    /// No new batch subject starts after this much time.
    pub batch_deadline: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            corpus_prompt_limit: 80,
            batch_concurrency: 3,
            batch_deadline: Duration::from_secs(240),
        }
    }
}

/// Collaborators for one pipeline run, borrowed from `AppState`.
#[derive(Clone, Copy)]
pub struct PipelineDeps<'a> {
    pub store: &'a dyn AssessmentStore,
    pub inference: &'a dyn InferenceClient,
    pub settings: &'a PipelineSettings,
}

/// Job-level inputs shared read-only by every subject of a run.
#[derive(Debug, Clone)]
pub struct JobInputs {
    pub job: JobContext,
    /// Full ranked corpus; empty for likelihood runs.
    pub ranked_corpus: Vec<RankedItem>,
}

/// Result of one completed subject.
#[derive(Debug, Clone)]
pub struct SubjectRun {
    pub decision: Decision,
    pub repairs: Vec<Repair>,
    pub fallback: bool,
}

pub async fn load_job(store: &dyn AssessmentStore, job_id: Uuid) -> Result<JobContext, AppError> {
    store
        .job_context(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

/// Ranked corpus for kit runs. An empty corpus is a 404: no kit can be built from nothing.
pub async fn load_ranked_corpus(
    store: &dyn AssessmentStore,
    job: &JobContext,
    decision_type: DecisionType,
) -> Result<Vec<RankedItem>, AppError> {
    if decision_type != DecisionType::InterviewKit {
        return Ok(Vec::new());
    }
    // Items not cleared for use are neither offered to the model nor used for backfill.
    let corpus: Vec<CorpusItem> = store
        .active_corpus()
        .await?
        .into_iter()
        .filter(|item| item.is_safe)
        .collect();
    if corpus.is_empty() {
        return Err(AppError::NotFound(
            "Question corpus has no usable items".to_string(),
        ));
    }
    Ok(rank_corpus(corpus, &job.department, &job.seniority))
}

/// Runs the full chain for one candidate and persists the result at `revision`.
pub async fn run_subject(
    deps: PipelineDeps<'_>,
    inputs: &JobInputs,
    decision_type: DecisionType,
    candidate_id: Uuid,
    actor_id: Uuid,
    revision: i32,
) -> Result<SubjectRun, AppError> {
    let job = &inputs.job;
    info!(
        candidate_id = %candidate_id,
        job_id = %job.id,
        decision_type = %decision_type,
        revision,
        "Assessing candidate"
    );

    let bundle = collect_signals(deps.store, candidate_id, job.id).await;

    let (decision, prompt, inference, repairs, fallback) = match decision_type {
        DecisionType::HireLikelihood => {
            let prompt = build_likelihood_prompt(job, &bundle);
            let inference = deps.inference.complete(&prompt.system, &prompt.user).await?;
            let outcome = validate_likelihood(&inference.raw_text, bundle.available_source_count());
            let fallback = outcome.is_fallback();
            let Validated { draft, repairs } = outcome.into_validated();

            let record = LikelihoodRecord {
                id: Uuid::new_v4(),
                candidate_id,
                job_id: job.id,
                revision,
                overall_score: draft.overall_score,
                band: draft.band,
                confidence: draft.confidence,
                dimensions: draft.dimensions,
                reasoning: draft.reasoning,
                model: inference.model.clone(),
                created_by: actor_id,
                created_at: Utc::now(),
            };
            (Decision::HireLikelihood(record), prompt, inference, repairs, fallback)
        }
        DecisionType::InterviewKit => {
            let slice = prompt_slice(&inputs.ranked_corpus, deps.settings.corpus_prompt_limit);
            let prompt = build_kit_prompt(job, &bundle, slice);
            let inference = deps.inference.complete(&prompt.system, &prompt.user).await?;
            let outcome = validate_kit(&inference.raw_text, &inputs.ranked_corpus);
            let fallback = outcome.is_fallback();
            let Validated { draft, repairs } = outcome.into_validated();

            let record = KitRecord {
                id: Uuid::new_v4(),
                candidate_id,
                job_id: job.id,
                revision,
                coverage_score: draft.coverage_score,
                priority: draft.priority,
                items: draft.items,
                reasoning: draft.reasoning,
                model: inference.model.clone(),
                created_by: actor_id,
                created_at: Utc::now(),
            };
            (Decision::InterviewKit(record), prompt, inference, repairs, fallback)
        }
    };

    let entry = build_audit_entry(
        &decision, job, &bundle, &prompt, &inference, &repairs, actor_id,
    );
    persist_with_audit(deps.store, &decision, &entry).await?;

    info!(
        candidate_id = %candidate_id,
        decision_id = %decision.id(),
        repairs = repairs.len(),
        fallback,
        latency_ms = inference.latency_ms,
        "Decision persisted"
    );

    Ok(SubjectRun {
        decision,
        repairs,
        fallback,
    })
}

/// Single-subject result as returned to the caller.
#[derive(Debug, Clone)]
pub struct SingleOutcome {
    pub decision: Decision,
    pub reused: bool,
    pub repairs: Vec<Repair>,
}

/// Single-subject entry point. Returns the current record unless `regenerate` is set, in
/// which case a new revision is inserted.
pub async fn assess_single(
    deps: PipelineDeps<'_>,
    job_id: Uuid,
    candidate_id: Uuid,
    decision_type: DecisionType,
    actor_id: Uuid,
    regenerate: bool,
) -> Result<SingleOutcome, AppError> {
    let job = load_job(deps.store, job_id).await?;

    let current = deps
        .store
        .current_decision(candidate_id, job_id, decision_type)
        .await?;
    let revision = match current {
        Some(existing) if !regenerate => {
            info!(
                candidate_id = %candidate_id,
                job_id = %job_id,
                revision = existing.revision(),
                "Reusing current decision"
            );
            return Ok(SingleOutcome {
                decision: existing,
                reused: true,
                repairs: Vec::new(),
            });
        }
        Some(existing) => existing.revision() + 1,
        None => 1,
    };

    let ranked_corpus = load_ranked_corpus(deps.store, &job, decision_type).await?;
    let inputs = JobInputs { job, ranked_corpus };
    let run = run_subject(deps, &inputs, decision_type, candidate_id, actor_id, revision).await?;

    Ok(SingleOutcome {
        decision: run.decision,
        reused: false,
        repairs: run.repairs,
    })
}
