//! Persistence & Audit Writer.
//!
//! Summaries are built from the exact bundle, prompt, inference result and validated record
//! the pipeline used, so the log cannot drift from what actually happened.

use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::assessment::contract::Repair;
use crate::assessment::prompt_builder::BuiltPrompt;
use crate::assessment::signals::CandidateSignalBundle;
use crate::errors::AppError;
use crate::llm_client::InferenceResult;
use crate::models::decision::{AuditLogEntry, Decision, FairnessChecks, ModelMetadata};
use crate::models::signals::JobContext;
use crate::store::{AssessmentStore, StoreError};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("decision write failed: {0}")]
    Decision(StoreError),

    /// The decision row is committed; only its audit entry is missing.
    #[error("audit write failed after decision {decision_id} was stored: {source}")]
    Audit {
        decision_id: Uuid,
        source: StoreError,
    },
}

impl From<PersistError> for AppError {
    fn from(e: PersistError) -> Self {
        match e {
            PersistError::Decision(inner) => inner.into(),
            audit @ PersistError::Audit { .. } => AppError::Persistence(audit.to_string()),
        }
    }
}

fn input_summary(job: &JobContext, bundle: &CandidateSignalBundle, prompt: &BuiltPrompt) -> Value {
    json!({
        "job": {
            "title": job.title,
            "department": job.department,
            "seniority": job.seniority,
        },
        "signals": bundle.audit_summary(),
        "prompt": {
            "system_chars": prompt.system.chars().count(),
            "user_chars": prompt.user.chars().count(),
            "corpus_items_offered": prompt.corpus_items_offered,
        },
    })
}

fn output_summary(decision: &Decision, repairs: &[Repair]) -> Value {
    let mut summary = match decision {
        Decision::HireLikelihood(record) => json!({
            "overall_score": record.overall_score,
            "band": record.band,
            "confidence": record.confidence,
            "dimensions": record.dimensions,
        }),
        Decision::InterviewKit(record) => json!({
            "coverage_score": record.coverage_score,
            "priority": record.priority,
            "item_count": record.items.len(),
            "item_ids": record.items.iter().map(|i| i.item_id).collect::<Vec<_>>(),
            "backfill": record.reasoning.backfill,
        }),
    };
    summary["revision"] = json!(decision.revision());
    summary["fallback"] = json!(decision.is_fallback());
    summary["repairs"] = json!(repairs);
    summary
}

/// Builds the audit entry for a decision that is about to be persisted.
pub fn build_audit_entry(
    decision: &Decision,
    job: &JobContext,
    bundle: &CandidateSignalBundle,
    prompt: &BuiltPrompt,
    inference: &InferenceResult,
    repairs: &[Repair],
    actor_id: Uuid,
) -> AuditLogEntry {
    AuditLogEntry {
        id: Uuid::new_v4(),
        decision_type: decision.decision_type(),
        decision_id: decision.id(),
        job_id: decision.job_id(),
        candidate_id: decision.candidate_id(),
        actor_id,
        input_summary: input_summary(job, bundle, prompt),
        output_summary: output_summary(decision, repairs),
        fairness_checks: FairnessChecks {
            protected_attributes_excluded: true,
            removed_protected_keys: prompt.removed_protected_keys.clone(),
            numeric_ranges_enforced: true,
            categorical_fields_validated: true,
        },
        model_metadata: ModelMetadata {
            model: inference.model.clone(),
            temperature: inference.temperature,
            latency_ms: inference.latency_ms,
            fallback: decision.is_fallback(),
        },
        created_at: Utc::now(),
    }
}

/// Writes the decision, then its audit entry. An audit failure does not roll back the decision.
pub async fn persist_with_audit(
    store: &dyn AssessmentStore,
    decision: &Decision,
    entry: &AuditLogEntry,
) -> Result<(), PersistError> {
    store
        .insert_decision(decision)
        .await
        .map_err(PersistError::Decision)?;

    if let Err(source) = store.insert_audit_entry(entry).await {
        error!(
            decision_id = %decision.id(),
            candidate_id = %decision.candidate_id(),
            "Audit entry write failed after decision was stored: {source}"
        );
        return Err(PersistError::Audit {
            decision_id: decision.id(),
            source,
        });
    }
    Ok(())
}
