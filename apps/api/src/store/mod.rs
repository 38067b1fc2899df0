//! Data-store boundary for the assessment pipeline.
//!
//! The relational store is an external collaborator; this trait lists exactly the reads and
//! writes the pipeline performs. `PgAssessmentStore` is the production backend; tests use the
//! in-memory store in `memory`.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::corpus::CorpusItem;
use crate::models::decision::{AuditLogEntry, Decision, DecisionType};
use crate::models::signals::{
    CandidateProfile, FitScoreRow, InterviewResultRow, JobContext, PipelineScoreRow,
    WarmupResponseRow,
};
use crate::models::Actor;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgAssessmentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same (candidate, job, revision) already exists.
    #[error("decision record already exists for this revision")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored payload could not be decoded: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Maps a bearer token to the acting user, `None` if unknown or expired.
    async fn resolve_actor(&self, token: &str) -> Result<Option<Actor>, StoreError>;

    async fn job_context(&self, job_id: Uuid) -> Result<Option<JobContext>, StoreError>;

    async fn candidate_profile(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<CandidateProfile>, StoreError>;

    async fn latest_fit_score(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<FitScoreRow>, StoreError>;

    async fn latest_pipeline_score(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<PipelineScoreRow>, StoreError>;

    /// Completed interviews, newest first, at most `limit`.
    async fn recent_interviews(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        limit: usize,
    ) -> Result<Vec<InterviewResultRow>, StoreError>;

    /// Warm-up scenario responses from the most recent session, newest first.
    async fn latest_warmup_responses(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Vec<WarmupResponseRow>, StoreError>;

    /// Non-archived corpus items in store order.
    async fn active_corpus(&self) -> Result<Vec<CorpusItem>, StoreError>;

    /// Every candidate with at least one prior signal for the job.
    async fn candidate_pool(&self, job_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    /// Candidates that already hold a record of this type for the job.
    async fn decided_candidates(
        &self,
        job_id: Uuid,
        decision_type: DecisionType,
    ) -> Result<HashSet<Uuid>, StoreError>;

    /// Highest-revision record for (candidate, job, type).
    async fn current_decision(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        decision_type: DecisionType,
    ) -> Result<Option<Decision>, StoreError>;

    /// Inserts a new record. Returns `StoreError::Conflict` when the revision is taken.
    async fn insert_decision(&self, decision: &Decision) -> Result<(), StoreError>;

    async fn insert_audit_entry(&self, entry: &AuditLogEntry) -> Result<(), StoreError>;
}
