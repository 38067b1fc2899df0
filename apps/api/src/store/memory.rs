//! In-memory `AssessmentStore` for tests. Mirrors the Postgres semantics that matter to the
//! pipeline: store-order corpus, newest-first signal reads, unique (candidate, job, revision).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{AssessmentStore, StoreError};
use crate::models::corpus::CorpusItem;
use crate::models::decision::{AuditLogEntry, Decision, DecisionType};
use crate::models::signals::{
    CandidateProfile, FitScoreRow, InterviewResultRow, JobContext, PipelineScoreRow,
    WarmupResponseRow,
};
use crate::models::Actor;

#[derive(Default)]
pub struct MemoryState {
    pub actors: HashMap<String, Actor>,
    pub jobs: HashMap<Uuid, JobContext>,
    pub profiles: HashMap<Uuid, CandidateProfile>,
    pub fit_scores: HashMap<(Uuid, Uuid), FitScoreRow>,
    pub pipeline_scores: HashMap<(Uuid, Uuid), PipelineScoreRow>,
    pub interviews: HashMap<(Uuid, Uuid), Vec<InterviewResultRow>>,
    pub warmups: HashMap<(Uuid, Uuid), Vec<WarmupResponseRow>>,
    pub corpus: Vec<CorpusItem>,
    pub pools: HashMap<Uuid, Vec<Uuid>>,
    pub decisions: Vec<Decision>,
    pub audit_log: Vec<AuditLogEntry>,
    /// Source names whose reads fail with `Unavailable`.
    pub failing_sources: HashSet<&'static str>,
    pub fail_audit_writes: bool,
    pub fail_decision_writes: bool,
    /// `decided_candidates` reports nothing, as if another run committed after the pre-check.
    pub stale_decided_reads: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    pub state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn with<F: FnOnce(&mut MemoryState)>(self, seed: F) -> Self {
        if let Ok(mut state) = self.state.lock() {
            seed(&mut state);
        }
        self
    }

    pub fn decisions(&self) -> Vec<Decision> {
        self.lock().decisions.clone()
    }

    pub fn audit_log(&self) -> Vec<AuditLogEntry> {
        self.lock().audit_log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_source(state: &MemoryState, source: &'static str) -> Result<(), StoreError> {
        if state.failing_sources.contains(source) {
            return Err(StoreError::Unavailable(format!("{source} read failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn resolve_actor(&self, token: &str) -> Result<Option<Actor>, StoreError> {
        Ok(self.lock().actors.get(token).cloned())
    }

    async fn job_context(&self, job_id: Uuid) -> Result<Option<JobContext>, StoreError> {
        Ok(self.lock().jobs.get(&job_id).cloned())
    }

    async fn candidate_profile(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<CandidateProfile>, StoreError> {
        let state = self.lock();
        Self::check_source(&state, "profile")?;
        Ok(state.profiles.get(&candidate_id).cloned())
    }

    async fn latest_fit_score(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<FitScoreRow>, StoreError> {
        let state = self.lock();
        Self::check_source(&state, "fit_score")?;
        Ok(state.fit_scores.get(&(candidate_id, job_id)).cloned())
    }

    async fn latest_pipeline_score(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<PipelineScoreRow>, StoreError> {
        let state = self.lock();
        Self::check_source(&state, "pipeline_score")?;
        Ok(state.pipeline_scores.get(&(candidate_id, job_id)).cloned())
    }

    async fn recent_interviews(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        limit: usize,
    ) -> Result<Vec<InterviewResultRow>, StoreError> {
        let state = self.lock();
        Self::check_source(&state, "interviews")?;
        let mut rows = state
            .interviews
            .get(&(candidate_id, job_id))
            .cloned()
            .unwrap_or_default();
        rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn latest_warmup_responses(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Vec<WarmupResponseRow>, StoreError> {
        let state = self.lock();
        Self::check_source(&state, "warmup")?;
        Ok(state
            .warmups
            .get(&(candidate_id, job_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn active_corpus(&self) -> Result<Vec<CorpusItem>, StoreError> {
        Ok(self.lock().corpus.clone())
    }

    async fn candidate_pool(&self, job_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Ok(self.lock().pools.get(&job_id).cloned().unwrap_or_default())
    }

    async fn decided_candidates(
        &self,
        job_id: Uuid,
        decision_type: DecisionType,
    ) -> Result<HashSet<Uuid>, StoreError> {
        let state = self.lock();
        if state.stale_decided_reads {
            return Ok(HashSet::new());
        }
        Ok(state
            .decisions
            .iter()
            .filter(|d| d.job_id() == job_id && d.decision_type() == decision_type)
            .map(|d| d.candidate_id())
            .collect())
    }

    async fn current_decision(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        decision_type: DecisionType,
    ) -> Result<Option<Decision>, StoreError> {
        Ok(self
            .lock()
            .decisions
            .iter()
            .filter(|d| {
                d.candidate_id() == candidate_id
                    && d.job_id() == job_id
                    && d.decision_type() == decision_type
            })
            .max_by_key(|d| d.revision())
            .cloned())
    }

    async fn insert_decision(&self, decision: &Decision) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_decision_writes {
            return Err(StoreError::Unavailable("decision write failed".to_string()));
        }
        let taken = state.decisions.iter().any(|d| {
            d.candidate_id() == decision.candidate_id()
                && d.job_id() == decision.job_id()
                && d.decision_type() == decision.decision_type()
                && d.revision() == decision.revision()
        });
        if taken {
            return Err(StoreError::Conflict);
        }
        state.decisions.push(decision.clone());
        Ok(())
    }

    async fn insert_audit_entry(&self, entry: &AuditLogEntry) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_audit_writes {
            return Err(StoreError::Unavailable("audit write failed".to_string()));
        }
        state.audit_log.push(entry.clone());
        Ok(())
    }
}
