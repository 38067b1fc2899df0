use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use super::{AssessmentStore, StoreError};
use crate::models::corpus::{CorpusCategory, CorpusItem, Rubric};
use crate::models::decision::{
    AuditLogEntry, Band, Decision, DecisionType, KitRecord, LikelihoodRecord,
};
use crate::models::signals::{
    CandidateProfile, FitScoreRow, InterviewResultRow, JobContext, PipelineScoreRow,
    WarmupResponseRow,
};
use crate::models::Actor;

/// Warm-up responses are read from the latest session only; this caps the rows.
const WARMUP_RESPONSE_LIMIT: i64 = 5;

/// PostgreSQL-backed store. Append-only for decision and audit tables: never UPDATE.
#[derive(Clone)]
pub struct PgAssessmentStore {
    pool: PgPool,
}

impl PgAssessmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CorpusRow {
    id: Uuid,
    department: String,
    category: String,
    seniority: String,
    difficulty: String,
    is_safe: bool,
    question: String,
    rubric: Option<Value>,
}

impl From<CorpusRow> for CorpusItem {
    fn from(row: CorpusRow) -> Self {
        let rubric = row.rubric.and_then(|value| {
            if value.is_null() {
                return None;
            }
            match serde_json::from_value::<Rubric>(value) {
                Ok(rubric) => Some(rubric),
                Err(e) => {
                    warn!("Corpus item {} has an unreadable rubric: {e}", row.id);
                    None
                }
            }
        });

        CorpusItem {
            id: row.id,
            department: row.department,
            category: CorpusCategory::parse(&row.category),
            seniority: row.seniority,
            difficulty: row.difficulty,
            is_safe: row.is_safe,
            question: row.question,
            rubric,
        }
    }
}

#[derive(FromRow)]
struct LikelihoodRow {
    id: Uuid,
    candidate_id: Uuid,
    job_id: Uuid,
    revision: i32,
    overall_score: f64,
    band: String,
    confidence: String,
    dimensions: Value,
    reasoning: Value,
    model: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<LikelihoodRow> for LikelihoodRecord {
    type Error = StoreError;

    fn try_from(row: LikelihoodRow) -> Result<Self, Self::Error> {
        Ok(LikelihoodRecord {
            id: row.id,
            candidate_id: row.candidate_id,
            job_id: row.job_id,
            revision: row.revision,
            overall_score: row.overall_score,
            band: decode_band(&row.band)?,
            confidence: decode_band(&row.confidence)?,
            dimensions: decode_json(row.dimensions)?,
            reasoning: decode_json(row.reasoning)?,
            model: row.model,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct KitRow {
    id: Uuid,
    candidate_id: Uuid,
    job_id: Uuid,
    revision: i32,
    coverage_score: f64,
    priority: String,
    items: Value,
    reasoning: Value,
    model: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<KitRow> for KitRecord {
    type Error = StoreError;

    fn try_from(row: KitRow) -> Result<Self, Self::Error> {
        Ok(KitRecord {
            id: row.id,
            candidate_id: row.candidate_id,
            job_id: row.job_id,
            revision: row.revision,
            coverage_score: row.coverage_score,
            priority: decode_band(&row.priority)?,
            items: decode_json(row.items)?,
            reasoning: decode_json(row.reasoning)?,
            model: row.model,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

fn decode_band(label: &str) -> Result<Band, StoreError> {
    Band::parse(label).ok_or_else(|| StoreError::Corrupt(format!("unknown band '{label}'")))
}

fn decode_json<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

/// Maps a unique-key violation to `StoreError::Conflict`.
fn map_insert_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::Database(err),
    }
}

fn decision_table(decision_type: DecisionType) -> &'static str {
    match decision_type {
        DecisionType::HireLikelihood => "hire_likelihood_records",
        DecisionType::InterviewKit => "interview_kit_records",
    }
}

#[async_trait]
impl AssessmentStore for PgAssessmentStore {
    async fn resolve_actor(&self, token: &str) -> Result<Option<Actor>, StoreError> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            "SELECT user_id, role FROM api_sessions WHERE token = $1 AND expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, role)| Actor { id, role }))
    }

    async fn job_context(&self, job_id: Uuid) -> Result<Option<JobContext>, StoreError> {
        Ok(sqlx::query_as::<_, JobContext>(
            "SELECT id, title, department, seniority, description FROM jobs WHERE id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn candidate_profile(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<CandidateProfile>, StoreError> {
        Ok(sqlx::query_as::<_, CandidateProfile>(
            r#"
            SELECT id, full_name, email, current_title, headline,
                   years_experience, skills, location
            FROM candidates
            WHERE id = $1
            "#,
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn latest_fit_score(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<FitScoreRow>, StoreError> {
        Ok(sqlx::query_as::<_, FitScoreRow>(
            r#"
            SELECT overall_score, strengths, gaps, created_at
            FROM candidate_job_fit_scores
            WHERE candidate_id = $1 AND job_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(candidate_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn latest_pipeline_score(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<PipelineScoreRow>, StoreError> {
        Ok(sqlx::query_as::<_, PipelineScoreRow>(
            r#"
            SELECT predictive_score, shortlist_rank, created_at
            FROM pipeline_scores
            WHERE candidate_id = $1 AND job_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(candidate_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn recent_interviews(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        limit: usize,
    ) -> Result<Vec<InterviewResultRow>, StoreError> {
        Ok(sqlx::query_as::<_, InterviewResultRow>(
            r#"
            SELECT id, overall_score, strengths, gaps, summary, completed_at
            FROM interview_results
            WHERE candidate_id = $1 AND job_id = $2 AND status = 'completed'
            ORDER BY completed_at DESC
            LIMIT $3
            "#,
        )
        .bind(candidate_id)
        .bind(job_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn latest_warmup_responses(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<Vec<WarmupResponseRow>, StoreError> {
        Ok(sqlx::query_as::<_, WarmupResponseRow>(
            r#"
            SELECT scenario_title, score, signals, created_at
            FROM warmup_responses
            WHERE candidate_id = $1 AND job_id = $2
              AND session_id = (
                  SELECT session_id FROM warmup_responses
                  WHERE candidate_id = $1 AND job_id = $2
                  ORDER BY created_at DESC
                  LIMIT 1
              )
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(candidate_id)
        .bind(job_id)
        .bind(WARMUP_RESPONSE_LIMIT)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn active_corpus(&self) -> Result<Vec<CorpusItem>, StoreError> {
        let rows = sqlx::query_as::<_, CorpusRow>(
            r#"
            SELECT id, department, category, seniority, difficulty, is_safe, question, rubric
            FROM question_corpus
            WHERE archived = false
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CorpusItem::from).collect())
    }

    async fn candidate_pool(&self, job_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT candidate_id FROM candidate_job_fit_scores WHERE job_id = $1
            UNION
            SELECT candidate_id FROM pipeline_scores WHERE job_id = $1
            UNION
            SELECT candidate_id FROM interview_results WHERE job_id = $1 AND status = 'completed'
            UNION
            SELECT candidate_id FROM warmup_responses WHERE job_id = $1
            ORDER BY candidate_id
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn decided_candidates(
        &self,
        job_id: Uuid,
        decision_type: DecisionType,
    ) -> Result<HashSet<Uuid>, StoreError> {
        let sql = format!(
            "SELECT DISTINCT candidate_id FROM {} WHERE job_id = $1",
            decision_table(decision_type)
        );
        let ids: Vec<Uuid> = sqlx::query_scalar(&sql)
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn current_decision(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        decision_type: DecisionType,
    ) -> Result<Option<Decision>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} WHERE candidate_id = $1 AND job_id = $2 ORDER BY revision DESC LIMIT 1",
            decision_table(decision_type)
        );

        match decision_type {
            DecisionType::HireLikelihood => {
                let row: Option<LikelihoodRow> = sqlx::query_as(&sql)
                    .bind(candidate_id)
                    .bind(job_id)
                    .fetch_optional(&self.pool)
                    .await?;
                row.map(|r| LikelihoodRecord::try_from(r).map(Decision::HireLikelihood))
                    .transpose()
            }
            DecisionType::InterviewKit => {
                let row: Option<KitRow> = sqlx::query_as(&sql)
                    .bind(candidate_id)
                    .bind(job_id)
                    .fetch_optional(&self.pool)
                    .await?;
                row.map(|r| KitRecord::try_from(r).map(Decision::InterviewKit))
                    .transpose()
            }
        }
    }

    async fn insert_decision(&self, decision: &Decision) -> Result<(), StoreError> {
        match decision {
            Decision::HireLikelihood(record) => {
                sqlx::query(
                    r#"
                    INSERT INTO hire_likelihood_records
                        (id, candidate_id, job_id, revision, overall_score, band, confidence,
                         dimensions, reasoning, model, created_by, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                    "#,
                )
                .bind(record.id)
                .bind(record.candidate_id)
                .bind(record.job_id)
                .bind(record.revision)
                .bind(record.overall_score)
                .bind(record.band.as_str())
                .bind(record.confidence.as_str())
                .bind(encode_json(&record.dimensions)?)
                .bind(encode_json(&record.reasoning)?)
                .bind(&record.model)
                .bind(record.created_by)
                .bind(record.created_at)
                .execute(&self.pool)
                .await
                .map_err(map_insert_error)?;
            }
            Decision::InterviewKit(record) => {
                sqlx::query(
                    r#"
                    INSERT INTO interview_kit_records
                        (id, candidate_id, job_id, revision, coverage_score, priority,
                         items, reasoning, model, created_by, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    "#,
                )
                .bind(record.id)
                .bind(record.candidate_id)
                .bind(record.job_id)
                .bind(record.revision)
                .bind(record.coverage_score)
                .bind(record.priority.as_str())
                .bind(encode_json(&record.items)?)
                .bind(encode_json(&record.reasoning)?)
                .bind(&record.model)
                .bind(record.created_by)
                .bind(record.created_at)
                .execute(&self.pool)
                .await
                .map_err(map_insert_error)?;
            }
        }
        Ok(())
    }

    async fn insert_audit_entry(&self, entry: &AuditLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ai_audit_log
                (id, decision_type, decision_id, job_id, candidate_id, actor_id,
                 input_summary, output_summary, fairness_checks, model_metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(entry.decision_type.as_str())
        .bind(entry.decision_id)
        .bind(entry.job_id)
        .bind(entry.candidate_id)
        .bind(entry.actor_id)
        .bind(&entry.input_summary)
        .bind(&entry.output_summary)
        .bind(encode_json(&entry.fairness_checks)?)
        .bind(encode_json(&entry.model_metadata)?)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
