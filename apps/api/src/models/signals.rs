use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// The job a candidate is evaluated against.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobContext {
    pub id: Uuid,
    pub title: String,
    pub department: String,
    pub seniority: String,
    pub description: Option<String>,
}

/// Candidate base profile. Contains identity fields that must never reach a prompt;
/// see `assessment::prompt_builder::PromptCandidate` for the projection that does.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub current_title: Option<String>,
    pub headline: Option<String>,
    pub years_experience: Option<f64>,
    pub skills: Vec<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FitScoreRow {
    pub overall_score: f64,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Shortlist / pipeline predictive score.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PipelineScoreRow {
    pub predictive_score: f64,
    pub shortlist_rank: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewResultRow {
    pub id: Uuid,
    pub overall_score: Option<f64>,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub summary: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// A warm-up scenario answer with the signals extracted from it (free-form JSON).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WarmupResponseRow {
    pub scenario_title: String,
    pub score: Option<f64>,
    pub signals: Value,
    pub created_at: DateTime<Utc>,
}
