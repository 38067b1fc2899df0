use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::batch::{run_batch, BatchReport};
use crate::assessment::contract::Repair;
use crate::assessment::pipeline::assess_single;
use crate::auth::{AuthenticatedActor, ASSESSMENT_ROLES};
use crate::errors::AppError;
use crate::models::decision::{Decision, DecisionType};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleAssessmentRequest {
    pub context_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssessmentRequest {
    pub context_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SingleAssessmentResponse {
    pub success: bool,
    pub reused: bool,
    pub fallback: bool,
    pub record: Decision,
    pub repairs: Vec<Repair>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BulkAssessmentResponse {
    Completed {
        success: bool,
        processed: usize,
        skipped: usize,
        errors: usize,
        cancelled: usize,
    },
    NoSubjects {
        success: bool,
        message: &'static str,
    },
}

fn required(value: Option<Uuid>, field: &str) -> Result<Uuid, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(req)| req)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

async fn single(
    state: &AppState,
    actor: &AuthenticatedActor,
    payload: Result<Json<SingleAssessmentRequest>, JsonRejection>,
    decision_type: DecisionType,
) -> Result<Json<SingleAssessmentResponse>, AppError> {
    let actor = actor.require_role(ASSESSMENT_ROLES)?;
    let req = body(payload)?;
    let job_id = required(req.context_id, "contextId")?;
    let candidate_id = required(req.subject_id, "subjectId")?;

    let outcome = assess_single(
        state.pipeline(),
        job_id,
        candidate_id,
        decision_type,
        actor.id,
        req.regenerate,
    )
    .await?;

    Ok(Json(SingleAssessmentResponse {
        success: true,
        reused: outcome.reused,
        fallback: outcome.decision.is_fallback(),
        record: outcome.decision,
        repairs: outcome.repairs,
    }))
}

async fn bulk(
    state: &AppState,
    actor: &AuthenticatedActor,
    payload: Result<Json<BulkAssessmentRequest>, JsonRejection>,
    decision_type: DecisionType,
) -> Result<Json<BulkAssessmentResponse>, AppError> {
    let actor = actor.require_role(ASSESSMENT_ROLES)?;
    let req = body(payload)?;
    let job_id = required(req.context_id, "contextId")?;

    let response = match run_batch(state.pipeline(), job_id, decision_type, actor.id).await? {
        BatchReport::NoSubjects => BulkAssessmentResponse::NoSubjects {
            success: true,
            message: "no subjects",
        },
        BatchReport::Completed(summary) => BulkAssessmentResponse::Completed {
            success: true,
            processed: summary.processed,
            skipped: summary.skipped,
            errors: summary.errors,
            cancelled: summary.cancelled,
        },
    };
    Ok(Json(response))
}

/// POST /api/v1/assessments/likelihood
pub async fn handle_likelihood(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    payload: Result<Json<SingleAssessmentRequest>, JsonRejection>,
) -> Result<Json<SingleAssessmentResponse>, AppError> {
    single(&state, &actor, payload, DecisionType::HireLikelihood).await
}

/// POST /api/v1/assessments/likelihood/bulk
pub async fn handle_likelihood_bulk(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    payload: Result<Json<BulkAssessmentRequest>, JsonRejection>,
) -> Result<Json<BulkAssessmentResponse>, AppError> {
    bulk(&state, &actor, payload, DecisionType::HireLikelihood).await
}

/// POST /api/v1/assessments/interview-kit
pub async fn handle_interview_kit(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    payload: Result<Json<SingleAssessmentRequest>, JsonRejection>,
) -> Result<Json<SingleAssessmentResponse>, AppError> {
    single(&state, &actor, payload, DecisionType::InterviewKit).await
}

/// POST /api/v1/assessments/interview-kit/bulk
pub async fn handle_interview_kit_bulk(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    payload: Result<Json<BulkAssessmentRequest>, JsonRejection>,
) -> Result<Json<BulkAssessmentResponse>, AppError> {
    bulk(&state, &actor, payload, DecisionType::InterviewKit).await
}
