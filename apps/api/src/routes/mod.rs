pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::assessment::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Hire likelihood
        .route(
            "/api/v1/assessments/likelihood",
            post(handlers::handle_likelihood),
        )
        .route(
            "/api/v1/assessments/likelihood/bulk",
            post(handlers::handle_likelihood_bulk),
        )
        // Interview kits
        .route(
            "/api/v1/assessments/interview-kit",
            post(handlers::handle_interview_kit),
        )
        .route(
            "/api/v1/assessments/interview-kit/bulk",
            post(handlers::handle_interview_kit_bulk),
        )
        .with_state(state)
}
