use std::sync::Arc;

use crate::assessment::pipeline::PipelineDeps;
use crate::config::Config;
use crate::llm_client::InferenceClient;
use crate::store::AssessmentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Default: PgAssessmentStore. Tests swap in the in-memory store.
    pub store: Arc<dyn AssessmentStore>,
    /// Default: LlmClient against the configured chat-completions endpoint.
    pub inference: Arc<dyn InferenceClient>,
    pub config: Config,
}

impl AppState {
    pub fn pipeline(&self) -> PipelineDeps<'_> {
        PipelineDeps {
            store: self.store.as_ref(),
            inference: self.inference.as_ref(),
            settings: &self.config.pipeline,
        }
    }
}
