//! Candidate assessment pipeline: signal collection, corpus ranking, prompting, model-output
//! validation, persistence with audit, and the batch orchestrator that drives them.

pub mod audit;
pub mod batch;
pub mod contract;
pub mod extract;
pub mod handlers;
pub mod pipeline;
pub mod prompt_builder;
pub mod prompts;
pub mod ranking;
pub mod signals;
