use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::assessment::pipeline::PipelineSettings;
use crate::llm_client::{LlmSettings, MAX_TEMPERATURE};

const DEFAULT_INFERENCE_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_INFERENCE_MODEL: &str = "gpt-4o-mini";
const MAX_BATCH_CONCURRENCY: usize = 5;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub inference_base_url: String,
    pub inference_api_key: String,
    pub inference_model: String,
    pub inference_temperature: f32,
    pub inference_timeout: Duration,
    pub pipeline: PipelineSettings,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let temperature: f32 = optional_env("INFERENCE_TEMPERATURE", 0.2)?;
        let concurrency: usize = optional_env("BATCH_CONCURRENCY", 3)?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: optional_env("DATABASE_MAX_CONNECTIONS", 10)?,
            inference_base_url: std::env::var("INFERENCE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_INFERENCE_BASE_URL.to_string()),
            inference_api_key: require_env("INFERENCE_API_KEY")?,
            inference_model: std::env::var("INFERENCE_MODEL")
                .unwrap_or_else(|_| DEFAULT_INFERENCE_MODEL.to_string()),
            inference_temperature: temperature.clamp(0.0, MAX_TEMPERATURE),
            inference_timeout: Duration::from_secs(optional_env("INFERENCE_TIMEOUT_SECS", 60)?),
            pipeline: PipelineSettings {
                corpus_prompt_limit: optional_env("CORPUS_PROMPT_LIMIT", 80)?,
                batch_concurrency: concurrency.clamp(1, MAX_BATCH_CONCURRENCY),
                batch_deadline: Duration::from_secs(optional_env("BATCH_DEADLINE_SECS", 240)?),
            },
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            base_url: self.inference_base_url.clone(),
            api_key: self.inference_api_key.clone(),
            model: self.inference_model.clone(),
            temperature: self.inference_temperature,
            timeout: self.inference_timeout,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
