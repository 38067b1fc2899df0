//! Scripted `InferenceClient` for tests: the reply is computed from the user prompt.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{InferenceClient, InferenceResult, LlmError};

type Script = dyn Fn(&str) -> Result<String, LlmError> + Send + Sync;

pub struct ScriptedInference {
    script: Box<Script>,
    calls: AtomicUsize,
}

impl ScriptedInference {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with the same text.
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    fn model(&self) -> &str {
        "scripted-model"
    }

    fn temperature(&self) -> f32 {
        0.2
    }

    async fn complete(&self, _system: &str, user: &str) -> Result<InferenceResult, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let raw_text = (self.script)(user)?;
        Ok(InferenceResult {
            raw_text,
            latency_ms: 12,
            model: self.model().to_string(),
            temperature: self.temperature(),
        })
    }
}
