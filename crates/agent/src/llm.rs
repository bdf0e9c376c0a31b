use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub timeout: Duration,
}

/// A chat model that answers with a single JSON object.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete_json(&self, request: &LlmRequest) -> Result<Value>;
}

/// Sampling settings shared by every call in one pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelSettings {
    pub temperature: f32,
    pub timeout: Duration,
}

impl LlmRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: settings.temperature,
            timeout: settings.timeout,
        }
    }
}
