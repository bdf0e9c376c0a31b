//! OpenAI-compatible chat completions client. Works against api.openai.com and against
//! a local Ollama server, which exposes the same `/chat/completions` route.

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use answer_core::config::LlmConfig;

use crate::llm::{LlmClient, LlmRequest};

pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("answer-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key,
            model: model.into(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.api_key.clone(), config.model.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, request: &LlmRequest) -> Result<Value> {
        let mut call = self
            .http
            .post(self.endpoint())
            .timeout(request.timeout)
            .json(&chat_body(&self.model, request));
        if let Some(api_key) = &self.api_key {
            call = call.bearer_auth(api_key.expose_secret());
        }

        let completion: ChatCompletion = call
            .send()
            .await
            .context("chat completion request failed")?
            .error_for_status()
            .context("chat completion returned an error status")?
            .json()
            .await
            .context("chat completion body was not valid JSON")?;

        parse_completion(completion)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn chat_body(model: &str, request: &LlmRequest) -> Value {
    json!({
        "model": model,
        "temperature": request.temperature,
        "messages": [
            { "role": "system", "content": request.system_prompt },
            { "role": "user", "content": request.user_prompt },
        ],
        "response_format": { "type": "json_object" },
    })
}

/// An empty completion reads as `{}` so schema checks downstream reject it.
fn parse_completion(completion: ChatCompletion) -> Result<Value> {
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_else(|| "{}".to_owned());
    serde_json::from_str(&content).context("model content was not a JSON document")
}
