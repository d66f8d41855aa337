//! Chat-completions client for any OpenAI-compatible endpoint (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use talentrag_core::config::LlmSettings;
use talentrag_core::error::{Error, ProviderErrorKind, Result};
use talentrag_core::traits::{CompletionParams, LanguageModel};

use crate::retry::RetryPolicy;

pub struct OpenAiCompatibleClient {
    base_url: String,
    model: String,
    api_key: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub fn from_settings(llm: &LlmSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            model: llm.model.clone(),
            api_key: llm.api_key.clone(),
            retry: RetryPolicy::from_settings(llm),
            client,
        })
    }

    fn request_body(&self, system: Option<&str>, prompt: &str, params: CompletionParams) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        })
    }

    async fn send_once(&self, url: &str, body: &Value) -> Result<String> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let kind = match status.as_u16() {
                429 => ProviderErrorKind::RateLimited,
                500..=599 => ProviderErrorKind::Unavailable,
                _ => ProviderErrorKind::Http,
            };
            return Err(Error::provider(kind, format!("{} returned {}: {}", url, status, text)));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| Error::provider(ProviderErrorKind::InvalidResponse, e.to_string()))?;
        extract_content(&json)
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    let kind = if e.is_timeout() {
        ProviderErrorKind::Timeout
    } else if e.is_connect() || e.is_request() {
        ProviderErrorKind::Unavailable
    } else {
        ProviderErrorKind::Http
    };
    Error::provider(kind, e.to_string())
}

/// Pulls `choices[0].message.content` out of a chat-completions response.
fn extract_content(json: &Value) -> Result<String> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| Error::provider(ProviderErrorKind::InvalidResponse, "no choices in response"))?;
    choice["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::provider(ProviderErrorKind::InvalidResponse, "choice has no text content"))
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(&self, system: Option<&str>, prompt: &str, params: CompletionParams) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(Error::InvalidConfig("llm.api_key is not set (or export GROQ_API_KEY)".into()));
        }
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(system, prompt, params);
        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), max_tokens = params.max_tokens, "chat completion");
        let content = self.retry.run("chat_completion", || self.send_once(&url, &body)).await?;
        tracing::debug!(reply_chars = content.len(), "chat completion done");
        Ok(content)
    }
}
