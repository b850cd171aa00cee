//! HTTP gateway provider
//!
//! Talks to an OpenAI-compatible chat completions endpoint, which is what
//! a LiteLLM deployment exposes for arbitrary hosted models. The same
//! adapter serves the plain chat mode against the same wire format.

use arena_application::ports::provider::{
    ModelProvider, ProviderError, ProviderRequest, ProviderResult,
};
use arena_domain::AgentMode;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Provider for hosted models behind an OpenAI-compatible gateway
pub struct HttpGatewayProvider {
    mode: AgentMode,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    /// Flat per-token rate used to estimate cost from reported usage
    cost_per_token: f64,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

impl HttpGatewayProvider {
    pub fn new(mode: AgentMode, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            mode,
            client: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            cost_per_token: 0.0,
        }
    }

    pub fn with_cost_per_token(mut self, rate: f64) -> Self {
        self.cost_per_token = rate;
        self
    }

    fn request_body(&self, request: &ProviderRequest) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(context) = request.context.as_deref().filter(|c| !c.is_empty()) {
            messages.push(serde_json::json!({"role": "system", "content": context}));
        }
        messages.push(serde_json::json!({"role": "user", "content": request.prompt}));

        let mut body = serde_json::json!({
            "model": request.model.as_str(),
            "messages": messages,
        });
        // Caller parameters (temperature etc.) merge in at the top level
        if let (Some(body_map), serde_json::Value::Object(params)) =
            (body.as_object_mut(), &request.parameters)
        {
            for (key, value) in params {
                body_map.insert(key.clone(), value.clone());
            }
        }
        body
    }

    fn classify_status(status: reqwest::StatusCode, detail: String) -> ProviderError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            ProviderError::Transient(format!("gateway returned {status}: {detail}"))
        } else {
            ProviderError::Fatal(format!("gateway returned {status}: {detail}"))
        }
    }

    fn classify_transport(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_connect() || e.is_request() {
            ProviderError::Transient(format!("gateway unreachable: {e}"))
        } else {
            ProviderError::Fatal(format!("gateway request failed: {e}"))
        }
    }
}

#[async_trait]
impl ModelProvider for HttpGatewayProvider {
    fn mode(&self) -> AgentMode {
        self.mode
    }

    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderResult, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {url} for model {}", request.model);

        let mut http_request = self.client.post(&url).json(&self.request_body(request));
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request
            .send()
            .await
            .map_err(Self::classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, detail));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Fatal(format!("malformed gateway response: {e}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Fatal("gateway returned no choices".to_string()))?;

        let cost = completion
            .usage
            .map(|u| u.total_tokens as f64 * self.cost_per_token)
            .unwrap_or(0.0);

        Ok(ProviderResult::new(content, cost))
    }
}
