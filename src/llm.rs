use crate::config::LlmConfig;
use crate::error::{ResponderError, Result};
use crate::http::{Credential, HttpRequest, HttpTransport};
use crate::providers::Provider;
use crate::{log_debug, log_warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// `finish_reason` reported when the provider filtered the output itself
const CONTENT_FILTER_REASON: &str = "content_filter";

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Single-turn client for an OpenAI-style chat completions endpoint.
#[derive(Clone)]
pub struct CompletionClient {
    transport: Arc<dyn HttpTransport>,
    provider: Provider,
    endpoint: String,
    credential: Credential,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    policy_marker: String,
    accepted_status: Vec<u16>,
}

impl CompletionClient {
    /// Build a client from validated configuration
    pub fn new(config: &LlmConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let endpoint = config.effective_endpoint().ok_or_else(|| {
            ResponderError::Config(format!(
                "Completion endpoint required for provider {}",
                config.provider
            ))
        })?;

        Ok(Self {
            transport,
            provider: config.provider,
            endpoint: endpoint.to_string(),
            credential: config.credential(),
            model: config.effective_model().map(str::to_string),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            policy_marker: config.policy_marker.clone(),
            accepted_status: config.success_status.clone(),
        })
    }

    /// The request body sent for `prompt`
    pub fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Generate a reply to `prompt`
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        log_debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.provider,
            prompt.chars().count()
        );

        let body = serde_json::to_value(self.build_request(prompt)).map_err(|e| {
            ResponderError::Decode {
                context: "completion request",
                message: e.to_string(),
            }
        })?;
        let request = HttpRequest::post_json(&self.endpoint, body).with_credential(&self.credential);
        let response = self.transport.send(request).await?;

        if !self.accepted_status.contains(&response.status) {
            let body = response.text();
            if self.is_policy_rejection(&body) {
                log_warn!("Completion rejected by content policy");
                return Err(ResponderError::PolicyViolation {
                    status: Some(response.status),
                    message: body,
                });
            }
            return Err(ResponderError::Remote {
                operation: "Completion request",
                status: response.status,
                body,
            });
        }

        let parsed: ChatResponse = response.json("completion response")?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ResponderError::Decode {
                context: "completion response",
                message: "no choices returned".to_string(),
            })?;

        if choice.finish_reason.as_deref() == Some(CONTENT_FILTER_REASON) {
            return Err(ResponderError::PolicyViolation {
                status: None,
                message: "Completion output was filtered by the provider".to_string(),
            });
        }

        let content = choice
            .message
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ResponderError::Decode {
                context: "completion response",
                message: "first choice has no message content".to_string(),
            })?;

        log_debug!("Received {} characters from {}", content.chars().count(), self.provider);
        Ok(content)
    }

    fn is_policy_rejection(&self, body: &str) -> bool {
        (!self.policy_marker.is_empty() && body.contains(&self.policy_marker))
            || body.contains(CONTENT_FILTER_REASON)
    }
}
