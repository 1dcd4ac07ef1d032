//! Generation webhook client.
//!
//! The webhook accepts `{agent, message?, conversation?}` and answers with
//! `{copy, success?, error?}`. Only a non-empty `copy` counts as a reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CopydeskConfig;
use crate::error::{ChatResult, DispatchError};
use crate::types::ChatMessage;

/// Request body posted to the webhook
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationRequest {
    pub agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<Vec<ChatMessage>>,
}

impl GenerationRequest {
    /// Chat turn: new message plus the conversation so far
    pub fn chat(
        agent: impl Into<String>,
        message: impl Into<String>,
        conversation: &[ChatMessage],
    ) -> Self {
        Self {
            agent: agent.into(),
            message: Some(message.into()),
            conversation: Some(conversation.to_vec()),
        }
    }

    /// Single-shot generation with only the agent id
    pub fn single_shot(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            message: None,
            conversation: None,
        }
    }
}

/// Response body returned by the webhook
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GenerationResponse {
    #[serde(default)]
    pub copy: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerationResponse {
    /// Extract the generated text, rejecting missing or blank copy
    pub fn into_copy(self) -> Result<String, DispatchError> {
        match self.copy {
            Some(copy) if !copy.trim().is_empty() => Ok(copy),
            _ => Err(DispatchError::MalformedResponse(
                self.error
                    .unwrap_or_else(|| "response has no 'copy' text".to_string()),
            )),
        }
    }
}

/// Anything that can turn a generation request into copy text
#[async_trait]
pub trait GenerationEndpoint: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, DispatchError>;
}

/// HTTP client for the generation webhook
#[derive(Debug, Clone)]
pub struct WebhookClient {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Build a client from workspace settings
    pub fn from_config(config: &CopydeskConfig) -> ChatResult<Self> {
        let url = config.require_webhook_url()?;
        Ok(Self::new(url, config.request_timeout()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Post one request and return the generated copy
    pub async fn post(&self, request: &GenerationRequest) -> Result<String, DispatchError> {
        debug!("Posting generation request for agent {}", request.agent);

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DispatchError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Generation endpoint returned {}: {}", status, body);
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let parsed: GenerationResponse = serde_json::from_str(&body)
            .map_err(|e| DispatchError::MalformedResponse(format!("invalid JSON: {}", e)))?;
        parsed.into_copy()
    }

    fn classify(&self, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            DispatchError::Timeout(self.timeout.as_secs())
        } else {
            DispatchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl GenerationEndpoint for WebhookClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, DispatchError> {
        self.post(request).await
    }
}
