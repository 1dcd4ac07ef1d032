//! Chat dispatcher.
//!
//! Turns an outgoing user message plus the conversation so far into one
//! generation request, and the webhook answer into an assistant message.
//! The dispatcher knows nothing about conversation ids; committing the reply
//! to a store is the caller's job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::catalog;
use crate::config::CopydeskConfig;
use crate::error::{ChatError, ChatResult, DispatchError};
use crate::notify::Notifier;
use crate::types::ChatMessage;
use crate::webhook::{GenerationEndpoint, GenerationRequest, WebhookClient};

/// Shown when a chat turn gets no reply
pub const SEND_FAILED_NOTICE: &str = "Falha ao enviar mensagem. Tente novamente.";
/// Shown when single-shot generation fails
pub const GENERATE_FAILED_NOTICE: &str = "Falha ao gerar o copy. Tente novamente.";
/// Shown when single-shot generation succeeds
pub const GENERATE_OK_NOTICE: &str = "Copy gerado com sucesso.";

/// How failed generation requests are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first (0 = single attempt)
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &CopydeskConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.retry_backoff(),
        }
    }

    /// Delay before the given attempt (attempt 0 never waits)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            Duration::ZERO
        } else {
            self.backoff.saturating_mul(1u32 << (attempt - 1).min(16))
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Clears the loading flag however the request ends
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Sends chat turns to the generation endpoint
#[derive(Clone)]
pub struct ChatDispatcher {
    endpoint: Arc<dyn GenerationEndpoint>,
    retry: RetryPolicy,
    loading: Arc<AtomicBool>,
}

impl ChatDispatcher {
    pub fn new(endpoint: Arc<dyn GenerationEndpoint>, retry: RetryPolicy) -> Self {
        Self {
            endpoint,
            retry,
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build a dispatcher posting to the configured webhook
    pub fn from_config(config: &CopydeskConfig) -> ChatResult<Self> {
        let client = WebhookClient::from_config(config)?;
        Ok(Self::new(Arc::new(client), RetryPolicy::from_config(config)))
    }

    /// Whether a request is currently in flight
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send a chat turn and return the assistant reply.
    ///
    /// `prior` is the conversation the request is contextualised with; the
    /// new message is carried separately in the request.
    pub async fn send_message(
        &self,
        agent_id: &str,
        content: &str,
        prior: &[ChatMessage],
    ) -> ChatResult<ChatMessage> {
        catalog::require(agent_id)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        info!("Sending message to agent: {}", agent_id);
        let request = GenerationRequest::chat(agent_id, content, prior);
        let copy = self.dispatch(&request).await?;
        Ok(ChatMessage::assistant(copy))
    }

    /// Send a chat turn, handing the reply to `on_reply`.
    ///
    /// On failure `on_reply` is not called and exactly one error
    /// notification is recorded.
    pub async fn send_message_with<F>(
        &self,
        agent_id: &str,
        content: &str,
        prior: &[ChatMessage],
        notifier: &Notifier,
        on_reply: F,
    ) -> ChatResult<()>
    where
        F: FnOnce(ChatMessage),
    {
        match self.send_message(agent_id, content, prior).await {
            Ok(reply) => {
                on_reply(reply);
                Ok(())
            }
            Err(e) => {
                warn!("Error sending message: {}", e);
                notifier.error(SEND_FAILED_NOTICE);
                Err(e)
            }
        }
    }

    /// Single-shot generation for an agent, without conversation context
    pub async fn generate(&self, agent_id: &str) -> ChatResult<String> {
        catalog::require(agent_id)?;
        info!("Calling agent: {}", agent_id);
        let copy = self.dispatch(&GenerationRequest::single_shot(agent_id)).await?;
        Ok(copy)
    }

    /// Single-shot generation that records a success or error notification
    pub async fn generate_with(&self, agent_id: &str, notifier: &Notifier) -> ChatResult<String> {
        match self.generate(agent_id).await {
            Ok(copy) => {
                notifier.success(GENERATE_OK_NOTICE);
                Ok(copy)
            }
            Err(e) => {
                warn!("Error calling agent: {}", e);
                notifier.error(GENERATE_FAILED_NOTICE);
                Err(e)
            }
        }
    }

    async fn dispatch(&self, request: &GenerationRequest) -> Result<String, DispatchError> {
        let _loading = LoadingGuard::start(&self.loading);

        let mut attempt = 0;
        loop {
            let delay = self.retry.delay_for(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.endpoint.generate(request).await {
                Ok(copy) => return Ok(copy),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    debug!(
                        "Generation attempt {}/{} failed: {}",
                        attempt,
                        self.retry.max_retries + 1,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
