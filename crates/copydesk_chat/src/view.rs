//! Chat view for one agent.
//!
//! Composes the catalog, the conversation store and the dispatcher the way
//! the chat screen does: opening an agent guarantees a conversation, user
//! messages are recorded before the request goes out, and replies are
//! committed only if their conversation still exists.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::catalog::{self, Agent};
use crate::dispatcher::ChatDispatcher;
use crate::error::{ChatError, ChatResult};
use crate::notify::Notifier;
use crate::store::ConversationStore;
use crate::types::{ChatMessage, Conversation, ConversationId, ConversationSummary};

/// Conversation store shared between a view and in-flight requests
pub type SharedStore = Arc<Mutex<ConversationStore>>;

/// Why a send did not go out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    /// Another request is still in flight
    Busy,
    NothingToRetry,
    /// The unanswered message is no longer the last one in the log
    RetrySuperseded,
}

/// Result of sending (or retrying) a chat turn
#[derive(Debug)]
pub enum SendOutcome {
    /// The reply was appended to the conversation, right after the user
    /// message it answers
    Replied(ChatMessage),
    /// Generation failed; the user message stays and is marked unanswered
    Failed(ChatError),
    /// The conversation was deleted while the request was in flight
    Dropped(ChatMessage),
    Ignored(IgnoreReason),
}

impl SendOutcome {
    pub fn is_replied(&self) -> bool {
        matches!(self, Self::Replied(_))
    }
}

/// Chat screen state for a single agent
pub struct ChatView {
    agent: &'static Agent,
    store: SharedStore,
    dispatcher: ChatDispatcher,
    notifier: Arc<Notifier>,
    turn: AtomicBool,
}

/// Claim on the view's single in-flight turn, released on drop
struct TurnGuard<'a>(&'a AtomicBool);

impl<'a> TurnGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ChatView {
    /// Open the chat for an agent, creating its first conversation if needed
    pub fn open(
        agent_id: &str,
        store: SharedStore,
        dispatcher: ChatDispatcher,
        notifier: Arc<Notifier>,
    ) -> ChatResult<Self> {
        let agent = catalog::require(agent_id)?;
        let selected = lock(&store).open_agent(agent.id)?;
        debug!("Opened {} on conversation {}", agent.id, selected);

        Ok(Self {
            agent,
            store,
            dispatcher,
            notifier,
            turn: AtomicBool::new(false),
        })
    }

    pub fn agent(&self) -> &'static Agent {
        self.agent
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn is_loading(&self) -> bool {
        self.turn.load(Ordering::SeqCst) || self.dispatcher.is_loading()
    }

    /// Snapshot of the selected conversation
    pub fn current_conversation(&self) -> Option<Conversation> {
        lock(&self.store)
            .current_conversation()
            .filter(|c| c.agent_id == self.agent.id)
            .cloned()
    }

    /// Start a fresh conversation and select it
    pub fn new_conversation(&self) -> ChatResult<ConversationId> {
        lock(&self.store).create_conversation(self.agent.id)
    }

    /// Select one of this agent's conversations
    pub fn select(&self, conversation_id: &str) -> ChatResult<()> {
        let mut store = lock(&self.store);
        match store.get(conversation_id) {
            Some(c) if c.agent_id == self.agent.id => {
                store.set_current_conversation_id(Some(conversation_id.to_string()));
                Ok(())
            }
            _ => Err(ChatError::ConversationNotFound(conversation_id.to_string())),
        }
    }

    /// Delete one of this agent's conversations
    pub fn delete(&self, conversation_id: &str) -> ChatResult<()> {
        let mut store = lock(&self.store);
        let owned = store
            .get(conversation_id)
            .map(|c| c.agent_id == self.agent.id)
            .unwrap_or(false);
        if !owned {
            return Err(ChatError::ConversationNotFound(conversation_id.to_string()));
        }
        store.delete_conversation(conversation_id);
        Ok(())
    }

    /// Sidebar rows for this agent, most recent first
    pub fn sidebar(&self) -> Vec<ConversationSummary> {
        let store = lock(&self.store);
        let current = store.current_conversation_id();
        store
            .conversations_by_agent(self.agent.id)
            .into_iter()
            .map(|c| ConversationSummary::from_conversation(c, current))
            .collect()
    }

    /// Send a user message in the selected conversation.
    ///
    /// The message is appended before dispatch and is kept if generation
    /// fails. With no selection, the agent's latest conversation (or a new
    /// one) is selected first. Only one turn per view is in flight; a send
    /// while another is pending is ignored as `Busy`.
    pub async fn send(&self, content: &str) -> SendOutcome {
        let content = content.trim();
        if content.is_empty() {
            return SendOutcome::Ignored(IgnoreReason::EmptyInput);
        }
        let Some(_turn) = self.claim_turn() else {
            return SendOutcome::Ignored(IgnoreReason::Busy);
        };

        let user_message = ChatMessage::user(content);
        let (conversation_id, prior) = {
            let mut store = lock(&self.store);
            let conversation_id = match store.open_agent(self.agent.id) {
                Ok(id) => id,
                Err(e) => return SendOutcome::Failed(e),
            };
            let prior = store
                .get(&conversation_id)
                .map(|c| c.messages.clone())
                .unwrap_or_default();
            store.add_message(&conversation_id, user_message.clone());
            (conversation_id, prior)
        };

        self.deliver(&conversation_id, &user_message, &prior).await
    }

    /// Resend the unanswered user message that ends the selected conversation.
    ///
    /// Once later messages follow it, a reply could no longer sit next to the
    /// message it answers, so the retry is refused as `RetrySuperseded`.
    pub async fn retry(&self) -> SendOutcome {
        let Some(_turn) = self.claim_turn() else {
            return SendOutcome::Ignored(IgnoreReason::Busy);
        };

        let pending = {
            let store = lock(&self.store);
            store
                .current_conversation()
                .filter(|c| c.agent_id == self.agent.id)
                .and_then(|c| {
                    let message = c.last_unanswered()?.clone();
                    let position = c.messages.iter().position(|m| m.id == message.id)?;
                    let is_tail = position + 1 == c.messages.len();
                    Some((c.id.clone(), message, c.messages[..position].to_vec(), is_tail))
                })
        };

        let Some((conversation_id, message, prior, is_tail)) = pending else {
            return SendOutcome::Ignored(IgnoreReason::NothingToRetry);
        };
        if !is_tail {
            return SendOutcome::Ignored(IgnoreReason::RetrySuperseded);
        }

        info!("Retrying unanswered message {}", message.id);
        self.deliver(&conversation_id, &message, &prior).await
    }

    fn claim_turn(&self) -> Option<TurnGuard<'_>> {
        let turn = TurnGuard::claim(&self.turn)?;
        if self.dispatcher.is_loading() {
            return None;
        }
        Some(turn)
    }

    async fn deliver(
        &self,
        conversation_id: &str,
        user_message: &ChatMessage,
        prior: &[ChatMessage],
    ) -> SendOutcome {
        let mut reply = None;
        let result = self
            .dispatcher
            .send_message_with(
                self.agent.id,
                &user_message.content,
                prior,
                &self.notifier,
                |message| reply = Some(message),
            )
            .await;

        let mut store = lock(&self.store);
        match (result, reply) {
            (Ok(()), Some(reply)) => {
                if store.get(conversation_id).is_none() {
                    debug!(
                        "Conversation {} was deleted before its reply arrived",
                        conversation_id
                    );
                    return SendOutcome::Dropped(reply);
                }
                store.clear_unanswered(conversation_id, &user_message.id);
                store.add_message(conversation_id, reply.clone());
                SendOutcome::Replied(reply)
            }
            (Err(e), _) => {
                store.mark_unanswered(conversation_id, &user_message.id);
                SendOutcome::Failed(e)
            }
            (Ok(()), None) => SendOutcome::Failed(ChatError::ConversationNotFound(
                conversation_id.to_string(),
            )),
        }
    }
}

fn lock(store: &SharedStore) -> MutexGuard<'_, ConversationStore> {
    store.lock().unwrap_or_else(|e| e.into_inner())
}

/// Create an empty shared store
pub fn shared_store() -> SharedStore {
    Arc::new(Mutex::new(ConversationStore::new()))
}
