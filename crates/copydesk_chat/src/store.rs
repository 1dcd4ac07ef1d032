//! In-memory conversation store.
//!
//! Holds every conversation of one UI session, most recent first, plus the
//! pointer to the currently selected conversation. Nothing here is persisted;
//! the store lives as long as the chat view that owns it.

use chrono::{Duration, Utc};
use tracing::debug;

use crate::catalog;
use crate::error::ChatResult;
use crate::types::{derive_title, ChatMessage, Conversation, ConversationId, MessageRole};

/// Authoritative collection of conversations and the current selection
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current: Option<ConversationId>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation for an agent, select it, and return its id.
    ///
    /// The new conversation goes to the front of the collection and starts
    /// with the assistant greeting.
    pub fn create_conversation(&mut self, agent_id: &str) -> ChatResult<ConversationId> {
        catalog::require(agent_id)?;

        let conversation = Conversation::new(agent_id);
        let id = conversation.id.clone();
        debug!("Created conversation {} for agent {}", id, agent_id);

        self.conversations.insert(0, conversation);
        self.current = Some(id.clone());
        Ok(id)
    }

    /// Append a message to a conversation.
    ///
    /// The first user message also becomes the conversation title. Returns
    /// `false` when the conversation does not exist; the message is dropped.
    pub fn add_message(&mut self, conversation_id: &str, message: ChatMessage) -> bool {
        let Some(conversation) = self.get_mut(conversation_id) else {
            debug!(
                "Ignoring message {} for unknown conversation {}",
                message.id, conversation_id
            );
            return false;
        };

        if message.role == MessageRole::User && !conversation.has_user_message() {
            conversation.title = derive_title(&message.content);
        }

        conversation.messages.push(message);

        // updated_at must move forward on every append, even within one clock tick
        let now = Utc::now();
        conversation.updated_at = if now > conversation.updated_at {
            now
        } else {
            conversation.updated_at + Duration::microseconds(1)
        };
        true
    }

    /// The currently selected conversation, if it still exists
    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    pub fn current_conversation_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Change the selection. The id is not checked against the store.
    pub fn set_current_conversation_id(&mut self, id: Option<ConversationId>) {
        self.current = id;
    }

    /// All conversations of an agent, most recent first
    pub fn conversations_by_agent(&self, agent_id: &str) -> Vec<&Conversation> {
        self.conversations
            .iter()
            .filter(|c| c.agent_id == agent_id)
            .collect()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Remove a conversation. Clears the selection if it pointed here.
    pub fn delete_conversation(&mut self, id: &str) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        let removed = self.conversations.len() != before;

        if self.current.as_deref() == Some(id) {
            self.current = None;
        }
        if removed {
            debug!("Deleted conversation {}", id);
        }
        removed
    }

    /// Select a conversation for an agent, creating the first one if needed.
    ///
    /// Keeps the current selection when it already belongs to the agent,
    /// otherwise picks the agent's most recent conversation.
    pub fn open_agent(&mut self, agent_id: &str) -> ChatResult<ConversationId> {
        catalog::require(agent_id)?;

        if let Some(current) = self.current_conversation() {
            if current.agent_id == agent_id {
                return Ok(current.id.clone());
            }
        }

        let latest = self
            .conversations_by_agent(agent_id)
            .first()
            .map(|c| c.id.clone());

        match latest {
            Some(id) => {
                self.current = Some(id.clone());
                Ok(id)
            }
            None => self.create_conversation(agent_id),
        }
    }

    /// Flag a user message as never answered
    pub fn mark_unanswered(&mut self, conversation_id: &str, message_id: &str) -> bool {
        match self.get_mut(conversation_id) {
            Some(conversation) => {
                if !conversation.is_unanswered(message_id) {
                    conversation.unanswered.push(message_id.to_string());
                }
                true
            }
            None => false,
        }
    }

    pub fn clear_unanswered(&mut self, conversation_id: &str, message_id: &str) -> bool {
        match self.get_mut(conversation_id) {
            Some(conversation) => {
                conversation.unanswered.retain(|id| id != message_id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
