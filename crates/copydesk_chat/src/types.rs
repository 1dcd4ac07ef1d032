//! Core types for the chat system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to a conversation until its first user message arrives
pub const DEFAULT_CONVERSATION_TITLE: &str = "Nova conversa";

/// Greeting seeded into every new conversation
pub const GREETING: &str = "Olá! Sou seu agente especializado. Como posso ajudá-lo hoje?";

/// Longest title kept verbatim; longer ones are cut and suffixed with `...`
pub const TITLE_MAX_CHARS: usize = 30;

/// Unique identifier for a conversation
pub type ConversationId = String;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single chat message. Never edited once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Unique message ID (UUID)
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
        }
    }
}

/// A conversation with one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    /// Catalog id of the agent this conversation belongs to
    pub agent_id: String,
    pub title: String,
    /// Append-only message log, in insertion order
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// User messages whose generation failed and never got a reply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unanswered: Vec<String>,
}

impl Conversation {
    /// Create a conversation seeded with the assistant greeting
    pub fn new(agent_id: impl Into<String>) -> Self {
        let greeting = ChatMessage::assistant(GREETING);
        let now = greeting.timestamp;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            messages: vec![greeting],
            created_at: now,
            updated_at: now,
            unanswered: Vec::new(),
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Whether any user message has been recorded yet
    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == MessageRole::User)
    }

    pub fn is_unanswered(&self, message_id: &str) -> bool {
        self.unanswered.iter().any(|id| id == message_id)
    }

    /// Most recent user message that is still waiting for a reply
    pub fn last_unanswered(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User && self.is_unanswered(&m.id))
    }
}

/// Derive a conversation title from the first user message
pub fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let cut: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        content.to_string()
    }
}

/// One row of the conversation sidebar
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
    pub is_current: bool,
}

impl ConversationSummary {
    pub fn from_conversation(conversation: &Conversation, current: Option<&str>) -> Self {
        Self {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            message_count: conversation.message_count(),
            updated_at: conversation.updated_at,
            is_current: current == Some(conversation.id.as_str()),
        }
    }

    /// "1 mensagem" / "3 mensagens"
    pub fn count_label(&self) -> String {
        if self.message_count == 1 {
            "1 mensagem".to_string()
        } else {
            format!("{} mensagens", self.message_count)
        }
    }
}
