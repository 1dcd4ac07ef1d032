//! Fixed catalog of copywriting agents.
//!
//! The set of agents is defined at build time and never changes at runtime.
//! Conversations reference agents by their stable string id.

use serde::Serialize;

use crate::error::{ChatError, ChatResult};

/// Icon shown next to an agent in the menu and chat header
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentIcon {
    Briefing,
    Stories,
    Carousel,
    Reels,
    WhatsApp,
    Email,
}

impl AgentIcon {
    /// Get the glyph used to render this icon in a terminal
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Briefing => "📝",
            Self::Stories => "📱",
            Self::Carousel => "🖼️",
            Self::Reels => "🎬",
            Self::WhatsApp => "💬",
            Self::Email => "✉️",
        }
    }
}

/// A copywriting agent persona
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Agent {
    /// Stable key sent to the generation webhook
    pub id: &'static str,
    pub title: &'static str,
    pub icon: AgentIcon,
    pub description: &'static str,
}

static AGENTS: [Agent; 6] = [
    Agent {
        id: "briefing-campanha",
        title: "Briefing de Campanha",
        icon: AgentIcon::Briefing,
        description: "Crie briefings detalhados para suas campanhas",
    },
    Agent {
        id: "sequencia-stories",
        title: "Sequência de Stories",
        icon: AgentIcon::Stories,
        description: "Gere sequências de stories envolventes",
    },
    Agent {
        id: "sequencia-carrosseis",
        title: "Sequência de Carrosséis",
        icon: AgentIcon::Carousel,
        description: "Desenvolva carrosséis impactantes",
    },
    Agent {
        id: "roteiro-reels",
        title: "Roteiro de Reels",
        icon: AgentIcon::Reels,
        description: "Roteiros criativos para seus reels",
    },
    Agent {
        id: "mensagens-whatsapp",
        title: "Mensagens de WhatsApp",
        icon: AgentIcon::WhatsApp,
        description: "Mensagens persuasivas para WhatsApp",
    },
    Agent {
        id: "sequencia-emails",
        title: "Sequência de E-mails",
        icon: AgentIcon::Email,
        description: "E-mails que convertem e engajam",
    },
];

/// All agents, in menu order
pub fn all() -> &'static [Agent] {
    &AGENTS
}

/// Look up an agent by id
pub fn find(id: &str) -> Option<&'static Agent> {
    AGENTS.iter().find(|a| a.id == id)
}

/// Look up an agent by id, failing with [`ChatError::UnknownAgent`]
pub fn require(id: &str) -> ChatResult<&'static Agent> {
    find(id).ok_or_else(|| ChatError::UnknownAgent(id.to_string()))
}

pub fn contains(id: &str) -> bool {
    find(id).is_some()
}
