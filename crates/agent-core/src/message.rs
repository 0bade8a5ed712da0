//! Conversation Turns
//!
//! Role-tagged turns and the append-only conversation that owns them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Role of a turn's author
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (model) output, tool-call blocks included
    Assistant,
    /// Serialized tool results fed back to the model
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A single turn in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Turn role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }
}

/// Ordered, append-only sequence of turns.
///
/// The system turn, when present, is always at index 0 and appears once.
/// Turns are never edited or removed individually; [`Conversation::clear`]
/// is the only way to drop history.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    /// Insert the system turn if the conversation has not started yet.
    ///
    /// Returns `true` when the turn was inserted.
    pub fn ensure_system(&mut self, prompt: &str) -> bool {
        if self.messages.is_empty() {
            self.messages.push(Message::system(prompt));
            true
        } else {
            false
        }
    }

    /// Append a turn. The first turn must be the system turn and no other
    /// system turn may follow it.
    pub fn push(&mut self, message: Message) -> Result<()> {
        let opening = self.messages.is_empty();
        if message.role == Role::System && !opening {
            return Err(AgentError::Config(
                "system turn may only open a conversation".into(),
            ));
        }
        if message.role != Role::System && opening {
            return Err(AgentError::Config(
                "conversation must open with a system turn".into(),
            ));
        }
        self.messages.push(message);
        Ok(())
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Drop every turn, system prompt included
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Number of turns carrying the given role
    pub fn count(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
