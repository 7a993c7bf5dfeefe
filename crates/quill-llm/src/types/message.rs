use serde::{Deserialize, Serialize};

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// Message as it lives in the host application's conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    pub visible: bool,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, sender: Sender, visible: bool) -> Self {
        Self {
            text: text.into(),
            sender,
            visible,
        }
    }

    /// Create visible user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User, true)
    }

    /// Create visible AI message
    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Ai, true)
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Role on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl From<Sender> for Role {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => Role::User,
            Sender::Ai => Role::Assistant,
        }
    }
}

/// Message sent to the completion API. Built per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: Role,
    pub content: String,
}

impl ModelMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Get role as string
    pub fn role(&self) -> &str {
        match self.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl From<&ChatMessage> for ModelMessage {
    fn from(message: &ChatMessage) -> Self {
        Self::new(message.sender.into(), message.text.clone())
    }
}
