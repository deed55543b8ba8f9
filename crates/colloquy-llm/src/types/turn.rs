use serde::{Deserialize, Serialize};

use super::role::Role;

/// One message in the conversation
///
/// Immutable once created. Control characters other than newline and tab
/// are dropped from the content on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: strip_control_chars(content.into()),
        }
    }

    /// Create system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    /// Plain `{role, content}` pair for transmission or storage
    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

impl From<WireMessage> for Turn {
    fn from(message: WireMessage) -> Self {
        Self::new(message.role, message.content)
    }
}

/// Wire shape of a turn, shared by the request body and the history file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

fn strip_control_chars(content: String) -> String {
    if !content.chars().any(is_stripped) {
        return content;
    }
    content.chars().filter(|c| !is_stripped(*c)).collect()
}

fn is_stripped(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}
