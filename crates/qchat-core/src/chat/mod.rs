//! Chat data model and the conversation store built on [`crate::storage`].

mod grouping;
mod store;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use grouping::{ChatGroups, group_by_date};
pub use store::{ChatStore, DEFAULT_CHAT_TITLE, WELCOME_MESSAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered messages of one conversation.
pub type MessageLog = Vec<Message>;

/// Index entry for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            created_at: Utc::now(),
        }
    }
}

/// Builds a chat title from the first prompt: at most 30 characters, with
/// `...` appended when it was cut.
pub fn title_from_prompt(prompt: &str) -> String {
    const MAX_TITLE_CHARS: usize = 30;

    let prompt = prompt.trim();
    if prompt.chars().count() > MAX_TITLE_CHARS {
        let cut: String = prompt.chars().take(MAX_TITLE_CHARS).collect();
        format!("{cut}...")
    } else {
        prompt.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_prompt_truncates() {
        assert_eq!(title_from_prompt("What is a qubit?"), "What is a qubit?");
        assert_eq!(
            title_from_prompt("Explain quantum entanglement to a five year old"),
            "Explain quantum entanglement t..."
        );
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let prompt = "é".repeat(31);
        assert_eq!(title_from_prompt(&prompt), format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn test_message_round_trips_through_json() {
        let message = Message::assistant("**hello**");
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_record_uses_timestamp_field() {
        let json = r#"{"id":"c1","title":"New Chat","timestamp":"2025-03-01T12:00:00.000Z"}"#;
        let record: ConversationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "c1");
        assert_eq!(record.created_at.to_rfc3339(), "2025-03-01T12:00:00+00:00");
    }
}
