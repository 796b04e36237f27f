//! Conversation record types.
//!
//! A [`ChatSession`] owns an ordered list of immutable [`ChatMessage`]s and an
//! optional rolling [`ConversationSummary`] covering its older messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to sessions before the first user message names them.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Instructions injected by the application. Excluded from windowing.
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// A single message. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// UUID v7 (time-sortable).
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Condensed representation of a session's older messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub summary: String,
    pub key_topics: Vec<String>,
    pub emotional_themes: Vec<String>,
    pub user_mentions: Vec<String>,
    /// How many of the oldest non-system messages this summary represents.
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// A conversation owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Opaque identifier; callers must not parse it.
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub summary: Option<ConversationSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(owner_id: impl Into<String>, title: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            owner_id: owner_id.into(),
            title: title
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_TITLE)
                .to_string(),
            messages: Vec::new(),
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Messages that take part in windowing and summarization, in order.
    pub fn conversation(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    /// Count of non-system messages.
    pub fn conversation_len(&self) -> usize {
        self.conversation().count()
    }

    /// How many of the oldest non-system messages the current summary covers.
    pub fn summarized_count(&self) -> usize {
        self.summary.as_ref().map_or(0, |s| s.message_count)
    }
}
