use chrono::{DateTime, Utc};

/// Where a chat message came from, and so where replies go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Spoken in the room (`speak`)
    Room,
    /// Sent privately to the bot (`pmmed`)
    Private,
}

impl MessageOrigin {
    pub fn as_str(&self) -> &str {
        match self {
            MessageOrigin::Room => "speak",
            MessageOrigin::Private => "pmmed",
        }
    }
}

/// A chat message that may carry a command
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub text: String,
    pub origin: MessageOrigin,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>, origin: MessageOrigin) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            sender_name: None,
            text: text.into(),
            origin,
            timestamp: Utc::now(),
        }
    }

    pub fn from_room(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(sender_id, text, MessageOrigin::Room)
    }

    pub fn from_private(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(sender_id, text, MessageOrigin::Private)
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn is_private(&self) -> bool {
        self.origin == MessageOrigin::Private
    }
}
