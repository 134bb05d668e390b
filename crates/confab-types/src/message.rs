use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// Local delivery state of a message, tracked client-side only.
///
/// Provider-fetched messages are always `Confirmed`; the other states
/// annotate a single optimistic entry so a send-path failure never
/// discards the rest of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    #[default]
    Confirmed,
    /// Optimistic entry awaiting server confirmation.
    Pending,
    /// Dispatch failed; the user may resend.
    Failed,
    /// Held in the offline queue, sent on reconnect.
    Queued,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    /// Normalized to a real instant on deserialization; an invalid or
    /// missing provider timestamp falls back to "now" rather than failing
    /// the whole page.
    #[serde(deserialize_with = "timestamp::deserialize", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub delivery: Delivery,
}

impl Message {
    pub fn new(id: impl Into<MessageId>, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            delivery: Delivery::Confirmed,
        }
    }

    pub fn user(id: impl Into<MessageId>, content: impl Into<String>) -> Self {
        Self::new(id, MessageRole::User, content)
    }

    pub fn assistant(id: impl Into<MessageId>, content: impl Into<String>) -> Self {
        Self::new(id, MessageRole::Assistant, content)
    }

    pub fn system(id: impl Into<MessageId>, content: impl Into<String>) -> Self {
        Self::new(id, MessageRole::System, content)
    }

    /// Build the locally displayed user entry that precedes the round trip.
    ///
    /// Carries a temporary id and `Delivery::Pending`; it is replaced when
    /// the authoritative message list is re-fetched.
    pub fn optimistic(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::temporary(),
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            delivery: Delivery::Pending,
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.id.is_temporary()
    }
}

pub(crate) mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Accepts an RFC 3339 string, an epoch-millis number, or nothing at
    /// all; anything unparseable becomes `Utc::now()`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(normalize(value))
    }

    fn normalize(value: Option<Value>) -> DateTime<Utc> {
        match value {
            Some(Value::String(text)) => text.parse().unwrap_or_else(|_| Utc::now()),
            Some(Value::Number(millis)) => millis
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .unwrap_or_else(Utc::now),
            _ => Utc::now(),
        }
    }
}
