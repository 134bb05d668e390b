use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::ThreadId;

/// Durable record of a user message that could not be dispatched.
///
/// Stored in an ordered list in persistent client storage and consumed
/// strictly in FIFO order on replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub thread_id: ThreadId,
}

impl QueuedMessage {
    pub fn new(thread_id: ThreadId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            timestamp: Utc::now(),
            thread_id,
        }
    }
}
