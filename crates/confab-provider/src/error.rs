use confab_types::{RunId, ThreadId};
use thiserror::Error;

/// Structured upstream failure kinds.
///
/// Callers branch on the variant, never on the message text. In particular
/// `ThreadNotFound` must never be retried — it is the signal to create a
/// fresh thread — while only connectivity-flavored `Unavailable` failures
/// are eligible for the offline queue.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure talking to the upstream.
    #[error("provider unreachable: {message}")]
    Unavailable { message: String, connectivity: bool },

    #[error("thread not found: {0}")]
    ThreadNotFound(ThreadId),

    #[error("run not found: {0}")]
    RunNotFound(RunId),

    /// The provider is still processing the previous message on the thread.
    #[error("provider is still processing the previous message")]
    Busy,

    #[error("provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid gateway configuration: {0}")]
    Config(String),
}

impl ProviderError {
    /// True only for a detected connectivity loss (connect failure or
    /// request timeout) — the offline-queue eligibility test.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Unavailable {
                connectivity: true,
                ..
            }
        )
    }

    /// Convenience constructor for a detected connectivity loss.
    pub fn offline() -> Self {
        Self::Unavailable {
            message: "connection lost".to_owned(),
            connectivity: true,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable {
            connectivity: err.is_connect() || err.is_timeout(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
